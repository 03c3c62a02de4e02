//! API data transfer objects (DTOs) and response models

pub mod scrape;

pub use scrape::{PrioritizeResponse, ScrapeResponse};

/// Health check response
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    /// API version
    pub version: String,

    /// Whether the task store answered its health check
    pub store_connected: bool,

    /// `memory` or `sqlite`
    pub store_backend: String,

    /// Whether tasks can reach the analysis step
    pub generator_configured: bool,

    /// Current timestamp
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(store_connected: bool, store_backend: &str, generator_configured: bool) -> Self {
        let status = if store_connected { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            version: crate::version::VERSION.to_string(),
            store_connected,
            store_backend: store_backend.to_string(),
            generator_configured,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
