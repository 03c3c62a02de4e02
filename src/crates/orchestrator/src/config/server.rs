//! Server configuration for orchestrator-server
//!
//! Loads and parses orchestrator-server.toml. Every section and field has a
//! default, so an empty file (or no file at all) yields a runnable server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::AggregatorSettings;
use crate::realtime::SubscriptionSettings;
use crate::sources::reddit::REDDIT_BASE_URL;
use crate::sources::serpapi::SERPAPI_BASE_URL;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Listen address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfoConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: "orchestrator-server".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Which repository backs the task store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// SQLite file, used when `backend = "sqlite"`
    pub database_path: String,
    pub retention_secs: u64,
    /// How often expired records are purged
    pub purge_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_path: "orchestrator.db".to_string(),
            retention_secs: 86_400,
            purge_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub poll_interval_ms: u64,
    pub send_timeout_ms: u64,
    pub keepalive_secs: u64,
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            send_timeout_ms: 2000,
            keepalive_secs: 30,
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub token_threshold: usize,
    pub batch_char_budget: usize,
    pub boundary_ratio: f64,
    pub batch_pause_secs: u64,
    pub max_search_urls: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            token_threshold: 200_000,
            batch_char_budget: 600_000,
            boundary_ratio: 0.8,
            batch_pause_secs: 7,
            max_search_urls: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub enable_tools: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-lite".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: llm::config::GEMINI_BASE_URL.to_string(),
            timeout_secs: 300,
            enable_tools: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Environment variable holding the SerpAPI key
    pub serpapi_key_env: String,
    pub base_url: String,
    pub reddit_base_url: String,
    pub timeout_secs: u64,
    /// Reviews requested from Google Play
    pub play_reviews: u32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            serpapi_key_env: "SERPAPI_KEY".to_string(),
            base_url: SERPAPI_BASE_URL.to_string(),
            reddit_base_url: REDDIT_BASE_URL.to_string(),
            timeout_secs: 60,
            play_reviews: 199,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerInfoConfig,
    pub store: StoreConfig,
    pub realtime: RealtimeConfig,
    pub analysis: AnalysisConfig,
    pub llm: LlmSettings,
    pub sources: SourcesConfig,
}

impl ServerConfig {
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(ServerConfigError::ReadError)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, ServerConfigError> {
        let config: Self = toml::from_str(content).map_err(ServerConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CONFIG_PATH` or a well-known location, then apply the
    /// `HOST` and `PORT` overrides. Falls back to defaults when no file exists.
    pub fn load() -> Result<Self, ServerConfigError> {
        let mut config = match Self::locate() {
            Some(path) => {
                info!(path = %path.display(), "Loading server configuration");
                Self::from_file(path)?
            }
            None => {
                warn!("No orchestrator-server.toml found, using built-in defaults");
                Self::default()
            }
        };

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ServerConfigError::InvalidConfig(format!("PORT is not a port number: {}", port)))?;
        }

        Ok(config)
    }

    fn locate() -> Option<PathBuf> {
        // Try environment variable first
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(config_path));
        }

        [
            PathBuf::from("config/orchestrator-server.toml"),
            PathBuf::from("./orchestrator-server.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    pub fn validate(&self) -> Result<(), ServerConfigError> {
        if self.realtime.poll_interval_ms == 0 {
            return Err(ServerConfigError::InvalidConfig(
                "realtime.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.analysis.batch_char_budget == 0 {
            return Err(ServerConfigError::InvalidConfig(
                "analysis.batch_char_budget must be greater than 0".to_string(),
            ));
        }
        if !(self.analysis.boundary_ratio > 0.0 && self.analysis.boundary_ratio <= 1.0) {
            return Err(ServerConfigError::InvalidConfig(format!(
                "analysis.boundary_ratio must be in (0, 1], got {}",
                self.analysis.boundary_ratio
            )));
        }
        if self.realtime.channel_capacity == 0 {
            return Err(ServerConfigError::InvalidConfig(
                "realtime.channel_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.store.database_path)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.store.retention_secs)
    }

    pub fn subscription_settings(&self) -> SubscriptionSettings {
        SubscriptionSettings {
            poll_interval: Duration::from_millis(self.realtime.poll_interval_ms),
            send_timeout: Duration::from_millis(self.realtime.send_timeout_ms),
        }
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            token_threshold: self.analysis.token_threshold,
            batch_char_budget: self.analysis.batch_char_budget,
            boundary_ratio: self.analysis.boundary_ratio,
            batch_pause: Duration::from_secs(self.analysis.batch_pause_secs),
        }
    }
}
