//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;

use crate::api::{handlers, middleware};
use crate::realtime::SubscriptionManager;
use crate::services::ScrapeService;

/// Messages a socket may have queued before delivery to it times out
pub const DEFAULT_OBSERVER_BUFFER: usize = 32;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: ScrapeService,
    pub subscriptions: SubscriptionManager,
    /// Interval between keep-alive pings on task sockets
    pub keepalive: Duration,
    pub observer_buffer: usize,
    /// Set when the configured store could not be opened and memory is used instead
    pub store_fallback: bool,
}

impl AppState {
    pub fn new(service: ScrapeService, subscriptions: SubscriptionManager, keepalive: Duration) -> Self {
        Self {
            service,
            subscriptions,
            keepalive,
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
            store_fallback: false,
        }
    }

    pub fn with_store_fallback(mut self, fallback: bool) -> Self {
        self.store_fallback = fallback;
        self
    }
}

/// Build the complete API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Task endpoints
        .route("/api/v1/scrape", post(handlers::start_scrape))
        .route("/api/v1/scrape/google-play", post(handlers::scrape_google_play))
        .route("/api/v1/scrape/apple-store", post(handlers::scrape_apple_store))
        .route("/api/v1/scrape/reddit", post(handlers::scrape_reddit))
        .route("/api/v1/scrape/google-search", post(handlers::scrape_google_search))
        .route("/api/v1/task/:id", get(handlers::get_task))
        .route("/api/v1/prioritize", post(handlers::prioritize))
        // Live progress
        .route("/ws/task/:id", get(handlers::task_socket))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(state)
}
