//! HTTP and WebSocket surface
//!
//! - `POST /api/v1/scrape` and the single-source variants start a task
//! - `GET /api/v1/task/:id` reads it back
//! - `POST /api/v1/prioritize` turns a completed task into a sprint plan
//! - `GET /ws/task/:id` streams its progress
//! - `GET /health` reports store connectivity

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::{create_router, AppState, DEFAULT_OBSERVER_BUFFER};
