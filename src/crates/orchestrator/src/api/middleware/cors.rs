//! CORS middleware configuration
//!
//! Browser dashboards connect from other origins, so any origin may call the
//! API and open task sockets.

use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
