//! API middleware layer
//!
//! CORS and request tracing.

pub mod cors;
pub mod logging;

pub use cors::cors_layer;
pub use logging::logging_layer;
