// Version information for the orchestrator crate

/// Version string reported by the health endpoint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
