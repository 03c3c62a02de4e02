//! Configuration module for orchestrator
//!
//! TOML server configuration: listen address, store backend and retention,
//! realtime delivery, analysis batching, the generation service and sources.

pub mod server;

pub use server::{
    AnalysisConfig, LlmSettings, RealtimeConfig, ServerConfig, ServerConfigError,
    ServerInfoConfig, SourcesConfig, StoreBackend, StoreConfig,
};
