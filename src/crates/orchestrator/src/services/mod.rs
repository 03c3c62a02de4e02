//! Service layer shared by the HTTP and WebSocket handlers

pub mod scrape;

pub use scrape::{ScrapeService, StartedTask};
