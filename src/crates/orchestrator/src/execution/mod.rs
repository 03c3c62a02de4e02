//! Task Execution Module
//!
//! Fans a task out to its sources and drives it through analysis to a
//! terminal state, reporting progress through the task store.

pub mod runner;
pub mod scrape;

pub use runner::{TaskRunner, DEFAULT_MAX_SEARCH_URLS};
pub use scrape::{FanOutOutcome, ScrapeOrchestrator, SourceFailure};
