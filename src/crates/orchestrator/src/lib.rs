//! Task orchestration and progress distribution engine
//!
//! A task fans out to several review and search sources, merges what comes
//! back into one document, has a text generation service categorize it, and
//! parses the reply into typed findings and analytics. Every state change is
//! published so any number of live observers can follow along.
//!
//! The main pieces:
//! - [`store::TaskStore`] owns task records and publishes progress on every write
//! - [`realtime::ProgressBus`] and [`realtime::SubscriptionManager`] fan events out to observers
//! - [`execution::ScrapeOrchestrator`] runs the source fetches with failure isolation
//! - [`analysis::ResultAggregator`] drives generation and parses the reply

pub mod analysis;
pub mod api;
pub mod config;
pub mod db;
pub mod execution;
pub mod realtime;
pub mod services;
pub mod sources;
pub mod store;
pub mod version;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::sources::SourceKind;

/// Errors that can occur during orchestration
///
/// The `Display` text of each variant is what a failed task records as its
/// error, so messages are written for the person watching the task.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Task not found, or past its retention window
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Operation needs a completed task
    #[error("Task {task_id} is not completed (status: {status})")]
    TaskNotCompleted { task_id: String, status: String },

    /// Completed task has no stored table text
    #[error("Task {0} has no analysis text to work from")]
    MissingResultText(String),

    /// Request configures nothing to do
    #[error("{0}")]
    Configuration(String),

    /// One source failed; isolated from the others
    #[error("Source {kind} failed: {reason}")]
    SourceFetch { kind: SourceKind, reason: String },

    /// Every source failed or came back empty
    #[error("No valid results from any scraper")]
    NoUsableData,

    /// Combined document could not be built
    #[error("Failed to build query from scraped data: {0}")]
    DocumentBuild(String),

    /// Text generation failed or returned nothing usable
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Reply could not be turned into a result
    #[error("Failed to parse analysis: {0}")]
    Parse(String),

    /// Storage error
    #[error("Store unavailable: {0}")]
    Store(#[from] DatabaseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<llm::LlmError> for OrchestratorError {
    fn from(err: llm::LlmError) -> Self {
        OrchestratorError::Generation(err.to_string())
    }
}

impl From<rtoon::ToonError> for OrchestratorError {
    fn from(err: rtoon::ToonError) -> Self {
        OrchestratorError::DocumentBuild(err.to_string())
    }
}

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

pub use analysis::{Finding, FindingType, ResultAggregator, SentimentAnalysis, Severity};
pub use execution::{ScrapeOrchestrator, TaskRunner};
pub use realtime::{ObserverMessage, ProgressBus, ProgressEvent, SubscriptionManager};
pub use store::{TaskRecord, TaskResult, TaskStatus, TaskStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(
            OrchestratorError::NoUsableData.to_string(),
            "No valid results from any scraper"
        );
        let err = OrchestratorError::SourceFetch {
            kind: SourceKind::Reddit,
            reason: "timeout".into(),
        };
        assert_eq!(err.to_string(), "Source reddit failed: timeout");
    }

    #[test]
    fn test_llm_error_maps_to_generation() {
        let err: OrchestratorError = llm::LlmError::RateLimitExceeded("slow down".into()).into();
        assert!(matches!(err, OrchestratorError::Generation(_)));
        assert!(err.to_string().contains("slow down"));
    }
}
