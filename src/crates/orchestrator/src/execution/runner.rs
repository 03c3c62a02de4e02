//! Task runner
//!
//! Drives one task from pending to a terminal state.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use crate::analysis::ResultAggregator;
use crate::execution::scrape::ScrapeOrchestrator;
use crate::sources::{build_document, ScrapeRequest, SourceKind};
use crate::store::{TaskResult, TaskStatus, TaskStore};
use crate::{OrchestratorError, Result};

/// Search result links passed to the analysis prompt
pub const DEFAULT_MAX_SEARCH_URLS: usize = 15;

/// Runs scrape tasks against a store.
///
/// Lifecycle of one run:
/// 1. Mark the task running and fan out to the configured sources
/// 2. Build the combined document from the surviving payloads
/// 3. Have the aggregator generate and parse the analysis
/// 4. Store the result, then mark the task completed
///
/// Any error along the way fails the task with the error text. Progress is
/// reported at those checkpoints only, never per item.
#[derive(Clone)]
pub struct TaskRunner {
    store: TaskStore,
    orchestrator: ScrapeOrchestrator,
    /// `None` when no generation service is configured
    aggregator: Option<Arc<ResultAggregator>>,
    max_search_urls: usize,
}

impl TaskRunner {
    pub fn new(
        store: TaskStore,
        orchestrator: ScrapeOrchestrator,
        aggregator: Option<ResultAggregator>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            aggregator: aggregator.map(Arc::new),
            max_search_urls: DEFAULT_MAX_SEARCH_URLS,
        }
    }

    pub fn with_max_search_urls(mut self, max: usize) -> Self {
        self.max_search_urls = max;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn has_generator(&self) -> bool {
        self.aggregator.is_some()
    }

    /// Run a task in the background.
    pub fn spawn(&self, task_id: String, request: ScrapeRequest) -> JoinHandle<()> {
        let runner = self.clone();
        let span = tracing::info_span!("task", task_id = %task_id);
        tokio::spawn(async move { runner.run(&task_id, &request).await }.instrument(span))
    }

    /// Run a task to completion or failure. Errors end up on the task record.
    pub async fn run(&self, task_id: &str, request: &ScrapeRequest) {
        if let Err(e) = self.execute(task_id, request).await {
            error!(task_id, error = %e, "Task run failed");
            if let Err(store_err) = self.store.set_error(task_id, e.to_string()).await {
                error!(task_id, error = %store_err, "Could not record task failure");
            }
        }
    }

    async fn execute(&self, task_id: &str, request: &ScrapeRequest) -> Result<()> {
        let requests = request.source_requests();

        self.store
            .update_status(task_id, TaskStatus::Running, 5, "Starting scrapers...")
            .await?;

        let kinds: Vec<SourceKind> = requests.iter().map(|r| r.kind()).collect();
        self.store
            .update_status(
                task_id,
                TaskStatus::Running,
                10,
                format!("Scraping {} sources: {}", kinds.len(), join_kinds(&kinds)),
            )
            .await?;

        let fan_out = self.orchestrator.fan_out(task_id, &requests).await?;
        let document = build_document(&fan_out.payloads, self.max_search_urls)?;

        self.store
            .update_status(
                task_id,
                TaskStatus::Running,
                50,
                format!(
                    "Scraped {} sources. Running sentiment analysis...",
                    document.data_summary.source_count()
                ),
            )
            .await?;

        let aggregator = self.aggregator.as_ref().ok_or_else(|| {
            OrchestratorError::Generation("no text generation service configured".to_string())
        })?;

        self.store
            .update_status(
                task_id,
                TaskStatus::Running,
                60,
                "Analyzing sentiment with Gemini AI...",
            )
            .await?;

        let outcome = aggregator.analyze(&document, &request.product_name).await?;

        self.store
            .update_status(task_id, TaskStatus::Running, 95, "Saving results...")
            .await?;

        let result = TaskResult {
            sources: document.data_summary.sources().collect(),
            sentiment_analysis: outcome.analysis,
            data_summary: document.data_summary,
            processing_mode: outcome.processing_mode,
            toon_text: outcome.toon_text,
        };
        self.store.set_result(task_id, result).await?;

        self.store
            .update_status(task_id, TaskStatus::Completed, 100, "Analysis complete!")
            .await?;

        info!(
            task_id,
            dropped = fan_out.failures.len(),
            skipped = outcome.skipped_rows,
            "Task completed"
        );
        Ok(())
    }
}

fn join_kinds(kinds: &[SourceKind]) -> String {
    kinds.iter().map(SourceKind::as_str).collect::<Vec<_>>().join(", ")
}
