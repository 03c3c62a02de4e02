//! Scrape task service
//!
//! Entry points for creating, looking up and prioritizing tasks. The HTTP
//! layer only maps requests and errors onto these.

use llm::TextGenerator;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::analysis::{prioritize, PrioritizationPlan, PrioritizeRequest};
use crate::execution::TaskRunner;
use crate::sources::{ScrapeRequest, SourceKind};
use crate::store::{TaskStatus, TaskStore, TaskView};
use crate::{OrchestratorError, Result};

/// A freshly created task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub sources: Vec<SourceKind>,
}

#[derive(Clone)]
pub struct ScrapeService {
    runner: TaskRunner,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ScrapeService {
    pub fn new(runner: TaskRunner, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { runner, generator }
    }

    pub fn store(&self) -> &TaskStore {
        self.runner.store()
    }

    pub fn has_generator(&self) -> bool {
        self.runner.has_generator() && self.generator.is_some()
    }

    /// Validate the request, create a pending task and start it in the background.
    ///
    /// A request with no sources is rejected before anything is stored.
    pub async fn start_scrape(&self, request: ScrapeRequest) -> Result<StartedTask> {
        request.validate()?;

        let task_id = Uuid::new_v4().to_string();
        let sources = request.sources();
        let snapshot = serde_json::to_value(&request)?;
        let record = self.store().create(&task_id, sources.clone(), snapshot).await?;

        info!(
            task_id = %task_id,
            product = %request.product_name,
            sources = sources.len(),
            "Scrape task created"
        );
        self.runner.spawn(task_id.clone(), request);

        Ok(StartedTask {
            task_id,
            status: record.status,
            sources,
        })
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskView> {
        Ok(self.store().get(task_id).await?.view())
    }

    /// Build a sprint plan from a completed task's analysis.
    pub async fn prioritize(&self, request: &PrioritizeRequest) -> Result<PrioritizationPlan> {
        request.validate()?;
        let generator = self.generator.as_ref().ok_or_else(|| {
            OrchestratorError::Generation("no text generation service configured".to_string())
        })?;
        prioritize(self.store(), generator.as_ref(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ScrapeOrchestrator;
    use crate::realtime::ProgressBus;
    use crate::sources::FetcherRegistry;
    use crate::store::DEFAULT_RETENTION;

    fn service() -> ScrapeService {
        let store = TaskStore::in_memory(ProgressBus::default(), DEFAULT_RETENTION);
        let runner = TaskRunner::new(store, ScrapeOrchestrator::new(FetcherRegistry::new()), None);
        ScrapeService::new(runner, None)
    }

    #[tokio::test]
    async fn test_request_without_sources_creates_nothing() {
        let service = service();
        let request = ScrapeRequest::new("Example").without_reddit().without_google_search();

        let err = service.start_scrape(request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_started_task_is_visible() {
        let service = service();
        let started = service.start_scrape(ScrapeRequest::new("Example")).await.unwrap();

        assert_eq!(started.status, TaskStatus::Pending);
        assert_eq!(started.sources, vec![SourceKind::Reddit, SourceKind::GoogleSearch]);
        let view = service.get_task(&started.task_id).await.unwrap();
        assert_eq!(view.task_id, started.task_id);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let err = service().get_task("nope").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_prioritize_without_generator() {
        let request = PrioritizeRequest::new("t1", "Grow retention");
        let err = service().prioritize(&request).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Generation(_)));
    }
}
