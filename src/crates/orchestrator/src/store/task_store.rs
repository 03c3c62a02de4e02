//! Task store: persistence plus progress publication

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::model::{TaskRecord, TaskResult, TaskStatus};
use crate::db::{DatabaseError, MemoryTaskRepository, TaskRepository};
use crate::realtime::{ProgressBus, ProgressEvent};
use crate::sources::SourceKind;
use crate::{OrchestratorError, Result};

/// Default retention window for task records
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Owns task records and publishes a [`ProgressEvent`] for every status or
/// progress write.
///
/// Writes are serialized so events leave in the order the writes were made.
/// Non-failed writes never lower progress, and terminal tasks ignore further
/// status changes.
#[derive(Clone)]
pub struct TaskStore {
    repo: Arc<dyn TaskRepository>,
    bus: ProgressBus,
    retention: Duration,
    write_lock: Arc<Mutex<()>>,
}

impl TaskStore {
    pub fn new(repo: Arc<dyn TaskRepository>, bus: ProgressBus, retention: Duration) -> Self {
        Self {
            repo,
            bus,
            retention,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store over a fresh in-memory repository
    pub fn in_memory(bus: ProgressBus, retention: Duration) -> Self {
        Self::new(Arc::new(MemoryTaskRepository::new()), bus, retention)
    }

    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    /// Create a pending task. Nothing is published.
    pub async fn create(
        &self,
        task_id: &str,
        sources: Vec<SourceKind>,
        request: serde_json::Value,
    ) -> Result<TaskRecord> {
        let now = Utc::now();
        let retention = chrono::Duration::from_std(self.retention)
            .map_err(|e| OrchestratorError::Configuration(format!("retention out of range: {}", e)))?;
        let record = TaskRecord::new(task_id, sources, request, now, now + retention);

        let _guard = self.write_lock.lock().await;
        self.repo.insert(&record).await?;
        debug!(task_id, "Created task");
        Ok(record)
    }

    /// Load a live task
    pub async fn get(&self, task_id: &str) -> Result<TaskRecord> {
        self.repo
            .fetch(task_id)
            .await?
            .ok_or_else(|| OrchestratorError::TaskNotFound(task_id.to_string()))
    }

    /// Move a task forward and publish the change.
    ///
    /// Progress is raised to at least its previous value unless the new
    /// status is `Failed`. A write to a terminal task, or one that would move
    /// the status backwards, is logged and ignored.
    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> Result<()> {
        let message = message.into();
        let _guard = self.write_lock.lock().await;
        let mut record = self.get(task_id).await?;

        if record.status.is_terminal() {
            warn!(task_id, from = %record.status, to = %status, "Ignoring update to finished task");
            return Ok(());
        }
        if stage(status) < stage(record.status) {
            warn!(task_id, from = %record.status, to = %status, "Ignoring backwards status change");
            return Ok(());
        }

        let progress = progress.min(100);
        record.progress = match status {
            TaskStatus::Failed => progress,
            _ => progress.max(record.progress),
        };
        record.status = status;
        record.message = message;
        if status.is_terminal() {
            record.completed_at = Some(Utc::now());
        }

        self.save(&record).await?;
        debug!(task_id, status = %status, progress = record.progress, message = %record.message, "Task updated");
        self.bus.publish(ProgressEvent::new(
            task_id,
            record.status,
            record.progress,
            record.message.clone(),
        ));
        Ok(())
    }

    /// Attach a result without changing status
    pub async fn set_result(&self, task_id: &str, result: TaskResult) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.get(task_id).await?;
        record.result = Some(result);
        self.save(&record).await?;
        debug!(task_id, "Stored task result");
        Ok(())
    }

    /// Fail a task and publish progress 0 with the error text.
    pub async fn set_error(&self, task_id: &str, error_text: impl Into<String>) -> Result<()> {
        let error_text = error_text.into();
        let _guard = self.write_lock.lock().await;
        let mut record = self.get(task_id).await?;

        if record.status.is_terminal() {
            warn!(task_id, status = %record.status, error = %error_text, "Ignoring error for finished task");
            return Ok(());
        }

        let message = format!("Error: {}", error_text);
        record.status = TaskStatus::Failed;
        record.progress = 0;
        record.message = message.clone();
        record.error = Some(error_text.clone());
        record.completed_at = Some(Utc::now());

        self.save(&record).await?;
        error!(task_id, error = %error_text, "Task failed");
        self.bus
            .publish(ProgressEvent::new(task_id, TaskStatus::Failed, 0, message));
        Ok(())
    }

    pub async fn delete(&self, task_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        Ok(self.repo.remove(task_id).await?)
    }

    /// Drop records past their retention window
    pub async fn purge_expired(&self) -> Result<u64> {
        let purged = self.repo.purge_expired().await?;
        if purged > 0 {
            info!(purged, backend = self.backend(), "Purged expired tasks");
        }
        Ok(purged)
    }

    pub async fn health_check(&self) -> bool {
        match self.repo.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = self.backend(), error = %e, "Store health check failed");
                false
            }
        }
    }

    async fn save(&self, record: &TaskRecord) -> Result<()> {
        self.repo.save(record).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => OrchestratorError::TaskNotFound(record.task_id.clone()),
            other => OrchestratorError::Store(other),
        })
    }
}

fn stage(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Pending => 0,
        TaskStatus::Running => 1,
        TaskStatus::Completed | TaskStatus::Failed => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ProcessingMode, SentimentAnalysis};
    use crate::sources::DataSummary;

    fn store() -> TaskStore {
        TaskStore::in_memory(ProgressBus::default(), DEFAULT_RETENTION)
    }

    fn result() -> TaskResult {
        TaskResult {
            sources: vec![SourceKind::Reddit],
            sentiment_analysis: SentimentAnalysis::from_findings(vec![], &[], &DataSummary::default()),
            data_summary: DataSummary::default(),
            processing_mode: ProcessingMode::Single,
            toon_text: "type | category | title".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store();
        let record = store
            .create("t1", vec![SourceKind::Reddit], serde_json::json!({"product_name": "x"}))
            .await
            .unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(store.get("t1").await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_missing_task() {
        let store = store();
        assert!(matches!(
            store.get("nope").await,
            Err(OrchestratorError::TaskNotFound(_))
        ));
        assert!(matches!(
            store.update_status("nope", TaskStatus::Running, 5, "x").await,
            Err(OrchestratorError::TaskNotFound(_))
        ));
        assert!(store.get("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_updates_publish_in_order() {
        let store = store();
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        let mut rx = store.bus().subscribe("t1");

        store.update_status("t1", TaskStatus::Running, 5, "Starting").await.unwrap();
        store.update_status("t1", TaskStatus::Running, 10, "Scraping").await.unwrap();
        store.set_result("t1", result()).await.unwrap();
        store.update_status("t1", TaskStatus::Completed, 100, "Done").await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push((event.status, event.progress));
        }
        assert_eq!(
            seen,
            vec![
                (TaskStatus::Running, 5),
                (TaskStatus::Running, 10),
                (TaskStatus::Completed, 100),
            ]
        );

        let record = store.get("t1").await.unwrap();
        assert!(record.completed_at.is_some());
        assert!(record.result.is_some());
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let store = store();
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        let mut rx = store.bus().subscribe("t1");

        store.update_status("t1", TaskStatus::Running, 50, "half").await.unwrap();
        store.update_status("t1", TaskStatus::Running, 10, "late").await.unwrap();
        store.update_status("t1", TaskStatus::Running, 250, "over").await.unwrap();

        let mut last = 0;
        while let Ok(event) = rx.try_recv() {
            assert!(event.progress >= last);
            last = event.progress;
        }
        assert_eq!(last, 100);
        assert_eq!(store.get("t1").await.unwrap().message, "over");
    }

    #[tokio::test]
    async fn test_terminal_task_ignores_updates() {
        let store = store();
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        store.update_status("t1", TaskStatus::Completed, 100, "Done").await.unwrap();
        let mut rx = store.bus().subscribe("t1");

        store.update_status("t1", TaskStatus::Running, 50, "again").await.unwrap();
        store.set_error("t1", "late failure").await.unwrap();

        assert!(rx.try_recv().is_err());
        let record = store.get("t1").await.unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.error, None);
    }

    #[tokio::test]
    async fn test_backwards_status_ignored() {
        let store = store();
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        store.update_status("t1", TaskStatus::Running, 20, "go").await.unwrap();
        store.update_status("t1", TaskStatus::Pending, 30, "back").await.unwrap();
        let record = store.get("t1").await.unwrap();
        assert_eq!(record.status, TaskStatus::Running);
        assert_eq!(record.progress, 20);
    }

    #[tokio::test]
    async fn test_set_error_publishes_zero() {
        let store = store();
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        store.update_status("t1", TaskStatus::Running, 60, "Analyzing").await.unwrap();
        let mut rx = store.bus().subscribe("t1");

        store.set_error("t1", "Generation failed: empty reply").await.unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, TaskStatus::Failed);
        assert_eq!(event.progress, 0);
        assert_eq!(event.message, "Error: Generation failed: empty reply");

        let record = store.get("t1").await.unwrap();
        assert_eq!(record.error.as_deref(), Some("Generation failed: empty reply"));
        assert_eq!(record.view().error.as_deref(), Some("Generation failed: empty reply"));
    }

    #[tokio::test]
    async fn test_expired_task_is_not_found() {
        let store = TaskStore::in_memory(ProgressBus::default(), Duration::ZERO);
        store.create("t1", vec![], serde_json::Value::Null).await.unwrap();
        assert!(matches!(
            store.get("t1").await,
            Err(OrchestratorError::TaskNotFound(_))
        ));
        assert!(matches!(
            store.update_status("t1", TaskStatus::Running, 5, "x").await,
            Err(OrchestratorError::TaskNotFound(_))
        ));
    }
}
