//! Task records and their read-only views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::{ProcessingMode, SentimentAnalysis};
use crate::sources::{DataSummary, SourceKind};

/// Lifecycle of a task. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub sources: Vec<SourceKind>,
    pub sentiment_analysis: SentimentAnalysis,
    pub data_summary: DataSummary,
    pub processing_mode: ProcessingMode,
    /// Raw reply the analytics were parsed from
    pub toon_text: String,
}

/// A stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub sources: Vec<SourceKind>,
    /// The request as submitted
    pub request: serde_json::Value,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(
        task_id: impl Into<String>,
        sources: Vec<SourceKind>,
        request: serde_json::Value,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            progress: 0,
            message: "Task created".to_string(),
            created_at: now,
            completed_at: None,
            expires_at,
            sources,
            request,
            result: None,
            error: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Client-facing view: result only once completed, error only once failed.
    pub fn view(&self) -> TaskView {
        let result = match self.status {
            TaskStatus::Completed => self.result.as_ref().map(|r| ResultView {
                sources: r.sources.clone(),
                sentiment_analysis: r.sentiment_analysis.clone(),
                data_summary: r.data_summary.clone(),
                processing_mode: r.processing_mode,
            }),
            _ => None,
        };
        let error = match self.status {
            TaskStatus::Failed => self.error.clone(),
            _ => None,
        };

        TaskView {
            task_id: self.task_id.clone(),
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
            sources: self.sources.clone(),
            result,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub sources: Vec<SourceKind>,
    pub sentiment_analysis: SentimentAnalysis,
    pub data_summary: DataSummary,
    pub processing_mode: ProcessingMode,
}

/// What task lookups and snapshots return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub sources: Vec<SourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record() -> TaskRecord {
        let now = Utc::now();
        TaskRecord::new(
            "t1",
            vec![SourceKind::Reddit],
            serde_json::json!({"product_name": "Notely"}),
            now,
            now + Duration::hours(24),
        )
    }

    #[test]
    fn test_status_strings() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert_eq!(serde_json::to_value(TaskStatus::Running).unwrap(), "running");
    }

    #[test]
    fn test_new_record_is_pending() {
        let r = record();
        assert_eq!(r.status, TaskStatus::Pending);
        assert_eq!(r.progress, 0);
        assert_eq!(r.message, "Task created");
        assert!(!r.is_expired(r.created_at));
        assert!(r.is_expired(r.expires_at));
    }

    #[test]
    fn test_view_hides_error_until_failed() {
        let mut r = record();
        r.error = Some("boom".into());
        assert_eq!(r.view().error, None);
        r.status = TaskStatus::Failed;
        assert_eq!(r.view().error.as_deref(), Some("boom"));

        let json = serde_json::to_value(record().view()).unwrap();
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
        assert_eq!(json["sources"], serde_json::json!(["reddit"]));
    }
}
