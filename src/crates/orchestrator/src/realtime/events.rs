//! Progress events and the messages observers receive

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{TaskRecord, TaskStatus, TaskView};

/// Denominator of every progress value.
pub const PROGRESS_TOTAL: u8 = 100;

/// One status change of a task, as published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub total: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        task_id: impl Into<String>,
        status: TaskStatus,
        progress: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            progress: progress.min(PROGRESS_TOTAL),
            total: PROGRESS_TOTAL,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Last message an observer gets for a task.
///
/// Progress is 100 when completed and 0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub total: u8,
    pub message: String,
    pub result_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FinalSummary {
    pub fn from_record(record: &TaskRecord) -> Self {
        let (message, error) = match record.status {
            TaskStatus::Failed => {
                let error = record
                    .error
                    .clone()
                    .unwrap_or_else(|| record.message.clone());
                (error.clone(), Some(error))
            }
            _ => ("Task completed".to_string(), None),
        };

        Self {
            task_id: record.task_id.clone(),
            status: record.status,
            progress: if record.status == TaskStatus::Completed {
                PROGRESS_TOTAL
            } else {
                0
            },
            total: PROGRESS_TOTAL,
            message,
            result_available: record.status == TaskStatus::Completed && record.result.is_some(),
            error,
        }
    }
}

/// Messages delivered to observers, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverMessage {
    /// Current state, sent once on subscribe
    Snapshot(TaskView),

    /// Sent instead of a snapshot when the task does not exist
    #[serde(rename = "error")]
    NotFound { task_id: String, error: String },

    Progress(ProgressEvent),

    Final(FinalSummary),

    /// Keep-alive
    Ping,
}

impl ObserverMessage {
    pub fn not_found(task_id: impl Into<String>) -> Self {
        ObserverMessage::NotFound {
            task_id: task_id.into(),
            error: "Task not found".to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ObserverMessage::Snapshot(_) => "snapshot",
            ObserverMessage::NotFound { .. } => "error",
            ObserverMessage::Progress(_) => "progress",
            ObserverMessage::Final(_) => "final",
            ObserverMessage::Ping => "ping",
        }
    }

    /// Convert to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
