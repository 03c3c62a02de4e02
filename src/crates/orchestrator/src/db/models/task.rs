//! Task row for database persistence

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::error::{DatabaseError, DbResult};
use crate::store::TaskRecord;

/// A task as stored in the `tasks` table
///
/// # Timestamps
/// `created_at` and `completed_at` are RFC 3339 strings. `expires_at` is Unix
/// milliseconds so the retention filter can compare it numerically.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRow {
    pub task_id: String,

    /// pending, running, completed, failed
    pub status: String,

    pub progress: i64,

    pub message: String,

    pub created_at: String,

    pub completed_at: Option<String>,

    pub expires_at: i64,

    /// JSON array of source identifiers
    pub sources: String,

    /// Submitted request as JSON
    pub request: String,

    /// Task result as JSON, once set
    pub result: Option<String>,

    pub error: Option<String>,
}

impl TaskRow {
    pub fn from_record(record: &TaskRecord) -> DbResult<Self> {
        Ok(Self {
            task_id: record.task_id.clone(),
            status: record.status.to_string(),
            progress: i64::from(record.progress),
            message: record.message.clone(),
            created_at: record.created_at.to_rfc3339(),
            completed_at: record.completed_at.map(|t| t.to_rfc3339()),
            expires_at: record.expires_at.timestamp_millis(),
            sources: to_json(&record.sources)?,
            request: to_json(&record.request)?,
            result: record.result.as_ref().map(to_json).transpose()?,
            error: record.error.clone(),
        })
    }

    pub fn into_record(self) -> DbResult<TaskRecord> {
        Ok(TaskRecord {
            status: self.status.parse().map_err(DatabaseError::TypeError)?,
            progress: u8::try_from(self.progress.clamp(0, 100))
                .map_err(|e| DatabaseError::type_error(e.to_string()))?,
            message: self.message,
            created_at: parse_time(&self.created_at)?,
            completed_at: self.completed_at.as_deref().map(parse_time).transpose()?,
            expires_at: Utc
                .timestamp_millis_opt(self.expires_at)
                .single()
                .ok_or_else(|| DatabaseError::type_error("expires_at out of range"))?,
            sources: from_json(&self.sources)?,
            request: from_json(&self.request)?,
            result: self.result.as_deref().map(from_json).transpose()?,
            error: self.error,
            task_id: self.task_id,
        })
    }
}

fn to_json<T: Serialize>(value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DatabaseError::type_error(e.to_string()))
}

fn from_json<T: for<'de> Deserialize<'de>>(raw: &str) -> DbResult<T> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::RowMappingError(e.to_string()))
}

fn parse_time(raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::type_error(format!("bad timestamp {}: {}", raw, e)))
}
