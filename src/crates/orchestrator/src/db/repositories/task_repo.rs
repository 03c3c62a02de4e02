//! Task repositories

use async_trait::async_trait;
use chrono::Utc;

use crate::db::connection::DatabasePool;
use crate::db::error::{DatabaseError, DbResult};
use crate::db::models::TaskRow;
use crate::store::TaskRecord;

/// Storage backend for task records.
///
/// Expired records behave as absent on every read and write.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Store a new record, replacing any record with the same id
    async fn insert(&self, record: &TaskRecord) -> DbResult<()>;

    /// Load a live record
    async fn fetch(&self, task_id: &str) -> DbResult<Option<TaskRecord>>;

    /// Overwrite a live record. `NotFound` if there is none.
    async fn save(&self, record: &TaskRecord) -> DbResult<()>;

    /// Delete a record. Returns whether one existed.
    async fn remove(&self, task_id: &str) -> DbResult<bool>;

    /// Drop every expired record. Returns how many were removed.
    async fn purge_expired(&self) -> DbResult<u64>;

    async fn health_check(&self) -> DbResult<()>;

    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// SQLite-backed repository
#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: DatabasePool,
}

impl SqliteTaskRepository {
    /// Create a repository over an already migrated pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn insert(&self, record: &TaskRecord) -> DbResult<()> {
        let row = TaskRow::from_record(record)?;
        sqlx::query(
            "INSERT OR REPLACE INTO tasks
             (task_id, status, progress, message, created_at, completed_at, expires_at, sources, request, result, error)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.task_id)
        .bind(&row.status)
        .bind(row.progress)
        .bind(&row.message)
        .bind(&row.created_at)
        .bind(&row.completed_at)
        .bind(row.expires_at)
        .bind(&row.sources)
        .bind(&row.request)
        .bind(&row.result)
        .bind(&row.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, task_id: &str) -> DbResult<Option<TaskRecord>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT * FROM tasks WHERE task_id = ? AND expires_at > ?",
        )
        .bind(task_id)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TaskRow::into_record).transpose()
    }

    async fn save(&self, record: &TaskRecord) -> DbResult<()> {
        let row = TaskRow::from_record(record)?;
        let result = sqlx::query(
            "UPDATE tasks
             SET status = ?, progress = ?, message = ?, completed_at = ?, expires_at = ?,
                 sources = ?, request = ?, result = ?, error = ?
             WHERE task_id = ? AND expires_at > ?",
        )
        .bind(&row.status)
        .bind(row.progress)
        .bind(&row.message)
        .bind(&row.completed_at)
        .bind(row.expires_at)
        .bind(&row.sources)
        .bind(&row.request)
        .bind(&row.result)
        .bind(&row.error)
        .bind(&row.task_id)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("task {}", record.task_id)));
        }
        Ok(())
    }

    async fn remove(&self, task_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
