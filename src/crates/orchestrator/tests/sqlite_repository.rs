use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use orchestrator::db::{DatabaseConnection, DatabaseError, SqliteTaskRepository, TaskRepository};
use orchestrator::realtime::ProgressBus;
use orchestrator::sources::SourceKind;
use orchestrator::store::{TaskRecord, TaskStatus, TaskStore};
use orchestrator::OrchestratorError;

/// In-memory databases live per connection, so the pool holds exactly one.
async fn repository() -> SqliteTaskRepository {
    let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
        .await
        .unwrap();
    db.run_migrations().await.unwrap();
    SqliteTaskRepository::new(db.pool().clone())
}

fn record(task_id: &str, ttl: ChronoDuration) -> TaskRecord {
    let now = Utc::now();
    TaskRecord::new(
        task_id,
        vec![SourceKind::GooglePlayStore, SourceKind::Reddit],
        serde_json::json!({ "product_name": "Example" }),
        now,
        now + ttl,
    )
}

#[tokio::test]
async fn test_insert_fetch_save() {
    let repo = repository().await;
    repo.health_check().await.unwrap();
    assert_eq!(repo.backend(), "sqlite");

    let mut task = record("t1", ChronoDuration::hours(24));
    repo.insert(&task).await.unwrap();

    let loaded = repo.fetch("t1").await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Pending);
    assert_eq!(loaded.message, "Task created");
    assert_eq!(loaded.sources, task.sources);
    assert_eq!(loaded.request["product_name"], "Example");

    task.status = TaskStatus::Running;
    task.progress = 10;
    task.message = "Scraping 2 sources: google_play_store, reddit".into();
    repo.save(&task).await.unwrap();

    let loaded = repo.fetch("t1").await.unwrap().unwrap();
    assert_eq!(loaded.status, TaskStatus::Running);
    assert_eq!(loaded.progress, 10);
    assert!(loaded.result.is_none());
}

#[tokio::test]
async fn test_missing_and_expired_records() {
    let repo = repository().await;
    assert!(repo.fetch("nope").await.unwrap().is_none());

    let missing = record("nope", ChronoDuration::hours(1));
    let err = repo.save(&missing).await.unwrap_err();
    assert!(err.is_not_found());

    let expired = record("old", ChronoDuration::milliseconds(-1));
    repo.insert(&expired).await.unwrap();
    assert!(repo.fetch("old").await.unwrap().is_none());
    assert!(repo.save(&expired).await.unwrap_err().is_not_found());

    repo.insert(&record("live", ChronoDuration::hours(1))).await.unwrap();
    assert_eq!(repo.purge_expired().await.unwrap(), 1);
    assert!(repo.fetch("live").await.unwrap().is_some());
}

#[tokio::test]
async fn test_remove() {
    let repo = repository().await;
    repo.insert(&record("t1", ChronoDuration::hours(1))).await.unwrap();
    assert!(repo.remove("t1").await.unwrap());
    assert!(!repo.remove("t1").await.unwrap());
}

#[tokio::test]
async fn test_task_store_over_sqlite() {
    let store = TaskStore::new(
        Arc::new(repository().await),
        ProgressBus::default(),
        Duration::from_secs(3600),
    );
    assert_eq!(store.backend(), "sqlite");
    assert!(store.health_check().await);

    store
        .create("t1", vec![SourceKind::Reddit], serde_json::json!({}))
        .await
        .unwrap();
    let mut rx = store.bus().subscribe("t1");

    store
        .update_status("t1", TaskStatus::Running, 50, "Halfway")
        .await
        .unwrap();
    store
        .update_status("t1", TaskStatus::Running, 20, "Stale update")
        .await
        .unwrap();
    store.set_error("t1", "Generation failed: empty reply").await.unwrap();
    store
        .update_status("t1", TaskStatus::Completed, 100, "Too late")
        .await
        .unwrap();

    let progress: Vec<(TaskStatus, u8)> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| (e.status, e.progress))
        .collect();
    assert_eq!(
        progress,
        vec![
            (TaskStatus::Running, 50),
            (TaskStatus::Running, 50),
            (TaskStatus::Failed, 0),
        ]
    );

    let record = store.get("t1").await.unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("Generation failed: empty reply"));
    assert!(record.completed_at.is_some());

    let err = store.get("other").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::TaskNotFound(_)));
}

#[tokio::test]
async fn test_rejected_statement_is_a_query_error() {
    let db = DatabaseConnection::with_max_connections("sqlite::memory:", 1)
        .await
        .unwrap();
    db.run_migrations().await.unwrap();

    let err: DatabaseError = sqlx::query(
        "INSERT INTO tasks (task_id, status, created_at, expires_at) VALUES ('t1', 'paused', '', 0)",
    )
    .execute(db.pool())
    .await
    .unwrap_err()
    .into();

    assert!(matches!(err, DatabaseError::QueryError(_)));
    assert!(!err.is_connection_error());
}
