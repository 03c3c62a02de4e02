//! In-process task repository

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::task_repo::TaskRepository;
use crate::db::error::{DatabaseError, DbResult};
use crate::store::TaskRecord;

/// Task records held in memory, keyed by task id.
///
/// Expired entries are dropped when read and by [`TaskRepository::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryTaskRepository {
    tasks: DashMap<String, TaskRecord>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn insert(&self, record: &TaskRecord) -> DbResult<()> {
        self.tasks.insert(record.task_id.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, task_id: &str) -> DbResult<Option<TaskRecord>> {
        let now = Utc::now();
        let live = self
            .tasks
            .get(task_id)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.clone()));

        match live {
            Some(Some(record)) => Ok(Some(record)),
            Some(None) => {
                self.tasks.remove_if(task_id, |_, r| r.is_expired(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, record: &TaskRecord) -> DbResult<()> {
        let now = Utc::now();
        match self.tasks.get_mut(&record.task_id) {
            Some(mut entry) if !entry.is_expired(now) => {
                *entry = record.clone();
                Ok(())
            }
            _ => Err(DatabaseError::not_found(format!("task {}", record.task_id))),
        }
    }

    async fn remove(&self, task_id: &str) -> DbResult<bool> {
        Ok(self.tasks.remove(task_id).is_some())
    }

    async fn purge_expired(&self) -> DbResult<u64> {
        let now = Utc::now();
        let before = self.tasks.len();
        self.tasks.retain(|_, record| !record.is_expired(now));
        Ok(before.saturating_sub(self.tasks.len()) as u64)
    }

    async fn health_check(&self) -> DbResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
