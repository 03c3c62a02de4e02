//! Task state
//!
//! [`TaskStore`] is the single source of truth for a task's status,
//! progress, result and error.

pub mod model;
pub mod task_store;

pub use model::{ResultView, TaskRecord, TaskResult, TaskStatus, TaskView};
pub use task_store::{TaskStore, DEFAULT_RETENTION};
