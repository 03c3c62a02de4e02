//! Task persistence backends
//!
//! [`TaskRepository`] is the storage seam under the task store. The memory
//! backend is the default; SQLite keeps tasks across restarts.

pub mod memory_repo;
pub mod task_repo;

pub use memory_repo::MemoryTaskRepository;
pub use task_repo::{SqliteTaskRepository, TaskRepository};
