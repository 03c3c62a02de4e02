//! Task persistence
//!
//! Connection handling, the SQLite row model, the repositories behind the
//! task store, and the error type they share.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};
pub use error::{DatabaseError, DbResult};
pub use repositories::{MemoryTaskRepository, SqliteTaskRepository, TaskRepository};
