//! Database models
//!
//! Rows as stored in SQLite. Timestamps are TEXT except where a column is
//! compared in SQL.

pub mod task;

pub use task::TaskRow;
