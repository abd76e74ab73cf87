//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Expected outcomes such as a duplicate key or a missing row are not errors;
/// they are reported through [`InsertResult`](crate::InsertResult),
/// [`UpdateResult`](crate::UpdateResult) and `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// The blocking task running a query failed to complete.
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
