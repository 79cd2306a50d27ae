//! Store error types.

use thiserror::Error;

/// Errors that can occur inside a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),

    /// The blocking task running a query panicked or was cancelled.
    #[error("blocking store task failed: {0}")]
    TaskJoin(String),

    /// A previous query panicked while holding the connection.
    #[error("store connection lock poisoned")]
    LockPoisoned,
}
