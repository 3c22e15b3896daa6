//! Journal error taxonomy.
//!
//! `AlreadyLogged` and `InvalidArgument` are user-correctable outcomes that
//! the dispatch loop turns into friendly replies. `Store` wraps unexpected
//! persistence failures. An empty history is not an error.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by a `LogStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt row for user {user_id}: {reason}")]
    CorruptRow { user_id: String, reason: String },

    #[error("store task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

/// Outcome of a failed journal operation.
#[derive(Debug, Error)]
pub enum JournalError {
    /// An entry for this user and day already exists.
    #[error("already logged for {log_date}")]
    AlreadyLogged { log_date: NaiveDate },

    /// Caller-supplied input was rejected before touching the store.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type JournalResult<T> = Result<T, JournalError>;
