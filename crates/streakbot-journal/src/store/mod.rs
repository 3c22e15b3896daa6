//! Journal store — a keyed table of `(user_id, log_date) → message`.
//!
//! The only write is a conditional insert whose precondition ("no entry for
//! this key yet") is checked atomically by the store itself. Callers never
//! read before writing.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use streakbot_core::types::LogEntry;

use crate::error::StoreResult;

/// Result of a conditional insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The entry was written.
    Inserted,
    /// An entry with the same `(user_id, log_date)` already existed; nothing was written.
    KeyExists,
}

/// Persistence backend for log entries.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert `entry` only if its `(user_id, log_date)` key does not exist yet.
    async fn put_if_absent(&self, entry: &LogEntry) -> StoreResult<PutOutcome>;

    /// All entries of one user, ascending by `log_date`.
    async fn query_by_user(&self, user_id: &str) -> StoreResult<Vec<LogEntry>>;

    /// Total number of entries across all users.
    async fn count_entries(&self) -> StoreResult<u64>;

    /// Short backend description for status output.
    fn describe(&self) -> String;
}
