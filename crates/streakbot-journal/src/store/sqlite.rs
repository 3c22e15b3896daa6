//! SQLite-based store.
//!
//! `PRIMARY KEY (user_id, log_date)` carries the once-per-day rule; the
//! conditional insert is `ON CONFLICT DO NOTHING` and its affected-row count
//! tells whether the precondition held. Several bot processes can share one
//! database file.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use streakbot_core::types::{LogEntry, STORE_DATE_FORMAT};

use super::{LogStore, PutOutcome};
use crate::error::{StoreError, StoreResult};

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based journal store.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    location: String,
}

impl SqliteStore {
    /// Open or create a store at the given path. Parent directories are created.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init(conn, path.display().to_string())
    }

    /// Create an in-memory store.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn init(conn: Connection, location: String) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS log_entries (
                user_id TEXT NOT NULL,
                log_date TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, log_date)
            );
            "#,
        )?;

        debug!(location = %location, "journal schema initialized");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection mutex poisoned".into()))?;
            f(&guard)
        })
        .await?
    }
}

fn parse_row(user_id: String, log_date: String, message: String) -> StoreResult<LogEntry> {
    let date = NaiveDate::parse_from_str(&log_date, STORE_DATE_FORMAT).map_err(|e| {
        StoreError::CorruptRow {
            user_id: user_id.clone(),
            reason: format!("bad log_date {log_date:?}: {e}"),
        }
    })?;
    Ok(LogEntry::new(user_id, date, message))
}

#[async_trait]
impl LogStore for SqliteStore {
    async fn put_if_absent(&self, entry: &LogEntry) -> StoreResult<PutOutcome> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            let day = entry.log_date.format(STORE_DATE_FORMAT).to_string();
            let changed = conn.execute(
                r#"
                INSERT INTO log_entries (user_id, log_date, message, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, log_date) DO NOTHING
                "#,
                params![entry.user_id, day, entry.message, Utc::now().to_rfc3339()],
            )?;

            if changed == 0 {
                debug!(user_id = %entry.user_id, log_date = %day, "entry already exists");
                Ok(PutOutcome::KeyExists)
            } else {
                debug!(user_id = %entry.user_id, log_date = %day, "entry inserted");
                Ok(PutOutcome::Inserted)
            }
        })
        .await
    }

    async fn query_by_user(&self, user_id: &str) -> StoreResult<Vec<LogEntry>> {
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, log_date, message FROM log_entries WHERE user_id = ?1 ORDER BY log_date ASC",
            )?;

            let rows = stmt.query_map([&user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut entries = Vec::new();
            for row in rows {
                let (uid, log_date, message) = row?;
                entries.push(parse_row(uid, log_date, message)?);
            }
            Ok(entries)
        })
        .await
    }

    async fn count_entries(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM log_entries", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    fn describe(&self) -> String {
        format!("sqlite ({})", self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_conditional_insert() {
        let store = SqliteStore::in_memory().unwrap();

        let first = LogEntry::new("u1", date(3, 5), "first");
        assert_eq!(store.put_if_absent(&first).await.unwrap(), PutOutcome::Inserted);

        let second = LogEntry::new("u1", date(3, 5), "second");
        assert_eq!(store.put_if_absent(&second).await.unwrap(), PutOutcome::KeyExists);

        let history = store.query_by_user("u1").await.unwrap();
        assert_eq!(history, vec![first]);
    }

    #[tokio::test]
    async fn test_same_day_different_users() {
        let store = SqliteStore::in_memory().unwrap();
        for user in ["u1", "u2"] {
            let outcome = store
                .put_if_absent(&LogEntry::new(user, date(3, 5), "hello"))
                .await
                .unwrap();
            assert_eq!(outcome, PutOutcome::Inserted);
        }
        assert_eq!(store.count_entries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_orders_by_calendar_date() {
        let store = SqliteStore::in_memory().unwrap();
        // Inserted out of order, across a month boundary that would break
        // month/day/year string ordering.
        for d in [date(10, 1), date(9, 30), date(12, 2), date(9, 4)] {
            store
                .put_if_absent(&LogEntry::new("u1", d, d.to_string()))
                .await
                .unwrap();
        }

        let dates: Vec<NaiveDate> = store
            .query_by_user("u1")
            .await
            .unwrap()
            .iter()
            .map(|e| e.log_date)
            .collect();
        assert_eq!(dates, vec![date(9, 4), date(9, 30), date(10, 1), date(12, 2)]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("journal.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .put_if_absent(&LogEntry::new("u1", date(3, 5), "kept"))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let history = reopened.query_by_user("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "kept");

        let dup = reopened
            .put_if_absent(&LogEntry::new("u1", date(3, 5), "again"))
            .await
            .unwrap();
        assert_eq!(dup, PutOutcome::KeyExists);
    }

    #[tokio::test]
    async fn test_two_handles_share_uniqueness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        let a = SqliteStore::open(&path).unwrap();
        let b = SqliteStore::open(&path).unwrap();

        let entry = LogEntry::new("u1", date(3, 5), "from a");
        assert_eq!(a.put_if_absent(&entry).await.unwrap(), PutOutcome::Inserted);

        let entry = LogEntry::new("u1", date(3, 5), "from b");
        assert_eq!(b.put_if_absent(&entry).await.unwrap(), PutOutcome::KeyExists);
    }

    #[tokio::test]
    async fn test_corrupt_date_reported() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO log_entries VALUES ('u1', '3/5/2024', 'legacy', '')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store.query_by_user("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { .. }));
    }

    #[test]
    fn test_describe() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.describe(), "sqlite (:memory:)");
    }
}
