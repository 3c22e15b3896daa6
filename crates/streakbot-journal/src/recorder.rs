//! Log recorder — persists at most one entry per user per day.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use streakbot_core::types::LogEntry;

use crate::error::{JournalError, JournalResult};
use crate::store::{LogStore, PutOutcome};

/// Confirmation of a stored log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Saved {
    pub log_date: NaiveDate,
}

/// Writes daily logs through a `LogStore`.
#[derive(Clone)]
pub struct LogRecorder {
    store: Arc<dyn LogStore>,
}

impl LogRecorder {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Record `message` as `user_id`'s log for `today`.
    ///
    /// The uniqueness check and the write are one conditional insert in the
    /// store; there is no read beforehand.
    pub async fn record(&self, user_id: &str, message: &str, today: NaiveDate) -> JournalResult<Saved> {
        if user_id.is_empty() {
            return Err(JournalError::InvalidArgument("user id is empty".into()));
        }
        if message.trim().is_empty() {
            return Err(JournalError::InvalidArgument("log message is empty".into()));
        }

        let entry = LogEntry::new(user_id, today, message);
        match self.store.put_if_absent(&entry).await? {
            PutOutcome::Inserted => {
                info!(user_id = %user_id, log_date = %today, "log recorded");
                Ok(Saved { log_date: today })
            }
            PutOutcome::KeyExists => {
                debug!(user_id = %user_id, log_date = %today, "duplicate log rejected");
                Err(JournalError::AlreadyLogged { log_date: today })
            }
        }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::store::{MemoryStore, SqliteStore};
    use async_trait::async_trait;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl LogStore for BrokenStore {
        async fn put_if_absent(&self, _entry: &LogEntry) -> StoreResult<PutOutcome> {
            Err(StoreError::Database("disk I/O error".into()))
        }

        async fn query_by_user(&self, _user_id: &str) -> StoreResult<Vec<LogEntry>> {
            Err(StoreError::Database("disk I/O error".into()))
        }

        async fn count_entries(&self) -> StoreResult<u64> {
            Err(StoreError::Database("disk I/O error".into()))
        }

        fn describe(&self) -> String {
            "broken".into()
        }
    }

    #[tokio::test]
    async fn test_record_then_already_logged() {
        let store = Arc::new(MemoryStore::new());
        let recorder = LogRecorder::new(store.clone());

        let saved = recorder.record("u1", "went for a run", day(5)).await.unwrap();
        assert_eq!(saved, Saved { log_date: day(5) });

        let err = recorder.record("u1", "again", day(5)).await.unwrap_err();
        assert!(matches!(err, JournalError::AlreadyLogged { log_date } if log_date == day(5)));

        let history = store.query_by_user("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "went for a run");
    }

    #[tokio::test]
    async fn test_next_day_is_accepted() {
        let recorder = LogRecorder::new(Arc::new(MemoryStore::new()));
        recorder.record("u1", "monday", day(4)).await.unwrap();
        recorder.record("u1", "tuesday", day(5)).await.unwrap();
        assert_eq!(recorder.store().count_entries().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_without_write() {
        let store = Arc::new(MemoryStore::new());
        let recorder = LogRecorder::new(store.clone());

        let err = recorder.record("", "text", day(5)).await.unwrap_err();
        assert!(matches!(err, JournalError::InvalidArgument(_)));

        let err = recorder.record("u1", "   \n", day(5)).await.unwrap_err();
        assert!(matches!(err, JournalError::InvalidArgument(_)));

        assert_eq!(store.count_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_already_logged() {
        let recorder = LogRecorder::new(Arc::new(BrokenStore));
        let err = recorder.record("u1", "text", day(5)).await.unwrap_err();
        assert!(matches!(err, JournalError::Store(_)));
    }

    #[tokio::test]
    async fn test_concurrent_records_single_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("journal.db")).unwrap());
        let recorder = LogRecorder::new(store.clone());

        let mut handles = Vec::new();
        for i in 0..8 {
            let recorder = recorder.clone();
            handles.push(tokio::spawn(async move {
                recorder.record("u1", &format!("attempt {i}"), day(5)).await
            }));
        }

        let mut saved = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => saved += 1,
                Err(JournalError::AlreadyLogged { .. }) => duplicates += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(saved, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(store.query_by_user("u1").await.unwrap().len(), 1);
    }
}
