//! In-memory store, for tests and throwaway local sessions.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

use streakbot_core::types::LogEntry;

use super::{LogStore, PutOutcome};
use crate::error::StoreResult;

/// `BTreeMap` keyed by `(user_id, log_date)`; iteration order is the query order.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(String, NaiveDate), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn put_if_absent(&self, entry: &LogEntry) -> StoreResult<PutOutcome> {
        let mut entries = self.entries.write().await;
        match entries.entry((entry.user_id.clone(), entry.log_date)) {
            Entry::Occupied(_) => Ok(PutOutcome::KeyExists),
            Entry::Vacant(slot) => {
                slot.insert(entry.message.clone());
                debug!(user_id = %entry.user_id, log_date = %entry.log_date, "entry stored in memory");
                Ok(PutOutcome::Inserted)
            }
        }
    }

    async fn query_by_user(&self, user_id: &str) -> StoreResult<Vec<LogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|((uid, _), _)| uid == user_id)
            .map(|((uid, date), message)| LogEntry::new(uid.clone(), *date, message.clone()))
            .collect())
    }

    async fn count_entries(&self) -> StoreResult<u64> {
        Ok(self.entries.read().await.len() as u64)
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}
