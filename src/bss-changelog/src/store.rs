use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bss_repr::{LogId, Timestamp};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::entry::ChangeEntry;

#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("change log I/O failure: {0}")]
    Io(String),
}

/// The append-only change log (§3, §4.3).
///
/// `upsert` is the single write path: a fresh `LogId` is a plain insert, a
/// `LogId` that already exists is the idempotent "update the existing
/// row's mutable fields" path §4.3 calls out as the dedup anchor. There is
/// no separate delete — the log itself is append-mostly forever.
#[async_trait]
pub trait ChangeLogStore: Send + Sync {
    async fn upsert(&self, entry: ChangeEntry) -> Result<(), ChangeLogError>;

    async fn get(&self, log_id: LogId) -> Result<Option<ChangeEntry>, ChangeLogError>;

    /// Entries with `synced_at > after`, ascending `(synced_at, updated_at,
    /// log_id)` (§4.3's read ordering contract).
    async fn after(&self, after: Timestamp) -> Result<Vec<ChangeEntry>, ChangeLogError>;

    /// Of `log_ids`, the subset whose `source_server == source_server`
    /// (§4.5 step 3).
    async fn filter_by_source(
        &self,
        log_ids: &[LogId],
        source_server: &str,
    ) -> Result<HashSet<LogId>, ChangeLogError>;

    /// Marks every entry with `source_server == source_server` as
    /// `synced = true` (§4.8 step e). Returns how many rows changed.
    async fn mark_synced_by_source(&self, source_server: &str) -> Result<usize, ChangeLogError>;
}

type OrderKey = (Timestamp, Timestamp, LogId);

#[derive(Default)]
struct Inner {
    by_order: BTreeMap<OrderKey, ChangeEntry>,
    keys_by_log_id: HashMap<LogId, OrderKey>,
}

/// `tokio::sync::Mutex`-guarded in-memory [`ChangeLogStore`].
///
/// A single mutex over both indices keeps the read-modify-write sequence
/// of a LogId-collision update atomic, mirroring the single in-process
/// transaction the spec requires around every applied change.
#[derive(Clone, Default)]
pub struct InMemoryChangeLog {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangeLogStore for InMemoryChangeLog {
    async fn upsert(&self, entry: ChangeEntry) -> Result<(), ChangeLogError> {
        let mut inner = self.inner.lock().await;
        if let Some(old_key) = inner.keys_by_log_id.get(&entry.log_id).copied() {
            inner.by_order.remove(&old_key);
        }
        let new_key = entry.order_key();
        inner.keys_by_log_id.insert(entry.log_id, new_key);
        inner.by_order.insert(new_key, entry);
        Ok(())
    }

    async fn get(&self, log_id: LogId) -> Result<Option<ChangeEntry>, ChangeLogError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .keys_by_log_id
            .get(&log_id)
            .and_then(|key| inner.by_order.get(key))
            .cloned())
    }

    async fn after(&self, after: Timestamp) -> Result<Vec<ChangeEntry>, ChangeLogError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_order
            .iter()
            .filter(|(key, _)| key.0 > after)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn filter_by_source(
        &self,
        log_ids: &[LogId],
        source_server: &str,
    ) -> Result<HashSet<LogId>, ChangeLogError> {
        let inner = self.inner.lock().await;
        Ok(log_ids
            .iter()
            .filter(|id| {
                inner
                    .keys_by_log_id
                    .get(id)
                    .and_then(|key| inner.by_order.get(key))
                    .is_some_and(|entry| entry.source_server == source_server)
            })
            .copied()
            .collect())
    }

    async fn mark_synced_by_source(&self, source_server: &str) -> Result<usize, ChangeLogError> {
        let mut inner = self.inner.lock().await;
        let mut count = 0;
        for entry in inner.by_order.values_mut() {
            if entry.source_server == source_server && !entry.synced {
                entry.synced = true;
                count += 1;
            }
        }
        Ok(count)
    }
}
