use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum RowStoreError {
    #[error("row store I/O failure: {0}")]
    Io(String),
}

/// Abstract, injectable row persistence.
///
/// ORM/SQL generation is explicitly out of scope for this engine
/// (spec §1); the applier (bss-replication) and the download endpoint's
/// payload-materialization step (§4.5 step 5) only need a keyed-JSON-blob
/// view of a table, so that's the entire surface this trait exposes. A
/// production deployment substitutes its own implementation backed by
/// its ORM of choice without the replication engine changing at all.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Field-wise replacement: the caller has already merged the new
    /// payload into the right shape, this just persists it under
    /// `(table, record_id)`.
    async fn upsert(
        &self,
        table: &str,
        record_id: &str,
        row: serde_json::Value,
    ) -> Result<(), RowStoreError>;

    async fn get(
        &self,
        table: &str,
        record_id: &str,
    ) -> Result<Option<serde_json::Value>, RowStoreError>;

    /// Returns whether a row existed prior to the delete.
    async fn delete(&self, table: &str, record_id: &str) -> Result<bool, RowStoreError>;
}

/// `BTreeMap`-backed in-memory [`RowStore`], guarded by a single mutex so
/// that an applied change's read-modify-write sequence is atomic with
/// respect to other concurrent appliers touching the same key (mirrors
/// the single in-process transaction §4.6 requires).
#[derive(Clone, Default)]
pub struct InMemoryRowStore {
    rows: Arc<Mutex<BTreeMap<(String, String), serde_json::Value>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn upsert(
        &self,
        table: &str,
        record_id: &str,
        row: serde_json::Value,
    ) -> Result<(), RowStoreError> {
        let mut rows = self.rows.lock().await;
        rows.insert((table.to_ascii_lowercase(), record_id.to_string()), row);
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        record_id: &str,
    ) -> Result<Option<serde_json::Value>, RowStoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(&(table.to_ascii_lowercase(), record_id.to_string()))
            .cloned())
    }

    async fn delete(&self, table: &str, record_id: &str) -> Result<bool, RowStoreError> {
        let mut rows = self.rows.lock().await;
        Ok(rows
            .remove(&(table.to_ascii_lowercase(), record_id.to_string()))
            .is_some())
    }
}
