use bss_repr::{Action, LogId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted change-log row (§3 "Change-log entry").
///
/// Unlike the wire-level change carried in an upload/download request
/// (bss-sync-server's `ChangeWire`), every field here is resolved: by the
/// time an entry reaches the log, `updated_at` and `synced_at` have
/// already been defaulted (§4.4 step 5: "supplied or now").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub log_id: LogId,
    pub table_name: String,
    pub record_id: String,
    pub action: Action,
    pub updated_at: Timestamp,
    pub synced_at: Timestamp,
    pub source_server: String,
    pub store_type: String,
    pub synced: bool,
    pub payload: Option<Value>,
}

impl ChangeEntry {
    /// The `(SyncedAt, UpdatedAt, LogId)` ordering key the log's read
    /// contract (§4.3) and the download endpoint's candidate scan (§4.5
    /// step 2) both rely on.
    pub fn order_key(&self) -> (Timestamp, Timestamp, LogId) {
        (self.synced_at, self.updated_at, self.log_id)
    }
}
