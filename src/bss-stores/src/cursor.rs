use bss_repr::Timestamp;
use bss_topology::Role;

/// Per-store replication state (§3 "Store cursor").
///
/// The cursor is the download watermark: entries with `synced_at >
/// last_download_time` are candidates for the store's next poll. It is
/// mutated only by endpoints handling that specific `store_id` — never
/// shared or merged across stores.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreCursor {
    pub store_id: String,
    pub role: Role,
    pub server_role: Option<String>,
    pub server_ip: Option<String>,
    pub last_upload_time: Option<Timestamp>,
    pub last_download_time: Option<Timestamp>,
    pub last_sync_count: i64,
}

impl StoreCursor {
    /// A fresh cursor for a store that has never synced, per §4.7's
    /// `getOrCreate` contract.
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            role: Role::Other(String::new()),
            server_role: None,
            server_ip: None,
            last_upload_time: None,
            last_download_time: None,
            last_sync_count: 0,
        }
    }
}
