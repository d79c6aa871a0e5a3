use bss_changelog::ChangeEntry;
use bss_repr::{Action, LogId, Timestamp, UnknownAction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wire shape of a single change (§6.1). `action` is a raw string on
/// the wire and normalized via [`Action`]'s `FromStr` on receipt — the
/// protocol accepts any casing, per §3's "Action ... normalized
/// uppercase".
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeWire {
    pub log_id: Option<LogId>,
    pub table_name: String,
    pub record_id: String,
    pub action: String,
    pub updated_at: Option<Timestamp>,
    pub synced_at: Option<Timestamp>,
    pub payload: Option<Value>,
}

impl ChangeWire {
    pub fn from_entry(entry: &ChangeEntry, payload: Option<Value>) -> Self {
        Self {
            log_id: Some(entry.log_id),
            table_name: entry.table_name.clone(),
            record_id: entry.record_id.clone(),
            action: entry.action.to_string(),
            updated_at: Some(entry.updated_at),
            synced_at: Some(entry.synced_at),
            payload,
        }
    }
}

/// Resolves a wire-level change into a persisted [`ChangeEntry`] (§4.4
/// step 5): `log_id` is preserved when supplied, freshly allocated
/// otherwise; `synced_at` defaults to `now`, `updated_at` to
/// `synced_at`. `synced` is caller-supplied since the upload endpoint
/// (always `true`) and the branch poller (inserted `false`, then
/// bulk-marked `true` in the same cycle, §4.8 step e) differ.
pub fn resolve_change_entry(
    wire: &ChangeWire,
    source_server: &str,
    store_type: &str,
    now: Timestamp,
    synced: bool,
) -> Result<ChangeEntry, UnknownAction> {
    let action: Action = wire.action.parse()?;
    let synced_at = wire.synced_at.unwrap_or(now);
    let updated_at = wire.updated_at.unwrap_or(synced_at);
    Ok(ChangeEntry {
        log_id: wire.log_id.unwrap_or_default(),
        table_name: wire.table_name.clone(),
        record_id: wire.record_id.clone(),
        action,
        updated_at,
        synced_at,
        source_server: source_server.to_string(),
        store_type: store_type.to_string(),
        synced,
        payload: wire.payload.clone(),
    })
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub store_id: String,
    pub store_type: String,
    pub server_role: Option<String>,
    pub server_ip: Option<String>,
    pub change: Option<ChangeWire>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub processed: i64,
    pub ignored: i64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub store_id: String,
    pub store_type: String,
    pub server_role: Option<String>,
    pub page_size: Option<i64>,
    pub last_sync_time: Option<Timestamp>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub store_id: String,
    pub store_type: String,
    pub server_time: Timestamp,
    pub change: Option<ChangeWire>,
    pub orders: Vec<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSeedRequest {
    pub table_name: String,
    pub record_id: String,
    pub action: Option<String>,
    pub store_id: String,
    pub store_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSeedResponse {
    pub log_id: LogId,
    pub synced_at: Timestamp,
}

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_is_case_insensitive_on_the_wire() {
        let wire = ChangeWire {
            log_id: None,
            table_name: "orders".into(),
            record_id: "O_1".into(),
            action: "upsert".into(),
            updated_at: None,
            synced_at: None,
            payload: None,
        };
        let entry = resolve_change_entry(&wire, "B1", "direct", chrono::Utc::now(), true).unwrap();
        assert_eq!(entry.action, Action::Upsert);
    }

    #[test]
    fn missing_log_id_gets_a_fresh_one() {
        let wire = ChangeWire {
            log_id: None,
            table_name: "orders".into(),
            record_id: "O_1".into(),
            action: "update".into(),
            updated_at: None,
            synced_at: None,
            payload: None,
        };
        let entry = resolve_change_entry(&wire, "B1", "direct", chrono::Utc::now(), true).unwrap();
        let entry2 = resolve_change_entry(&wire, "B1", "direct", chrono::Utc::now(), true).unwrap();
        assert_ne!(entry.log_id, entry2.log_id);
    }

    #[test]
    fn supplied_log_id_is_preserved() {
        let id = LogId::new();
        let wire = ChangeWire {
            log_id: Some(id),
            table_name: "orders".into(),
            record_id: "O_1".into(),
            action: "update".into(),
            updated_at: None,
            synced_at: None,
            payload: None,
        };
        let entry = resolve_change_entry(&wire, "B1", "direct", chrono::Utc::now(), true).unwrap();
        assert_eq!(entry.log_id, id);
    }
}
