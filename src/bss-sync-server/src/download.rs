use bss_changelog::ChangeEntry;
use bss_repr::{Action, LogId, Timestamp};
use chrono::Duration;
use serde_json::Value;

use crate::state::AppState;
use crate::wire::{ChangeWire, DownloadQuery, DownloadResponse};

/// Clock-skew tolerance (§4.5 step 2, §5 "Clock skew"): a client-supplied
/// cursor ahead of server time is rewound this far before filtering.
const CLOCK_SKEW_TOLERANCE_MINUTES: i64 = 10;

/// The download endpoint (C8, §4.5), with HTTP stripped away.
pub async fn handle_download(state: &AppState, query: &DownloadQuery, now: Timestamp) -> DownloadResponse {
    let cursor = state
        .cursors
        .get_or_create(&query.store_id)
        .await
        .unwrap_or_else(|_| bss_stores::StoreCursor::new(&query.store_id));

    let requested_cursor = query
        .last_sync_time
        .or(cursor.last_download_time)
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
    let effective_cursor = if requested_cursor > now {
        now - Duration::minutes(CLOCK_SKEW_TOLERANCE_MINUTES)
    } else {
        requested_cursor
    };

    let candidates = state.change_log.after(effective_cursor).await.unwrap_or_default();
    let candidate_ids: Vec<LogId> = candidates.iter().map(|c| c.log_id).collect();
    let processed_ids = state
        .change_log
        .filter_by_source(&candidate_ids, &query.store_id)
        .await
        .unwrap_or_default();

    // §4.5 step 4's loop-avoidance rule: never hand a store back a change
    // that originated from that same store.
    let selected: Option<&ChangeEntry> = candidates
        .iter()
        .find(|entry| !processed_ids.contains(&entry.log_id) && entry.source_server != query.store_id);

    let mut new_last_download_time = cursor.last_download_time;
    let mut last_sync_count = 0i64;
    let mut change_wire = None;
    let mut orders = Vec::new();

    if let Some(entry) = selected {
        new_last_download_time = Some(entry.synced_at.min(now));
        last_sync_count = 1;

        let payload = match entry.payload.clone() {
            Some(payload) => Some(payload),
            None => state.engine.materialize_payload(&entry.table_name, &entry.record_id).await,
        };
        if entry.action != Action::Delete && entry.table_name.eq_ignore_ascii_case("orders") {
            if let Some(payload) = &payload {
                orders.push(payload.clone());
            }
        }
        change_wire = Some(ChangeWire::from_entry(entry, payload));
    } else if let Some(last_candidate) = candidates.last() {
        // §4.5 step 6: "If no entry was selected but candidates existed,
        // still advance to the last candidate's SyncedAt to avoid
        // re-scanning" the same loop-avoided entries on every poll.
        new_last_download_time = Some(last_candidate.synced_at);
    }

    let mut cursor = cursor;
    cursor.last_download_time = new_last_download_time;
    cursor.last_sync_count = last_sync_count;
    if let Err(err) = state.cursors.save(cursor).await {
        tracing::warn!(store_id = %query.store_id, error = %err, "download: failed to persist cursor");
    }

    DownloadResponse {
        store_id: query.store_id.clone(),
        store_type: query.store_type.clone(),
        server_time: now,
        change: change_wire,
        orders,
    }
}
