use bss_changelog::ChangeEntry;
use bss_repr::{Action, LogId, Timestamp, UnknownAction};

use crate::state::AppState;
use crate::wire::{ManualSeedRequest, ManualSeedResponse};

/// The manual-seed utility (C10, §4.11). Administrative, not
/// store-facing: forces redistribution of an existing row by minting a
/// brand-new [`LogId`] for it, so every store whose cursor hasn't seen
/// that id yet will receive it on its next poll.
pub async fn handle_manual_seed(
    state: &AppState,
    request: &ManualSeedRequest,
    now: Timestamp,
) -> Result<ManualSeedResponse, UnknownAction> {
    let action: Action = request
        .action
        .as_deref()
        .unwrap_or("UPDATE")
        .parse()?;

    let payload = if action.carries_payload() {
        state
            .engine
            .materialize_payload(&request.table_name, &request.record_id)
            .await
    } else {
        None
    };

    let log_id = LogId::new();
    let entry = ChangeEntry {
        log_id,
        table_name: request.table_name.clone(),
        record_id: request.record_id.clone(),
        action,
        updated_at: now,
        synced_at: now,
        source_server: request.store_id.clone(),
        store_type: request.store_type.clone(),
        synced: true,
        payload,
    };
    if let Err(err) = state.change_log.upsert(entry).await {
        tracing::warn!(
            table_name = %request.table_name,
            record_id = %request.record_id,
            error = %err,
            "manual seed: failed to persist log entry"
        );
    }

    Ok(ManualSeedResponse {
        log_id,
        synced_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bss_capture::{CapturingRowStore, SiteIdentity};
    use bss_catalog::{EntityCatalog, EntitySchema, InMemoryRowStore, KeyColumn, RowField, ScalarType};
    use bss_changelog::InMemoryChangeLog;
    use bss_photo_store::PhotoStore;
    use bss_stores::InMemoryCursorStore;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn state() -> AppState {
        let catalog = EntityCatalog::new().with(
            EntitySchema::new("customers", vec![KeyColumn::new("customer_uid", ScalarType::String)])
                .with_fields(vec![RowField::new("name", ScalarType::String)]),
        );
        let log = Arc::new(InMemoryChangeLog::new());
        let hook = Arc::new(bss_capture::ChangeLogCaptureHook::new(
            SiteIdentity::new("central", "central"),
            log.clone(),
        ));
        let rows = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook.clone());
        let photos = PhotoStore::new(std::env::temp_dir().join("bss-manual-seed-test"));
        let engine = bss_replication::ReplicationEngine::new(catalog, rows, photos);
        AppState::new(engine, log, Arc::new(InMemoryCursorStore::new()))
    }

    #[tokio::test]
    async fn seeds_a_fresh_log_id_carrying_the_current_row() {
        let state = state();
        let ctx = bss_capture::CaptureContext::new();
        state
            .engine
            .apply(
                &ctx,
                &ChangeEntry {
                    log_id: LogId::new(),
                    table_name: "customers".into(),
                    record_id: "C_1".into(),
                    action: Action::Insert,
                    updated_at: Utc::now(),
                    synced_at: Utc::now(),
                    source_server: "central".into(),
                    store_type: "central".into(),
                    synced: true,
                    payload: Some(json!({"name": "Ada"})),
                },
            )
            .await;

        let request = ManualSeedRequest {
            table_name: "customers".into(),
            record_id: "C_1".into(),
            action: None,
            store_id: "central".into(),
            store_type: "central".into(),
        };
        let response = handle_manual_seed(&state, &request, Utc::now()).await.unwrap();

        let logged = state.change_log.get(response.log_id).await.unwrap().unwrap();
        assert_eq!(logged.action, Action::Update);
        assert_eq!(logged.payload, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn delete_seed_carries_no_payload() {
        let state = state();
        let request = ManualSeedRequest {
            table_name: "customers".into(),
            record_id: "C_missing".into(),
            action: Some("DELETE".into()),
            store_id: "central".into(),
            store_type: "central".into(),
        };
        let response = handle_manual_seed(&state, &request, Utc::now()).await.unwrap();
        let logged = state.change_log.get(response.log_id).await.unwrap().unwrap();
        assert_eq!(logged.payload, None);
    }
}
