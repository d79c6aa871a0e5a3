use bss_capture::CaptureContext;
use bss_repr::Timestamp;
use thiserror::Error;

use crate::state::AppState;
use crate::wire::{resolve_change_entry, UploadRequest, UploadResponse};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadEnvelopeError {
    #[error("StoreId is required")]
    MissingStoreId,
    #[error("StoreType is required")]
    MissingStoreType,
}

/// The upload endpoint (C7, §4.4), with HTTP stripped away so the
/// algorithm is testable directly.
pub async fn handle_upload(
    state: &AppState,
    request: &UploadRequest,
    now: Timestamp,
) -> Result<UploadResponse, UploadEnvelopeError> {
    if request.store_id.trim().is_empty() {
        return Err(UploadEnvelopeError::MissingStoreId);
    }
    if request.store_type.trim().is_empty() {
        return Err(UploadEnvelopeError::MissingStoreType);
    }

    let mut cursor = match state.cursors.get_or_create(&request.store_id).await {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::warn!(store_id = %request.store_id, error = %err, "upload: cursor lookup failed, using a fresh one");
            bss_stores::StoreCursor::new(&request.store_id)
        }
    };
    cursor.role = bss_topology::Role::normalize(&request.store_type);
    cursor.server_role = request.server_role.clone().or(cursor.server_role);
    cursor.server_ip = request.server_ip.clone().or(cursor.server_ip);

    let Some(wire_change) = &request.change else {
        cursor.last_upload_time = Some(now);
        cursor.last_sync_count = 0;
        let _ = state.cursors.save(cursor).await;
        return Ok(UploadResponse {
            processed: 0,
            ignored: 0,
        });
    };

    // Step 5's dedup anchor lives in `ChangeLogStore::upsert` itself: a
    // supplied LogId that already exists is updated in place, a fresh
    // one is inserted. Resolve the entry once and reuse it for both the
    // apply and the log write so the LogId/timestamps line up exactly.
    //
    // An unrecognized Action is a row-level parse failure, not an
    // envelope failure (§4.4's closing line, §7, §9) — it must be
    // absorbed the same way an `ApplyOutcome::Ignored` is, not escalated
    // to the transport layer.
    let mut processed = 0i64;
    let mut ignored = 0i64;
    match resolve_change_entry(wire_change, &request.store_id, &request.store_type, now, true) {
        Ok(entry) => {
            // §4.4 step 3: capture must be suppressed for the duration of
            // this apply so central's own write doesn't get re-attributed
            // to central (§8's "no amplification" invariant). The guard
            // re-enables it on drop even if `apply` below never panics —
            // "even on exception" (step 7) is handled by RAII rather than
            // a try/finally.
            let ctx = CaptureContext::new();
            let outcome = {
                let _guard = ctx.suppress();
                state.engine.apply(&ctx, &entry).await
            };

            match outcome {
                bss_replication::ApplyOutcome::Processed => processed += 1,
                bss_replication::ApplyOutcome::Ignored { reason } => {
                    tracing::warn!(
                        store_id = %request.store_id,
                        table_name = %entry.table_name,
                        record_id = %entry.record_id,
                        reason,
                        "upload: row-level change ignored"
                    );
                    ignored += 1;
                }
            }

            if let Err(err) = state.change_log.upsert(entry).await {
                tracing::warn!(store_id = %request.store_id, error = %err, "upload: failed to persist log entry");
            }
        }
        Err(err) => {
            tracing::warn!(
                store_id = %request.store_id,
                table_name = %wire_change.table_name,
                record_id = %wire_change.record_id,
                error = %err,
                "upload: row-level change ignored"
            );
            ignored += 1;
        }
    }

    cursor.last_upload_time = Some(now);
    cursor.last_sync_count = processed;
    let _ = state.cursors.save(cursor).await;

    Ok(UploadResponse { processed, ignored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ChangeWire;
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
            EntitySchema::new("orders", vec![KeyColumn::new("order_uid", ScalarType::String)]).with_fields(vec![
                RowField::new("orderUid", ScalarType::String),
                RowField::new("status", ScalarType::String),
                RowField::new("amount", ScalarType::Integer),
            ]),
        );
        let log = Arc::new(InMemoryChangeLog::new());
        let hook = Arc::new(bss_capture::ChangeLogCaptureHook::new(
            SiteIdentity::new("central", "central"),
            log.clone(),
        ));
        let rows = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook);
        let photos = PhotoStore::new(std::env::temp_dir().join("bss-upload-test"));
        let engine = bss_replication::ReplicationEngine::new(catalog, rows, photos);
        AppState::new(engine, log, Arc::new(InMemoryCursorStore::new()))
    }

    fn upload_request(change: Option<ChangeWire>) -> UploadRequest {
        UploadRequest {
            store_id: "B1".into(),
            store_type: "direct".into(),
            server_role: None,
            server_ip: None,
            change,
        }
    }

    #[tokio::test]
    async fn rejects_missing_store_id() {
        let state = state();
        let mut req = upload_request(None);
        req.store_id = "".into();
        assert_eq!(
            handle_upload(&state, &req, Utc::now()).await.unwrap_err(),
            UploadEnvelopeError::MissingStoreId
        );
    }

    #[tokio::test]
    async fn heartbeat_with_no_change_updates_cursor_only() {
        let state = state();
        let now = Utc::now();
        let response = handle_upload(&state, &upload_request(None), now).await.unwrap();
        assert_eq!(response.processed, 0);
        assert_eq!(response.ignored, 0);
        let cursor = state.cursors.get_or_create("B1").await.unwrap();
        assert_eq!(cursor.last_upload_time, Some(now));
    }

    #[tokio::test]
    async fn branch_upload_round_trip_preserves_log_id_and_source() {
        let state = state();
        let log_id = bss_repr::LogId::new();
        let change = ChangeWire {
            log_id: Some(log_id),
            table_name: "orders".into(),
            record_id: "O_123".into(),
            action: "UPDATE".into(),
            updated_at: None,
            synced_at: None,
            payload: Some(json!({"orderUid": "O_123", "status": "220", "amount": 1000})),
        };
        let response = handle_upload(&state, &upload_request(Some(change)), Utc::now())
            .await
            .unwrap();
        assert_eq!(response.processed, 1);
        assert_eq!(response.ignored, 0);

        let row = state.engine.materialize_payload("orders", "O_123").await.unwrap();
        assert_eq!(row["status"], json!("220"));

        let logged = state.change_log.get(log_id).await.unwrap().unwrap();
        assert_eq!(logged.source_server, "B1");
        assert!(logged.synced);

        let cursor = state.cursors.get_or_create("B1").await.unwrap();
        assert_eq!(cursor.last_sync_count, 1);
    }

    #[tokio::test]
    async fn per_change_failure_is_ignored_not_thrown() {
        let state = state();
        let change = ChangeWire {
            log_id: None,
            table_name: "vehicles".into(),
            record_id: "V_1".into(),
            action: "UPDATE".into(),
            updated_at: None,
            synced_at: None,
            payload: Some(json!({})),
        };
        let response = handle_upload(&state, &upload_request(Some(change)), Utc::now())
            .await
            .unwrap();
        assert_eq!(response.processed, 0);
        assert_eq!(response.ignored, 1);
    }

    #[tokio::test]
    async fn unrecognized_action_is_ignored_not_thrown_and_cursor_still_advances() {
        let state = state();
        let now = Utc::now();
        let change = ChangeWire {
            log_id: None,
            table_name: "orders".into(),
            record_id: "O_1".into(),
            action: "MERGE".into(),
            updated_at: None,
            synced_at: None,
            payload: Some(json!({})),
        };
        let response = handle_upload(&state, &upload_request(Some(change)), now)
            .await
            .unwrap();
        assert_eq!(response.processed, 0);
        assert_eq!(response.ignored, 1);

        let cursor = state.cursors.get_or_create("B1").await.unwrap();
        assert_eq!(cursor.last_upload_time, Some(now));
    }
}
