use bss_capture::{CaptureContext, CapturingRowStore};
use bss_catalog::EntityCatalog;
use bss_changelog::ChangeEntry;
use bss_photo_store::PhotoStore;
use bss_repr::Action;
use serde_json::Value;

use crate::merge::field_wise_merge;
use crate::outcome::ApplyOutcome;
use crate::photo::{apply_photo, materialize_photo_payload, PHOTO_TABLE};

/// The replication applier (C6, §4.6).
///
/// Every write this engine performs goes through the given
/// [`CapturingRowStore`] with the caller's [`CaptureContext`] — the
/// caller is responsible for having already suppressed capture (§4.4
/// step 3, §4.8 step d) before calling [`ReplicationEngine::apply`];
/// this type does not manage suppression itself, it only threads the
/// context through so the no-amplification invariant (§8) holds.
#[derive(Clone)]
pub struct ReplicationEngine {
    catalog: EntityCatalog,
    rows: CapturingRowStore,
    photos: PhotoStore,
}

impl ReplicationEngine {
    pub fn new(catalog: EntityCatalog, rows: CapturingRowStore, photos: PhotoStore) -> Self {
        Self { catalog, rows, photos }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    /// Applies one change entry (§4.6 steps 1-6).
    pub async fn apply(&self, ctx: &CaptureContext, change: &ChangeEntry) -> ApplyOutcome {
        if change.table_name.trim().is_empty() || change.record_id.trim().is_empty() {
            return ApplyOutcome::ignored("change is missing TableName or RecordId");
        }

        if change.table_name.eq_ignore_ascii_case(PHOTO_TABLE) {
            return apply_photo(
                &self.rows,
                &self.photos,
                ctx,
                &change.record_id,
                change.action,
                change.payload.clone(),
            )
            .await;
        }

        let Some(schema) = self.catalog.resolve(&change.table_name) else {
            return ApplyOutcome::ignored(format!("table {:?} is not registered", change.table_name));
        };
        if let Err(err) = self.catalog.parse_key(schema, &change.record_id) {
            return ApplyOutcome::ignored(format!("key parse failed: {err}"));
        }

        match change.action {
            Action::Insert | Action::Update | Action::Upsert => {
                let Some(payload) = change.payload.clone() else {
                    return ApplyOutcome::ignored("non-DELETE change is missing Payload");
                };
                let payload = match self.catalog.deserialize(schema, &payload) {
                    Ok(payload) => payload,
                    Err(err) => return ApplyOutcome::ignored(format!("payload failed schema validation: {err}")),
                };
                let existing = match self.rows.get(&change.table_name, &change.record_id).await {
                    Ok(existing) => existing,
                    Err(err) => return ApplyOutcome::ignored(format!("row read failed: {err}")),
                };
                let row = field_wise_merge(existing, payload);
                match self.rows.upsert(ctx, &change.table_name, &change.record_id, row).await {
                    Ok(()) => ApplyOutcome::Processed,
                    Err(err) => ApplyOutcome::ignored(format!("row upsert failed: {err}")),
                }
            }
            Action::Delete => match self.rows.delete(ctx, &change.table_name, &change.record_id).await {
                // §7: "DELETE on missing row" is success either way.
                Ok(_found) => ApplyOutcome::Processed,
                Err(err) => ApplyOutcome::ignored(format!("row delete failed: {err}")),
            },
        }
    }

    /// Reconstructs a change's payload from current state when the log
    /// row didn't carry one (§4.5 step 5): for `photo_data`, the row plus
    /// base64 binary; for everything else, the current row as-is.
    pub async fn materialize_payload(&self, table_name: &str, record_id: &str) -> Option<Value> {
        if table_name.eq_ignore_ascii_case(PHOTO_TABLE) {
            return materialize_photo_payload(&self.rows, &self.photos, record_id).await;
        }
        let schema = self.catalog.resolve(table_name)?;
        if self.catalog.parse_key(schema, record_id).is_err() {
            return None;
        }
        let row = self.rows.get(table_name, record_id).await.ok().flatten()?;
        match self.catalog.serialize(schema, &row) {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::warn!(table_name, record_id, error = %err, "stored row failed schema validation during materialize");
                None
            }
        }
    }
}
