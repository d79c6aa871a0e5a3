use bss_capture::{CaptureContext, CapturingRowStore};
use bss_photo_store::PhotoStore;
use bss_repr::Action;
use serde_json::{Map, Value};

use crate::merge::field_wise_merge;
use crate::outcome::ApplyOutcome;

/// `photo_data` is hard-coded (§4.1, §4.6 step 2): it's the one table the
/// replication engine knows about beyond the entity catalog, because its
/// row carries a binary side-channel the catalog's plain JSON round-trip
/// can't express.
pub const PHOTO_TABLE: &str = "photo_data";

const FIELD_PHOTO_UID: &str = "photoUid";
const FIELD_BASE64: &str = "fileContentBase64";
const FIELD_EXTENSION: &str = "fileExtension";

pub(crate) async fn apply_photo(
    rows: &CapturingRowStore,
    photos: &PhotoStore,
    ctx: &CaptureContext,
    record_id: &str,
    action: Action,
    payload: Option<Value>,
) -> ApplyOutcome {
    if action == Action::Delete {
        if let Err(err) = rows.delete(ctx, PHOTO_TABLE, record_id).await {
            return ApplyOutcome::ignored(format!("photo row delete failed: {err}"));
        }
        photos.delete(record_id).await.ok();
        return ApplyOutcome::Processed;
    }

    let Some(Value::Object(mut payload)) = payload else {
        return ApplyOutcome::ignored("photo_data payload must be a JSON object");
    };
    let base64_content = payload.remove(FIELD_BASE64);
    let extension = payload
        .remove(FIELD_EXTENSION)
        .and_then(|v| v.as_str().map(str::to_string));
    payload
        .entry(FIELD_PHOTO_UID.to_string())
        .or_insert_with(|| Value::String(record_id.to_string()));

    let existing = match rows.get(PHOTO_TABLE, record_id).await {
        Ok(existing) => existing,
        Err(err) => return ApplyOutcome::ignored(format!("photo row read failed: {err}")),
    };
    let row = field_wise_merge(existing, Value::Object(payload));

    match base64_content {
        Some(Value::String(encoded)) => match PhotoStore::decode_base64(&encoded) {
            Ok(bytes) => {
                if let Err(err) = photos.write(record_id, &bytes, extension.as_deref()).await {
                    tracing::warn!(record_id, error = %err, "failed to write photo file");
                }
            }
            Err(err) => {
                tracing::warn!(record_id, error = %err, "invalid base64 photo payload, row metadata still applied");
            }
        },
        Some(_) => {
            tracing::warn!(record_id, "fileContentBase64 present but not a string, ignoring");
        }
        None => {
            tracing::debug!(record_id, "photo payload carried metadata only, keeping existing file");
        }
    }

    if let Err(err) = rows.upsert(ctx, PHOTO_TABLE, record_id, row).await {
        return ApplyOutcome::ignored(format!("photo row upsert failed: {err}"));
    }
    ApplyOutcome::Processed
}

/// Materializes a photo payload for the download endpoint (§4.5 step 5,
/// §4.9 "Download side"): the row plus base64 + extension read back from
/// disk, when a file exists.
pub(crate) async fn materialize_photo_payload(
    rows: &CapturingRowStore,
    photos: &PhotoStore,
    record_id: &str,
) -> Option<Value> {
    let row = rows.get(PHOTO_TABLE, record_id).await.ok().flatten()?;
    let mut row = match row {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    if let Ok(Some((bytes, extension))) = photos.read(record_id).await {
        row.insert(
            FIELD_BASE64.to_string(),
            Value::String(PhotoStore::encode_base64(&bytes)),
        );
        row.insert(FIELD_EXTENSION.to_string(), Value::String(extension));
    }
    Some(Value::Object(row))
}
