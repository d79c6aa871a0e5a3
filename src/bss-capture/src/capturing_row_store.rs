use std::sync::Arc;

use bss_catalog::{RowStore, RowStoreError};
use bss_repr::Action;
use serde_json::Value;
use thiserror::Error;

use crate::context::CaptureContext;
use crate::hook::{CaptureError, CaptureHook};

#[derive(Debug, Error)]
pub enum CapturingRowStoreError {
    #[error(transparent)]
    RowStore(#[from] RowStoreError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Wraps a [`RowStore`] so every write also runs through a
/// [`CaptureHook`] — the concrete shape of "the hook intercepts local
/// row writes" (§4.2).
///
/// Insert vs. update is derived from whether the row previously existed,
/// since [`RowStore::upsert`] doesn't distinguish the two itself.
/// `delete` always reports `DELETE` to the hook even when the row didn't
/// exist, matching the idempotent-delete contract (§7) — the write was
/// still attempted.
#[derive(Clone)]
pub struct CapturingRowStore {
    inner: Arc<dyn RowStore>,
    hook: Arc<dyn CaptureHook>,
}

impl CapturingRowStore {
    pub fn new(inner: Arc<dyn RowStore>, hook: Arc<dyn CaptureHook>) -> Self {
        Self { inner, hook }
    }

    pub async fn get(
        &self,
        table: &str,
        record_id: &str,
    ) -> Result<Option<Value>, CapturingRowStoreError> {
        Ok(self.inner.get(table, record_id).await?)
    }

    pub async fn upsert(
        &self,
        ctx: &CaptureContext,
        table: &str,
        record_id: &str,
        row: Value,
    ) -> Result<(), CapturingRowStoreError> {
        let existed = self.inner.get(table, record_id).await?.is_some();
        self.inner.upsert(table, record_id, row.clone()).await?;
        let action = if existed { Action::Update } else { Action::Insert };
        self.hook.capture(ctx, table, record_id, action, Some(row)).await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        ctx: &CaptureContext,
        table: &str,
        record_id: &str,
    ) -> Result<bool, CapturingRowStoreError> {
        let existed = self.inner.delete(table, record_id).await?;
        self.hook.capture(ctx, table, record_id, Action::Delete, None).await?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bss_catalog::InMemoryRowStore;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingHook {
        captured: StdMutex<Vec<(String, String, Action)>>,
    }

    #[async_trait]
    impl CaptureHook for RecordingHook {
        async fn capture(
            &self,
            ctx: &CaptureContext,
            table_name: &str,
            record_id: &str,
            action: Action,
            _payload: Option<Value>,
        ) -> Result<(), CaptureError> {
            if ctx.is_suppressed() {
                return Ok(());
            }
            self.captured
                .lock()
                .unwrap()
                .push((table_name.to_string(), record_id.to_string(), action));
            Ok(())
        }
    }

    #[tokio::test]
    async fn first_write_is_reported_as_insert_then_update() {
        let hook = Arc::new(RecordingHook::default());
        let store = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook.clone());
        let ctx = CaptureContext::new();

        store
            .upsert(&ctx, "customers", "C_1", json!({"name": "Ada"}))
            .await
            .unwrap();
        store
            .upsert(&ctx, "customers", "C_1", json!({"name": "Ada L."}))
            .await
            .unwrap();

        let captured = hook.captured.lock().unwrap().clone();
        assert_eq!(
            captured,
            vec![
                ("customers".into(), "C_1".into(), Action::Insert),
                ("customers".into(), "C_1".into(), Action::Update),
            ]
        );
    }

    #[tokio::test]
    async fn suppressed_context_applies_writes_but_reports_nothing() {
        let hook = Arc::new(RecordingHook::default());
        let store = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook.clone());
        let ctx = CaptureContext::new();
        {
            let _guard = ctx.suppress();
            store
                .upsert(&ctx, "customers", "C_1", json!({"name": "Ada"}))
                .await
                .unwrap();
        }

        assert!(hook.captured.lock().unwrap().is_empty());
        assert_eq!(
            store.get("customers", "C_1").await.unwrap(),
            Some(json!({"name": "Ada"}))
        );
    }
}
