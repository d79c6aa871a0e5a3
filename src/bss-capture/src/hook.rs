use std::sync::Arc;

use async_trait::async_trait;
use bss_changelog::{ChangeEntry, ChangeLogError, ChangeLogStore};
use bss_repr::{Action, LogId};
use serde_json::Value;
use thiserror::Error;

use crate::context::CaptureContext;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("change-capture hook failed to append log entry: {0}")]
    Log(#[from] ChangeLogError),
}

/// This site's identity (§4.2): what a captured entry's `SourceServer`
/// and `StoreType` are attributed to. Fixed per process, not per
/// request — it describes where the process itself runs, not who it's
/// currently talking to.
#[derive(Clone, Debug)]
pub struct SiteIdentity {
    pub source_server: String,
    pub store_type: String,
}

impl SiteIdentity {
    pub fn new(source_server: impl Into<String>, store_type: impl Into<String>) -> Self {
        Self {
            source_server: source_server.into(),
            store_type: store_type.into(),
        }
    }
}

/// The change-capture hook (C4, §4.2).
///
/// Implementations synthesize a fresh-`LogId` change-log entry for every
/// local write they see, unless the context says capture is currently
/// suppressed — in which case they must emit nothing at all (§8's
/// "no amplification" invariant).
#[async_trait]
pub trait CaptureHook: Send + Sync {
    async fn capture(
        &self,
        ctx: &CaptureContext,
        table_name: &str,
        record_id: &str,
        action: Action,
        payload: Option<Value>,
    ) -> Result<(), CaptureError>;
}

/// The hook wired to a real [`ChangeLogStore`]: on every non-suppressed
/// write it allocates a fresh [`LogId`], stamps `synced_at`/`updated_at`
/// with the current wall clock, and appends.
pub struct ChangeLogCaptureHook<L: ChangeLogStore> {
    identity: SiteIdentity,
    log: Arc<L>,
}

impl<L: ChangeLogStore> ChangeLogCaptureHook<L> {
    pub fn new(identity: SiteIdentity, log: Arc<L>) -> Self {
        Self { identity, log }
    }
}

#[async_trait]
impl<L: ChangeLogStore> CaptureHook for ChangeLogCaptureHook<L> {
    async fn capture(
        &self,
        ctx: &CaptureContext,
        table_name: &str,
        record_id: &str,
        action: Action,
        payload: Option<Value>,
    ) -> Result<(), CaptureError> {
        if ctx.is_suppressed() {
            tracing::trace!(table_name, record_id, "capture suppressed, skipping");
            return Ok(());
        }
        let now = chrono::Utc::now();
        let entry = ChangeEntry {
            log_id: LogId::new(),
            table_name: table_name.to_string(),
            record_id: record_id.to_string(),
            action,
            updated_at: now,
            synced_at: now,
            source_server: self.identity.source_server.clone(),
            store_type: self.identity.store_type.clone(),
            synced: true,
            payload,
        };
        self.log.upsert(entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bss_changelog::InMemoryChangeLog;
    use serde_json::json;

    #[tokio::test]
    async fn captures_a_write_when_not_suppressed() {
        let log = Arc::new(InMemoryChangeLog::new());
        let hook = ChangeLogCaptureHook::new(SiteIdentity::new("central", "central"), log.clone());
        let ctx = CaptureContext::new();

        hook.capture(&ctx, "customers", "C_1", Action::Insert, Some(json!({"name": "Ada"})))
            .await
            .unwrap();

        let entries = log.after(chrono::DateTime::<chrono::Utc>::MIN_UTC).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source_server, "central");
        assert_eq!(entries[0].action, Action::Insert);
    }

    #[tokio::test]
    async fn suppressed_context_emits_nothing() {
        let log = Arc::new(InMemoryChangeLog::new());
        let hook = ChangeLogCaptureHook::new(SiteIdentity::new("central", "central"), log.clone());
        let ctx = CaptureContext::new();
        let _guard = ctx.suppress();

        hook.capture(&ctx, "customers", "C_1", Action::Insert, None)
            .await
            .unwrap();

        let entries = log.after(chrono::DateTime::<chrono::Utc>::MIN_UTC).await.unwrap();
        assert!(entries.is_empty());
    }
}
