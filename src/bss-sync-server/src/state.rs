use std::sync::Arc;

use bss_changelog::ChangeLogStore;
use bss_replication::ReplicationEngine;
use bss_stores::CursorStore;

/// Everything an endpoint needs, shared across requests.
///
/// No [`bss_capture::CaptureContext`] lives here: §9's design note is
/// explicit that suppression must be request-scoped, never a shared
/// toggle, so each handler mints its own before calling into
/// [`ReplicationEngine::apply`].
#[derive(Clone)]
pub struct AppState {
    pub engine: ReplicationEngine,
    pub change_log: Arc<dyn ChangeLogStore>,
    pub cursors: Arc<dyn CursorStore>,
}

impl AppState {
    pub fn new(
        engine: ReplicationEngine,
        change_log: Arc<dyn ChangeLogStore>,
        cursors: Arc<dyn CursorStore>,
    ) -> Self {
        Self {
            engine,
            change_log,
            cursors,
        }
    }
}
