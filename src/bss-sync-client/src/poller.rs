use std::sync::Arc;
use std::time::Duration as StdDuration;

use bss_capture::CaptureContext;
use bss_changelog::ChangeLogStore;
use bss_replication::ReplicationEngine;
use bss_stores::CursorStore;
use bss_sync_server::wire::ChangeWire;
use bss_topology::Role;
use tokio_util::sync::CancellationToken;

use crate::client::{CentralClient, DownloadQuery};

/// The floor §4.8 step f guards the configured interval against:
/// "default 60 minutes, minimum guarded at 1 minute".
const MINIMUM_POLL_INTERVAL: StdDuration = StdDuration::from_secs(60);
const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(60 * 60);

/// The central-tag a branch's local log rows use for entries it
/// received from central (§4.8 step e's `SourceServer`).
pub const CENTRAL_SOURCE_TAG: &str = "central";

pub struct PollerConfig {
    pub store_id: String,
    pub store_type: String,
    pub server_role: Option<String>,
    pub page_size: Option<i64>,
    pub interval: StdDuration,
}

impl PollerConfig {
    /// Clamps `interval` to the §6.4/§4.8 floor of one minute.
    pub fn new(store_id: impl Into<String>, store_type: impl Into<String>, interval: StdDuration) -> Self {
        Self {
            store_id: store_id.into(),
            store_type: store_type.into(),
            server_role: None,
            page_size: None,
            interval: interval.max(MINIMUM_POLL_INTERVAL),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            store_type: String::new(),
            server_role: None,
            page_size: None,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The outcome of a single poll cycle — mostly useful for tests; the
/// long-running loop just logs it and moves on (§7: "the poller never
/// throws out of its loop").
#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Central had nothing new for this store.
    NoChange,
    /// A change was downloaded and applied.
    Applied,
    /// A change was downloaded but the applier ignored it (logged, not
    /// fatal — §7's row-parse-failure handling applies here too).
    Ignored,
    /// The HTTP call itself failed; cursor was left untouched.
    TransportError,
}

/// One iteration of §4.8's loop body (steps a-e), isolated from the
/// sleep/cancellation plumbing so it's directly testable.
pub async fn run_poll_cycle(
    config: &PollerConfig,
    client: &dyn CentralClient,
    engine: &ReplicationEngine,
    change_log: &Arc<dyn ChangeLogStore>,
    cursors: &Arc<dyn CursorStore>,
) -> CycleOutcome {
    let cursor = match cursors.get_or_create(&config.store_id).await {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::warn!(store_id = %config.store_id, error = %err, "poller: cursor lookup failed, skipping cycle");
            return CycleOutcome::TransportError;
        }
    };

    let query = DownloadQuery {
        store_id: config.store_id.clone(),
        store_type: config.store_type.clone(),
        server_role: config.server_role.clone(),
        page_size: config.page_size,
        last_sync_time: cursor.last_download_time,
    };

    let response = match client.download(&query).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(store_id = %config.store_id, error = %err, "poller: download call failed, will retry next cycle");
            return CycleOutcome::TransportError;
        }
    };

    let outcome = match &response.change {
        Some(wire) => {
            let entry = match wire_to_entry(wire, CENTRAL_SOURCE_TAG, &config.store_type, response.server_time) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(store_id = %config.store_id, error = %err, "poller: central sent an unrecognized action");
                    return CycleOutcome::Ignored;
                }
            };
            // §4.8 step d: suppress capture before applying, so this
            // branch doesn't re-emit (and later re-upload) the very
            // change it just received from central.
            let ctx = CaptureContext::new();
            let outcome = {
                let _guard = ctx.suppress();
                engine.apply(&ctx, &entry).await
            };
            match outcome {
                bss_replication::ApplyOutcome::Processed => CycleOutcome::Applied,
                bss_replication::ApplyOutcome::Ignored { reason } => {
                    tracing::warn!(store_id = %config.store_id, reason, "poller: applier ignored the downloaded change");
                    CycleOutcome::Ignored
                }
            }
        }
        None => CycleOutcome::NoChange,
    };

    let mut cursor = cursor;
    cursor.last_download_time = Some(response.server_time);
    if let Err(err) = cursors.save(cursor).await {
        tracing::warn!(store_id = %config.store_id, error = %err, "poller: failed to persist cursor");
    }

    // §4.8 step e: entries this branch already has from central must be
    // marked synced so the (out-of-scope) upload direction never sends
    // them back.
    if let Err(err) = change_log.mark_synced_by_source(CENTRAL_SOURCE_TAG).await {
        tracing::warn!(store_id = %config.store_id, error = %err, "poller: failed to mark central-origin rows synced");
    }

    outcome
}

fn wire_to_entry(
    wire: &ChangeWire,
    source_server: &str,
    store_type: &str,
    now: bss_repr::Timestamp,
) -> Result<bss_changelog::ChangeEntry, bss_repr::UnknownAction> {
    bss_sync_server::wire::resolve_change_entry(wire, source_server, store_type, now, false)
}

/// Runs §4.8's loop until `cancel` fires. Exits permanently (without
/// panicking) if `role` isn't a branch (§4.8 step 1) — a fatal
/// misconfiguration per §7, not a process crash.
pub async fn run_poller(
    config: PollerConfig,
    role: Role,
    client: Arc<dyn CentralClient>,
    engine: ReplicationEngine,
    change_log: Arc<dyn ChangeLogStore>,
    cursors: Arc<dyn CursorStore>,
    cancel: CancellationToken,
) {
    if !role.is_branch() {
        tracing::error!(role = %role, "central-dispatch poller started on a non-branch site, exiting permanently");
        return;
    }

    loop {
        let outcome = run_poll_cycle(&config, client.as_ref(), &engine, &change_log, &cursors).await;
        tracing::debug!(store_id = %config.store_id, ?outcome, "poll cycle complete");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(store_id = %config.store_id, "central-dispatch poller cancelled");
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}
