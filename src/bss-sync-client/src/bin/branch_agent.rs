//! `branch-agent`: runs on a direct-operated or alliance-franchise store.
//! Owns the central-dispatch poller (C9) and, since this engine is the
//! same core on every site (§2), re-exposes the same upload/download
//! HTTP surface `syncd` does — so a sub-franchise could itself poll this
//! branch exactly as this branch polls central. Not required by spec.md,
//! but free given the core is shared, and harmless since the poller only
//! ever talks outward to `CentralApiBaseUrl`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bss_capture::{CapturingRowStore, ChangeLogCaptureHook, SiteIdentity};
use bss_catalog::{EntityCatalog, EntitySchema, InMemoryRowStore, KeyColumn, RowField, ScalarType};
use bss_changelog::InMemoryChangeLog;
use bss_photo_store::PhotoStore;
use bss_replication::ReplicationEngine;
use bss_stores::InMemoryCursorStore;
use bss_sync_client::{run_poller, PollerConfig, ReqwestCentralClient};
use bss_sync_server::{build_router, AppState};
use bss_topology::Role;
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// Branch configuration: the §6.4 keys this side cares about.
#[derive(Parser, Debug)]
#[command(name = "branch-agent", about = "Branch-side replication poller and local sync surface")]
struct Config {
    /// `StoreId` (§6.4): this branch's own identifier.
    #[arg(long, env = "BSS_STORE_ID")]
    store_id: String,

    /// `StoreType` (§6.4): "direct store" or "alliance store".
    #[arg(long, env = "BSS_STORE_TYPE")]
    store_type: String,

    /// `CentralApiBaseUrl` (§6.4).
    #[arg(long, env = "BSS_CENTRAL_API_BASE_URL")]
    central_api_base_url: String,

    /// `BackgroundSyncIntervalMinutes` (§6.4), default 60, floor 1.
    #[arg(long, env = "BSS_SYNC_INTERVAL_MINUTES", default_value_t = 60)]
    background_sync_interval_minutes: u64,

    /// `BackgroundSyncBatchSize` (§6.4). The protocol itself only ever
    /// returns one change per poll (§4.3, §4.5); this is forwarded to
    /// central as `pageSize` for forward compatibility with a future
    /// batched protocol (§9's open question), not consumed locally.
    #[arg(long, env = "BSS_SYNC_BATCH_SIZE")]
    background_sync_batch_size: Option<i64>,

    /// `PhotoStorage.RootPath` (§6.4).
    #[arg(long, env = "BSS_PHOTO_ROOT", default_value = "./data/photos")]
    photo_root: std::path::PathBuf,

    /// `ServerRole` (§6.4).
    #[arg(long, env = "BSS_SERVER_ROLE")]
    server_role: Option<String>,

    /// `ServerIp` (§6.4).
    #[arg(long, env = "BSS_SERVER_IP")]
    server_ip: Option<String>,

    /// Local bind address for this branch's own upload/download surface.
    /// Optional: a leaf branch with no sub-franchises can omit it.
    #[arg(long, env = "BSS_LOCAL_BIND_ADDR")]
    local_bind_addr: Option<SocketAddr>,
}

fn local_catalog() -> EntityCatalog {
    EntityCatalog::new()
        .with(
            EntitySchema::new("orders", vec![KeyColumn::new("order_uid", ScalarType::String)]).with_fields(vec![
                RowField::new("orderUid", ScalarType::String),
                RowField::new("status", ScalarType::String),
                RowField::new("amount", ScalarType::Integer),
            ]),
        )
        .with(
            EntitySchema::new("quotations", vec![KeyColumn::new("quotation_uid", ScalarType::String)]).with_fields(
                vec![
                    RowField::new("quotationUid", ScalarType::String),
                    RowField::new("status", ScalarType::String),
                    RowField::new("amount", ScalarType::Integer),
                ],
            ),
        )
        .with(
            EntitySchema::new("customers", vec![KeyColumn::new("customer_uid", ScalarType::String)]).with_fields(
                vec![
                    RowField::new("customerUid", ScalarType::String),
                    RowField::new("name", ScalarType::String),
                    RowField::new("phone", ScalarType::String),
                ],
            ),
        )
        .with(
            EntitySchema::new("vehicles", vec![KeyColumn::new("vehicle_uid", ScalarType::String)]).with_fields(vec![
                RowField::new("vehicleUid", ScalarType::String),
                RowField::new("plate", ScalarType::String),
                RowField::new("model", ScalarType::String),
            ]),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::parse();
    let role = Role::normalize(&config.store_type);
    tracing::info!(
        store_id = %config.store_id,
        store_type = %config.store_type,
        role = %role,
        central_api_base_url = %config.central_api_base_url,
        interval_minutes = config.background_sync_interval_minutes,
        photo_root = %config.photo_root.display(),
        "starting branch-agent"
    );

    let change_log = Arc::new(InMemoryChangeLog::new());
    let hook = Arc::new(ChangeLogCaptureHook::new(
        SiteIdentity::new(config.store_id.clone(), config.store_type.clone()),
        change_log.clone(),
    ));
    let rows = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook);
    let photos = PhotoStore::new(config.photo_root.clone());
    let engine = ReplicationEngine::new(local_catalog(), rows, photos);
    let cursors = Arc::new(InMemoryCursorStore::new());

    let cancel = CancellationToken::new();
    let poller_cancel = cancel.clone();
    let mut poller_config = PollerConfig::new(
        config.store_id.clone(),
        config.store_type.clone(),
        Duration::from_secs(config.background_sync_interval_minutes.max(1) * 60),
    );
    poller_config.server_role = config.server_role.clone();
    poller_config.page_size = config.background_sync_batch_size;
    let client: Arc<dyn bss_sync_client::CentralClient> =
        Arc::new(ReqwestCentralClient::new(config.central_api_base_url.clone()));

    let poller_handle = tokio::spawn(run_poller(
        poller_config,
        role,
        client,
        engine.clone(),
        change_log.clone(),
        cursors.clone(),
        poller_cancel,
    ));

    if let Some(bind_addr) = config.local_bind_addr {
        let state = Arc::new(AppState::new(engine, change_log, cursors));
        let app = build_router(state);
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        tracing::info!(bind_addr = %bind_addr, "branch-agent local sync surface listening");

        tokio::select! {
            result = axum::serve(listener, app) => {
                result.context("branch-agent local server loop failed")?;
            }
            _ = shutdown_signal() => {
                cancel.cancel();
            }
        }
    } else {
        shutdown_signal().await;
        cancel.cancel();
    }

    poller_handle.await.context("poller task panicked")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
