//! `syncd`: the central server's HTTP surface over the change-log
//! replication engine. Domain tables are wired in here as an in-memory
//! [`bss_catalog::EntityCatalog`] — a real deployment substitutes its
//! own `RowStore`/`ChangeLogStore`/`CursorStore` backed by its ORM of
//! choice (§0, §6.2) without touching anything upstream.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bss_capture::{CapturingRowStore, ChangeLogCaptureHook, SiteIdentity};
use bss_catalog::{EntityCatalog, EntitySchema, InMemoryRowStore, KeyColumn, RowField, ScalarType};
use bss_changelog::InMemoryChangeLog;
use bss_photo_store::PhotoStore;
use bss_replication::ReplicationEngine;
use bss_stores::InMemoryCursorStore;
use bss_sync_server::{build_router, AppState};
use clap::Parser;

/// Central-server configuration (§6.4's keys that apply on this side).
#[derive(Parser, Debug)]
#[command(name = "syncd", about = "Central-side change-log replication server")]
struct Config {
    /// Address the HTTP surface binds to.
    #[arg(long, env = "SYNCD_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: SocketAddr,

    /// `PhotoStorage.RootPath` (§6.4): filesystem root for photo binaries.
    #[arg(long, env = "SYNCD_PHOTO_ROOT", default_value = "./data/photos")]
    photo_root: std::path::PathBuf,

    /// `ServerRole` (§6.4), logged at startup for operational visibility.
    #[arg(long, env = "SYNCD_SERVER_ROLE", default_value = "central")]
    server_role: String,

    /// `ServerIp` (§6.4).
    #[arg(long, env = "SYNCD_SERVER_IP")]
    server_ip: Option<String>,
}

/// The example entity catalog this binary ships with (§6.2): the
/// replicated domain tables named in spec.md §1 (quotations, maintenance
/// orders, customers, vehicles). `photo_data` is deliberately absent —
/// it's the one table bss-replication hardcodes instead (§4.1, §4.9).
fn sample_catalog() -> EntityCatalog {
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
    tracing::info!(
        bind_addr = %config.bind_addr,
        photo_root = %config.photo_root.display(),
        server_role = %config.server_role,
        server_ip = ?config.server_ip,
        "starting syncd"
    );

    let catalog = sample_catalog();
    let change_log = Arc::new(InMemoryChangeLog::new());
    let hook = Arc::new(ChangeLogCaptureHook::new(
        SiteIdentity::new("central", config.server_role.clone()),
        change_log.clone(),
    ));
    let rows = CapturingRowStore::new(Arc::new(InMemoryRowStore::new()), hook);
    let photos = PhotoStore::new(config.photo_root.clone());
    let engine = ReplicationEngine::new(catalog, rows, photos);
    let cursors = Arc::new(InMemoryCursorStore::new());

    let state = Arc::new(AppState::new(engine, change_log, cursors));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(bind_addr = %config.bind_addr, "syncd listening");
    axum::serve(listener, app).await.context("syncd server loop failed")?;
    Ok(())
}
