use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use dbus_interface::{SyncService, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("facesyncd starting");

    let cfg = config::DaemonConfig::from_env()?;
    tracing::info!(
        config = %cfg.config_path.display(),
        faces_db = %cfg.sync.files.db.display(),
        catalog_db = %cfg.sync.catalog.db.display(),
        folders = cfg.sync.catalog.folders.len(),
        dry_run = cfg.dry_run,
        "configuration loaded"
    );

    let folders = cfg.sync.catalog.folders.clone();
    let engine = engine::spawn_engine(cfg.sync, cfg.dry_run)?;
    let service = SyncService {
        engine,
        dry_run: cfg.dry_run,
        folders,
    };

    let builder = if cfg.system_bus {
        zbus::connection::Builder::system()?
    } else {
        zbus::connection::Builder::session()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .with_context(|| format!("failed to acquire bus name {BUS_NAME}"))?;

    tracing::info!(name = BUS_NAME, path = OBJECT_PATH, "facesyncd ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("facesyncd shutting down");

    Ok(())
}
