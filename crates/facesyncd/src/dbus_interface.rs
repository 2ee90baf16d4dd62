use crate::engine::EngineHandle;
use facesync_core::runner::{Action, Outcome};
use zbus::interface;

pub const BUS_NAME: &str = "org.facesync.Sync1";
pub const OBJECT_PATH: &str = "/org/facesync/Sync1";

/// D-Bus interface for the facesync daemon.
///
/// Bus name: org.facesync.Sync1
/// Object path: /org/facesync/Sync1
pub struct SyncService {
    pub engine: EngineHandle,
    pub dry_run: bool,
    pub folders: Vec<String>,
}

impl SyncService {
    async fn run(&self, action: Action) -> zbus::fdo::Result<Outcome> {
        self.engine
            .run(action)
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }
}

fn to_json(outcome: &Outcome) -> zbus::fdo::Result<String> {
    serde_json::to_string(outcome).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

#[interface(name = "org.facesync.Sync1")]
impl SyncService {
    /// Propagate face names to catalog tags; `resync` revisits every file.
    async fn set_tags(&self, resync: bool) -> zbus::fdo::Result<String> {
        tracing::info!(resync, "set_tags requested");
        to_json(&self.run(Action::SetTags { resync }).await?)
    }

    /// Remove every managed tag from the catalog.
    async fn remove_tags(&self) -> zbus::fdo::Result<()> {
        tracing::info!("remove_tags requested");
        self.run(Action::RemoveTags).await?;
        Ok(())
    }

    /// Recognize catalog files missing from the face store, then tag them.
    async fn sync_new(&self) -> zbus::fdo::Result<String> {
        tracing::info!("sync_new requested");
        to_json(&self.run(Action::SyncNew).await?)
    }

    /// Drop face records whose files left the catalog.
    async fn sync_deleted(&self) -> zbus::fdo::Result<String> {
        tracing::info!("sync_deleted requested");
        to_json(&self.run(Action::SyncDeleted).await?)
    }

    /// Return daemon status information.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let engine = self
            .engine
            .status()
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dry_run": self.dry_run,
            "folders": self.folders,
            "engine": engine,
        })
        .to_string())
    }
}
