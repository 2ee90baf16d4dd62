//! One synchronization run against the configured stores.

use crate::config::Config;
use crate::recognizer::CommandRecognizer;
use crate::store::open_face_store;
use crate::sync::{SyncError, SyncNewReport, SyncReport, TagSynchronizer};
use crate::tags::open_tag_store;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetTags { resync: bool },
    RemoveTags,
    SyncNew,
    SyncDeleted,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::SetTags { .. } => "set_tags",
            Action::RemoveTags => "remove_tags",
            Action::SyncNew => "sync_new",
            Action::SyncDeleted => "sync_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    SetTags(SyncReport),
    RemoveTags,
    SyncNew(SyncNewReport),
    SyncDeleted { removed: usize },
}

/// Open both stores from `config` and perform `action`.
///
/// Stores live for the duration of the run; with `dry_run` both are opened
/// read-only and every write is discarded.
pub fn run(config: &Config, action: Action, dry_run: bool) -> Result<Outcome, SyncError> {
    tracing::info!(action = action.name(), dry_run, "run started");
    let faces = open_face_store(&config.files.db, dry_run)?;
    let tags = open_tag_store(&config.catalog.db, dry_run)?;
    let sync = TagSynchronizer::new(
        config.recognition.names.iter().cloned(),
        faces.as_ref(),
        tags.as_ref(),
        config.recognition.min_video_face_count,
    );

    let outcome = match action {
        Action::SetTags { resync } => Outcome::SetTags(sync.set_tags(resync)?),
        Action::RemoveTags => {
            sync.remove_tags()?;
            Outcome::RemoveTags
        }
        Action::SyncNew => {
            let mut recognizer = CommandRecognizer::new(&config.recognizer.command)?;
            Outcome::SyncNew(sync.sync_new(
                &config.catalog.folders,
                &mut recognizer,
                &config.recognition.extensions,
            )?)
        }
        Action::SyncDeleted => Outcome::SyncDeleted {
            removed: sync.sync_deleted(&config.catalog.folders)?,
        },
    };
    tracing::info!(action = action.name(), "run done");
    Ok(outcome)
}
