//! Face record store.
//!
//! Files and their detected faces in SQLite. Two implementations share the
//! [`FaceStore`] interface: [`SqliteFaceStore`] writes, [`ReadOnly`] wraps any
//! store and discards every mutation. Queries behave the same in both.

mod db;
mod query;
mod sqlite;

pub use db::{AllEncodings, FaceDb, StoreStats};
pub use query::{FaceQuery, FilesFaces};
pub use sqlite::SqliteFaceStore;

use crate::codec::CodecError;
use crate::media;
use crate::readonly::ReadOnly;
use crate::types::{Commit, FaceId, NewFace};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Outcome of [`FaceStore::update_filepaths`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathUpdate {
    pub removed: usize,
    pub moved: usize,
}

/// Persistent store of recognized faces grouped by source file.
///
/// Mutators enforce the store invariants themselves: removing a file removes
/// its faces, and any classification change or rename clears the file's
/// `synced` flag.
pub trait FaceStore {
    /// Query engine behind this store.
    fn db(&self) -> &FaceDb;

    fn is_read_only(&self) -> bool;

    /// Replace the record for `filename` (and all its faces) with `faces`.
    ///
    /// Returns the assigned face ids in input order.
    fn insert(
        &self,
        filename: &str,
        faces: &[NewFace],
        commit: Commit,
    ) -> Result<Vec<FaceId>, StoreError>;

    /// Delete a file and its faces.
    fn remove(&self, filename: &str, commit: Commit) -> Result<(), StoreError>;

    /// Rename a file; the file becomes unsynced.
    fn move_file(&self, old: &str, new: &str, commit: Commit) -> Result<(), StoreError>;

    /// Update a face's classification; the owning file becomes unsynced.
    fn set_face_name(
        &self,
        face_id: FaceId,
        name: &str,
        distance: f64,
        pattern: &str,
        commit: Commit,
    ) -> Result<(), StoreError>;

    fn mark_synced(&self, filename: &str, commit: Commit) -> Result<(), StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;

    fn get_all(&self) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::All)
    }

    fn get_unsynced(&self) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::Unsynced)
    }

    fn get_unmatched(&self) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::Unmatched)
    }

    fn get_by_name(&self, folder: &str, name: &str) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::ByName {
            folder: folder.to_string(),
            name: name.to_string(),
        })
    }

    fn get_folder(&self, folder: &str) -> Result<FilesFaces<'_>, StoreError> {
        self.db()
            .select(&FaceQuery::Folder(media::strip_wildcard(folder).to_string()))
    }

    fn get_weak(&self, folder: &str) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::Weak {
            folder: folder.to_string(),
        })
    }

    fn get_weak_unmatched(&self, folder: &str) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::WeakOrUnmatched {
            folder: folder.to_string(),
        })
    }

    fn get_faces(&self, filename: &str) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::File(filename.to_string()))
    }

    fn get_face(&self, face_id: FaceId) -> Result<FilesFaces<'_>, StoreError> {
        self.db().select(&FaceQuery::Face(face_id))
    }

    fn get_files(&self, folder: Option<&str>) -> Result<Vec<String>, StoreError> {
        self.db().get_files(folder)
    }

    fn get_all_encodings(&self, split: usize) -> Result<&AllEncodings, StoreError> {
        self.db().get_all_encodings(split)
    }

    fn find_files_by_names(
        &self,
        names: &[String],
        subfolder: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        self.db().find_files_by_names(names, subfolder)
    }

    /// Reconcile stored paths under `old_root` with the image files currently
    /// under `new_root` on disk, matching by basename.
    ///
    /// Files whose basename is gone are removed; files found in another
    /// directory are moved. When several files share a basename the last one
    /// processed wins and a warning is logged; a move onto an already stored
    /// path replaces that record. Commits once at the end, or rolls the whole
    /// batch back on error.
    fn update_filepaths(&self, old_root: &str, new_root: &Path) -> Result<PathUpdate, StoreError> {
        match reconcile_paths(self, old_root, new_root) {
            Ok(update) => {
                self.commit()?;
                Ok(update)
            }
            Err(e) => {
                if let Err(rollback) = self.rollback() {
                    tracing::error!(error = %rollback, "rollback after failed path update");
                }
                Err(e)
            }
        }
    }
}

fn reconcile_paths<S: FaceStore + ?Sized>(
    store: &S,
    old_root: &str,
    new_root: &Path,
) -> Result<PathUpdate, StoreError> {
    let on_disk = by_basename(media::list_files(new_root, media::IMAGE_EXTS));
    let stored = by_basename(store.get_files(Some(old_root))?);

    let mut update = PathUpdate::default();
    for (name, old_dir) in &stored {
        let old = join_path(old_dir, name);
        match on_disk.get(name) {
            None => {
                tracing::info!(file = %old, "removing file no longer on disk");
                store.remove(&old, Commit::Deferred)?;
                update.removed += 1;
            }
            Some(new_dir) if new_dir != old_dir => {
                let new = join_path(new_dir, name);
                if store.db().file_exists(&new)? {
                    tracing::warn!(from = %old, to = %new, "target already stored, replacing it");
                    store.remove(&new, Commit::Deferred)?;
                    update.removed += 1;
                }
                tracing::info!(from = %old, to = %new, "moving file");
                store.move_file(&old, &new, Commit::Deferred)?;
                update.moved += 1;
            }
            Some(_) => {}
        }
    }
    Ok(update)
}

/// Index paths by basename; later duplicates replace earlier ones.
fn by_basename(files: Vec<String>) -> BTreeMap<String, String> {
    let mut index: BTreeMap<String, String> = BTreeMap::new();
    for file in files {
        let path = Path::new(&file);
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let dir = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(prev) = index.get(&name) {
            tracing::warn!(name = %name, dir = %dir, previous = %prev, "duplicate file name");
        }
        index.insert(name, dir);
    }
    index
}

fn join_path(dir: &str, name: &str) -> String {
    Path::new(dir).join(name).to_string_lossy().into_owned()
}

/// Open the face store at `path`.
///
/// With `dry_run` the database is opened read-only at the connection level and
/// wrapped so that every mutation is silently discarded.
pub fn open_face_store(path: &Path, dry_run: bool) -> Result<Box<dyn FaceStore>, StoreError> {
    tracing::debug!(path = %path.display(), dry_run, "opening face store");
    if dry_run {
        Ok(Box::new(ReadOnly::new(SqliteFaceStore::open_read_only(
            path,
        )?)))
    } else {
        Ok(Box::new(SqliteFaceStore::open(path)?))
    }
}
