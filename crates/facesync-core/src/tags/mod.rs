//! External media tag store interface.
//!
//! Only the tag operations the synchronizer consumes are modelled here.
//! [`CatalogTagStore`] is a SQLite-backed implementation.

mod catalog;

pub use catalog::CatalogTagStore;

use crate::readonly::ReadOnly;
use crate::types::Commit;
use std::path::Path;
use thiserror::Error;

/// Prefix of every tag owned by the synchronizer.
pub const TAG_PREFIX: &str = "person:";

#[derive(Error, Debug)]
pub enum TagStoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Tag namespace. Photo and video tags are independent even when named alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Photo,
    Video,
}

impl TagKind {
    pub const ALL: [TagKind; 2] = [TagKind::Photo, TagKind::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::Photo => "photo",
            TagKind::Video => "video",
        }
    }

    pub(crate) fn from_db(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(TagKind::Photo),
            "video" => Some(TagKind::Video),
            _ => None,
        }
    }
}

/// Build the managed tag name for a person.
pub fn person_tag(name: &str) -> String {
    format!("{TAG_PREFIX}{name}")
}

/// Tag operations of the external media catalog.
pub trait TagStore {
    fn is_read_only(&self) -> bool;

    fn tag_exists(&self, tag: &str, kind: TagKind) -> Result<bool, TagStoreError>;

    fn create_tag(&self, tag: &str, kind: TagKind, commit: Commit) -> Result<(), TagStoreError>;

    /// Remove every tag starting with `prefix` from one file.
    fn clean_tags(&self, filename: &str, prefix: &str, commit: Commit) -> Result<(), TagStoreError>;

    /// Assign `tags` of namespace `kind` to one file.
    ///
    /// Returns the number of taggings added; 0 for a file the catalog does not know.
    fn set_tags(
        &self,
        filename: &str,
        tags: &[String],
        kind: TagKind,
        commit: Commit,
    ) -> Result<usize, TagStoreError>;

    /// Detach every tag starting with `prefix` from all files; with `cleanup`,
    /// also drop the now-unused tag definitions. Commits immediately.
    fn delete_tags(&self, prefix: &str, cleanup: bool) -> Result<(), TagStoreError>;

    /// Catalog files under a path prefix (`*` suffix stripped), sorted.
    fn get_files(&self, folder: &str) -> Result<Vec<String>, TagStoreError>;

    /// Tags currently assigned to one file, sorted.
    fn get_tags(&self, filename: &str) -> Result<Vec<(String, TagKind)>, TagStoreError>;

    fn commit(&self) -> Result<(), TagStoreError>;

    /// Discard every deferred change not yet committed.
    fn rollback(&self) -> Result<(), TagStoreError>;
}

/// Open the catalog at `path`; `dry_run` opens it read-only and discards writes.
pub fn open_tag_store(path: &Path, dry_run: bool) -> Result<Box<dyn TagStore>, TagStoreError> {
    tracing::debug!(path = %path.display(), dry_run, "opening tag store");
    if dry_run {
        Ok(Box::new(ReadOnly::new(CatalogTagStore::open_read_only(path)?)))
    } else {
        Ok(Box::new(CatalogTagStore::open(path)?))
    }
}
