//! Read-only view over a store: queries delegate, mutations are discarded.
//!
//! Used for dry runs. Suppressed mutations are not errors; they log at debug
//! level and report success so callers need no special casing.

use crate::store::{FaceDb, FaceStore, StoreError};
use crate::tags::{TagKind, TagStore, TagStoreError};
use crate::types::{Commit, FaceId, NewFace};

/// Wraps a store and turns every mutator into a no-op.
pub struct ReadOnly<S> {
    inner: S,
}

impl<S> ReadOnly<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FaceStore> FaceStore for ReadOnly<S> {
    fn db(&self) -> &FaceDb {
        self.inner.db()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn insert(
        &self,
        filename: &str,
        faces: &[NewFace],
        _commit: Commit,
    ) -> Result<Vec<FaceId>, StoreError> {
        tracing::debug!(filename, faces = faces.len(), "read-only: insert skipped");
        Ok(vec![0; faces.len()])
    }

    fn remove(&self, filename: &str, _commit: Commit) -> Result<(), StoreError> {
        tracing::debug!(filename, "read-only: remove skipped");
        Ok(())
    }

    fn move_file(&self, old: &str, new: &str, _commit: Commit) -> Result<(), StoreError> {
        tracing::debug!(old, new, "read-only: move skipped");
        Ok(())
    }

    fn set_face_name(
        &self,
        face_id: FaceId,
        name: &str,
        _distance: f64,
        _pattern: &str,
        _commit: Commit,
    ) -> Result<(), StoreError> {
        tracing::debug!(face_id, name, "read-only: set_face_name skipped");
        Ok(())
    }

    fn mark_synced(&self, filename: &str, _commit: Commit) -> Result<(), StoreError> {
        tracing::debug!(filename, "read-only: mark_synced skipped");
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<T: TagStore> TagStore for ReadOnly<T> {
    fn is_read_only(&self) -> bool {
        true
    }

    fn tag_exists(&self, tag: &str, kind: TagKind) -> Result<bool, TagStoreError> {
        self.inner.tag_exists(tag, kind)
    }

    fn create_tag(&self, tag: &str, kind: TagKind, _commit: Commit) -> Result<(), TagStoreError> {
        tracing::debug!(tag, ?kind, "read-only: create_tag skipped");
        Ok(())
    }

    fn clean_tags(&self, filename: &str, prefix: &str, _commit: Commit) -> Result<(), TagStoreError> {
        tracing::debug!(filename, prefix, "read-only: clean_tags skipped");
        Ok(())
    }

    fn set_tags(
        &self,
        filename: &str,
        tags: &[String],
        kind: TagKind,
        _commit: Commit,
    ) -> Result<usize, TagStoreError> {
        tracing::debug!(filename, ?tags, ?kind, "read-only: set_tags skipped");
        Ok(tags.len())
    }

    fn delete_tags(&self, prefix: &str, cleanup: bool) -> Result<(), TagStoreError> {
        tracing::debug!(prefix, cleanup, "read-only: delete_tags skipped");
        Ok(())
    }

    fn get_files(&self, folder: &str) -> Result<Vec<String>, TagStoreError> {
        self.inner.get_files(folder)
    }

    fn get_tags(&self, filename: &str) -> Result<Vec<(String, TagKind)>, TagStoreError> {
        self.inner.get_tags(filename)
    }

    fn commit(&self) -> Result<(), TagStoreError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), TagStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteFaceStore;
    use crate::tags::CatalogTagStore;
    use crate::types::{Encoding, FaceBox};

    fn face(name: &str) -> NewFace {
        NewFace {
            face_box: FaceBox::from((0, 1, 1, 0)),
            encoding: Encoding::new(vec![0.5; 2]),
            landmarks: None,
            name: name.to_string(),
            distance: 0.0,
            frame: 0,
            pattern: String::new(),
        }
    }

    #[test]
    fn test_face_mutations_are_discarded() {
        let store = SqliteFaceStore::open_in_memory().unwrap();
        let ids = store.insert("/p/a.jpg", &[face("")], Commit::Now).unwrap();
        let ro = ReadOnly::new(store);

        assert!(ro.is_read_only());
        assert_eq!(ro.insert("/p/b.jpg", &[face("x")], Commit::Now).unwrap(), vec![0]);
        ro.set_face_name(ids[0], "alice", 0.1, "", Commit::Now).unwrap();
        ro.move_file("/p/a.jpg", "/q/a.jpg", Commit::Now).unwrap();
        ro.mark_synced("/p/a.jpg", Commit::Deferred).unwrap();
        ro.commit().unwrap();

        assert_eq!(ro.get_files(None).unwrap(), vec!["/p/a.jpg"]);
        assert_eq!(ro.db().is_synced("/p/a.jpg").unwrap(), Some(false));
        assert!(!ro.inner().is_read_only());
    }

    #[test]
    fn test_tag_reads_delegate() {
        let catalog = CatalogTagStore::open_in_memory().unwrap();
        catalog.register_file("/p/a.jpg").unwrap();
        catalog
            .set_tags("/p/a.jpg", &["trip".to_string()], TagKind::Photo, Commit::Now)
            .unwrap();
        let ro = ReadOnly::new(catalog);

        let would_add = ro
            .set_tags("/p/a.jpg", &["a".to_string(), "b".to_string()], TagKind::Video, Commit::Now)
            .unwrap();
        assert_eq!(would_add, 2);
        ro.delete_tags("", true).unwrap();
        ro.clean_tags("/p/a.jpg", "", Commit::Now).unwrap();
        assert_eq!(ro.get_files("/p/").unwrap(), vec!["/p/a.jpg"]);
        assert_eq!(
            ro.get_tags("/p/a.jpg").unwrap(),
            vec![("trip".to_string(), TagKind::Photo)]
        );
        assert!(ro.tag_exists("trip", TagKind::Photo).unwrap());
    }
}
