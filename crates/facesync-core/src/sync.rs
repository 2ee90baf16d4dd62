//! Face store ↔ tag store reconciliation.

use crate::media;
use crate::recognizer::{Recognizer, RecognizerError};
use crate::store::{FaceStore, StoreError};
use crate::tags::{person_tag, TagKind, TagStore, TagStoreError, TAG_PREFIX};
use crate::types::{Commit, FileFaces};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("face store: {0}")]
    Store(#[from] StoreError),
    #[error("tag store: {0}")]
    Tags(#[from] TagStoreError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Totals of one `set_tags` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Files visited and marked synced.
    pub files: usize,
    /// Tags assigned across all files.
    pub tags: usize,
}

/// Totals of one `sync_new` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncNewReport {
    pub added: usize,
    pub skipped: usize,
    pub tagged: SyncReport,
}

/// Names supported by a file's evidence.
///
/// Still images keep every classified name. For videos a name is kept only if
/// it appears on at least `min_video_frames` distinct frames. Unmatched faces
/// never yield a name.
pub fn collapse_names(file: &FileFaces, min_video_frames: usize) -> BTreeSet<String> {
    let named = file.faces.iter().filter(|f| !f.is_unmatched());
    if !media::is_video(&file.filename) {
        return named.map(|f| f.name.clone()).collect();
    }

    let mut frames: BTreeMap<&str, BTreeSet<i64>> = BTreeMap::new();
    for face in named {
        frames.entry(face.name.as_str()).or_default().insert(face.frame);
    }
    frames
        .into_iter()
        .filter(|(_, seen)| seen.len() >= min_video_frames)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Tag namespace for a file, by extension.
pub fn tag_kind_for(filename: &str) -> Option<TagKind> {
    if media::is_image(filename) {
        Some(TagKind::Photo)
    } else if media::is_video(filename) {
        Some(TagKind::Video)
    } else {
        None
    }
}

/// Keeps the external tag store consistent with recognition results.
pub struct TagSynchronizer<'a> {
    names: BTreeSet<String>,
    faces: &'a dyn FaceStore,
    tags: &'a dyn TagStore,
    min_video_frames: usize,
}

impl<'a> TagSynchronizer<'a> {
    /// `names` are the managed person names; only they become tags.
    pub fn new(
        names: impl IntoIterator<Item = String>,
        faces: &'a dyn FaceStore,
        tags: &'a dyn TagStore,
        min_video_frames: usize,
    ) -> Self {
        Self {
            names: names.into_iter().collect(),
            faces,
            tags,
            min_video_frames,
        }
    }

    /// Create missing managed tags in both namespaces. Deferred.
    fn create_tags(&self) -> Result<(), SyncError> {
        for name in &self.names {
            let tag = person_tag(name);
            for kind in TagKind::ALL {
                if !self.tags.tag_exists(&tag, kind)? {
                    self.tags.create_tag(&tag, kind, Commit::Deferred)?;
                    tracing::info!(tag = %tag, kind = kind.as_str(), "tag added");
                }
            }
        }
        Ok(())
    }

    /// Roll back both stores' pending batches when `result` is an error.
    fn or_rollback<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(e) = &result {
            tracing::error!(error = %e, "sync failed, rolling back");
            if let Err(rollback) = self.tags.rollback() {
                tracing::error!(error = %rollback, "tag store rollback failed");
            }
            if let Err(rollback) = self.faces.rollback() {
                tracing::error!(error = %rollback, "face store rollback failed");
            }
        }
        result
    }

    /// Propagate face names to file tags.
    ///
    /// Visits every file when `resync` is set, otherwise only unsynced files.
    /// A file re-recognized with no faces is visited too, so its stale
    /// managed tags are cleaned. Each store is committed once, at the end of
    /// the run; on error neither store keeps any of the run's writes.
    pub fn set_tags(&self, resync: bool) -> Result<SyncReport, SyncError> {
        self.or_rollback(self.run_set_tags(resync))
    }

    fn run_set_tags(&self, resync: bool) -> Result<SyncReport, SyncError> {
        tracing::info!(resync, "set tags started");
        self.create_tags()?;

        let files = if resync {
            self.faces.get_all()?
        } else {
            self.faces.get_unsynced()?
        };
        tracing::debug!(files = files.file_count(), "files to sync");

        let mut report = SyncReport::default();
        for group in files {
            let group = group?;
            let filename = group.filename.as_str();
            self.tags.clean_tags(filename, TAG_PREFIX, Commit::Deferred)?;

            let tags: Vec<String> = collapse_names(&group, self.min_video_frames)
                .into_iter()
                .filter(|name| self.names.contains(name))
                .map(|name| person_tag(&name))
                .collect();
            tracing::debug!(filename, ?tags, "sync tags");

            if !tags.is_empty() {
                match tag_kind_for(filename) {
                    Some(kind) => {
                        report.tags += self.tags.set_tags(filename, &tags, kind, Commit::Deferred)?;
                    }
                    None => tracing::warn!(filename, "unknown media type; tags not set"),
                }
            }
            self.faces.mark_synced(filename, Commit::Deferred)?;
            report.files += 1;
        }

        self.tags.commit()?;
        self.faces.commit()?;
        tracing::info!(files = report.files, tags = report.tags, "set tags done");
        Ok(report)
    }

    /// Remove every managed tag and its definition from the tag store.
    pub fn remove_tags(&self) -> Result<(), SyncError> {
        tracing::info!("remove tags started");
        self.tags.delete_tags(TAG_PREFIX, true)?;
        tracing::info!("remove tags done");
        Ok(())
    }

    /// Catalog files under `folder` with an allowed extension that have no face record.
    pub fn files_to_add<S: AsRef<str>>(
        &self,
        folder: &str,
        extensions: &[S],
    ) -> Result<Vec<String>, SyncError> {
        let external: BTreeSet<String> = self
            .tags
            .get_files(folder)?
            .into_iter()
            .filter(|f| media::has_ext(f, extensions))
            .collect();
        let known: BTreeSet<String> = self.faces.get_files(Some(folder))?.into_iter().collect();
        Ok(external.difference(&known).cloned().collect())
    }

    /// Face records under `folder` whose file is gone from the catalog.
    pub fn files_to_remove(&self, folder: &str) -> Result<Vec<String>, SyncError> {
        let external: BTreeSet<String> = self.tags.get_files(folder)?.into_iter().collect();
        let known: BTreeSet<String> = self.faces.get_files(Some(folder))?.into_iter().collect();
        Ok(known.difference(&external).cloned().collect())
    }

    /// Recognize catalog files that are not in the face store yet, then tag
    /// everything unsynced.
    ///
    /// Unreadable files are logged and skipped. Face store writes are
    /// committed once per folder; a fatal error discards the current folder's.
    pub fn sync_new<S: AsRef<str>>(
        &self,
        folders: &[String],
        recognizer: &mut dyn Recognizer,
        extensions: &[S],
    ) -> Result<SyncNewReport, SyncError> {
        let result = self.run_sync_new(folders, recognizer, extensions);
        self.or_rollback(result)
    }

    fn run_sync_new<S: AsRef<str>>(
        &self,
        folders: &[String],
        recognizer: &mut dyn Recognizer,
        extensions: &[S],
    ) -> Result<SyncNewReport, SyncError> {
        tracing::info!(folders = folders.len(), "sync new started");
        let mut report = SyncNewReport::default();

        for folder in folders {
            let to_add = self.files_to_add(folder, extensions)?;
            if to_add.is_empty() {
                tracing::info!(folder = %folder, "no files to add");
                continue;
            }
            tracing::info!(folder = %folder, count = to_add.len(), "adding files");

            for filename in &to_add {
                match recognizer.recognize(filename) {
                    Ok(faces) => {
                        self.faces.insert(filename, &faces, Commit::Deferred)?;
                        report.added += 1;
                    }
                    Err(e) if e.is_per_file() => {
                        tracing::warn!(filename = %filename, error = %e, "skipping file");
                        report.skipped += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            self.faces.commit()?;
        }

        report.tagged = self.run_set_tags(false)?;
        Ok(report)
    }

    /// Drop face records whose files disappeared from the catalog.
    ///
    /// Committed once per folder.
    pub fn sync_deleted(&self, folders: &[String]) -> Result<usize, SyncError> {
        self.or_rollback(self.run_sync_deleted(folders))
    }

    fn run_sync_deleted(&self, folders: &[String]) -> Result<usize, SyncError> {
        tracing::info!(folders = folders.len(), "sync deleted started");
        let mut removed = 0;
        for folder in folders {
            tracing::info!(folder = %folder, "checking folder");
            let to_remove = self.files_to_remove(folder)?;
            if to_remove.is_empty() {
                tracing::info!(folder = %folder, "no files to remove");
            }
            for filename in &to_remove {
                tracing::info!(filename = %filename, "removing from face store");
                self.faces.remove(filename, Commit::Deferred)?;
                removed += 1;
            }
            self.faces.commit()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteFaceStore;
    use crate::tags::CatalogTagStore;
    use crate::types::{Encoding, Face, FaceBox, NewFace};
    use std::collections::HashMap;

    fn new_face(name: &str, frame: i64) -> NewFace {
        NewFace {
            face_box: FaceBox::from((0, 10, 10, 0)),
            encoding: Encoding::new(vec![0.0; 8]),
            landmarks: None,
            name: name.to_string(),
            distance: 0.4,
            frame,
            pattern: String::new(),
        }
    }

    fn file(filename: &str, faces: &[(&str, i64)]) -> FileFaces {
        FileFaces {
            filename: filename.to_string(),
            faces: faces
                .iter()
                .enumerate()
                .map(|(i, (name, frame))| new_face(name, *frame).with_id(i as i64))
                .collect::<Vec<Face>>(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// Recognizer fixture answering from a fixed table; unknown files are unreadable.
    struct TableRecognizer {
        table: HashMap<String, Vec<NewFace>>,
        calls: Vec<String>,
    }

    impl Recognizer for TableRecognizer {
        fn recognize(&mut self, filename: &str) -> Result<Vec<NewFace>, RecognizerError> {
            self.calls.push(filename.to_string());
            self.table
                .get(filename)
                .cloned()
                .ok_or_else(|| RecognizerError::Unreadable {
                    path: filename.to_string(),
                    reason: "missing".into(),
                })
        }
    }

    #[test]
    fn test_video_threshold_drops_rare_names() {
        let video = file("/v/clip.mp4", &[("alice", 0), ("bob", 0), ("bob", 5), ("bob", 9)]);
        let kept = collapse_names(&video, 2);
        assert_eq!(kept, BTreeSet::from(["bob".to_string()]));
    }

    #[test]
    fn test_video_threshold_counts_distinct_frames() {
        let video = file("/v/clip.mov", &[("alice", 3), ("alice", 3)]);
        assert!(collapse_names(&video, 2).is_empty());
    }

    #[test]
    fn test_still_image_ignores_threshold() {
        let photo = file("/p/a.jpg", &[("alice", 0), ("", 0)]);
        assert_eq!(collapse_names(&photo, 5), BTreeSet::from(["alice".to_string()]));
    }

    #[test]
    fn test_tag_kind_by_extension() {
        assert_eq!(tag_kind_for("/p/a.JPG"), Some(TagKind::Photo));
        assert_eq!(tag_kind_for("/p/a.mp4"), Some(TagKind::Video));
        assert_eq!(tag_kind_for("/p/a.txt"), None);
    }

    #[test]
    fn test_end_to_end_single_photo() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("a.jpg").unwrap();
        faces
            .insert("a.jpg", &[new_face("alice", 0), new_face("bob", 0)], Commit::Now)
            .unwrap();

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 2);
        let report = sync.set_tags(false).unwrap();

        assert_eq!(report, SyncReport { files: 1, tags: 1 });
        assert_eq!(
            tags.get_tags("a.jpg").unwrap(),
            vec![("person:alice".to_string(), TagKind::Photo)]
        );
        assert!(!tags.tag_exists("person:bob", TagKind::Photo).unwrap());
        assert!(tags.tag_exists("person:alice", TagKind::Video).unwrap());
        assert_eq!(faces.db().is_synced("a.jpg").unwrap(), Some(true));
    }

    #[test]
    fn test_set_tags_visits_only_unsynced() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        for f in ["/p/a.jpg", "/p/b.jpg", "/p/c.jpg"] {
            tags.register_file(f).unwrap();
            faces.insert(f, &[new_face("alice", 0)], Commit::Now).unwrap();
        }
        faces.mark_synced("/p/b.jpg", Commit::Now).unwrap();

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        let report = sync.set_tags(false).unwrap();

        assert_eq!(report.files, 2);
        assert!(tags.get_tags("/p/b.jpg").unwrap().is_empty());
        for f in ["/p/a.jpg", "/p/b.jpg", "/p/c.jpg"] {
            assert_eq!(faces.db().is_synced(f).unwrap(), Some(true));
        }

        let again = sync.set_tags(false).unwrap();
        assert_eq!(again.files, 0);

        let all = sync.set_tags(true).unwrap();
        assert_eq!(all, SyncReport { files: 3, tags: 3 });
    }

    #[test]
    fn test_set_tags_replaces_stale_managed_tags() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("/p/a.jpg").unwrap();
        tags.set_tags("/p/a.jpg", &["trip".into(), "person:bob".into()], TagKind::Photo, Commit::Now)
            .unwrap();
        let ids = faces
            .insert("/p/a.jpg", &[new_face("bob", 0)], Commit::Now)
            .unwrap();

        let sync = TagSynchronizer::new(names(&["alice", "bob"]), &faces, &tags, 1);
        sync.set_tags(false).unwrap();
        faces
            .set_face_name(ids[0], "alice", 0.3, "alice/1.jpg", Commit::Now)
            .unwrap();
        assert_eq!(faces.db().is_synced("/p/a.jpg").unwrap(), Some(false));

        sync.set_tags(false).unwrap();
        assert_eq!(
            tags.get_tags("/p/a.jpg").unwrap(),
            vec![
                ("person:alice".to_string(), TagKind::Photo),
                ("trip".to_string(), TagKind::Photo),
            ]
        );
    }

    #[test]
    fn test_video_tags_use_video_namespace_and_threshold() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("/v/clip.mp4").unwrap();
        faces
            .insert(
                "/v/clip.mp4",
                &[new_face("alice", 0), new_face("bob", 1), new_face("bob", 2)],
                Commit::Now,
            )
            .unwrap();

        let sync = TagSynchronizer::new(names(&["alice", "bob"]), &faces, &tags, 2);
        let report = sync.set_tags(false).unwrap();
        assert_eq!(report.tags, 1);
        assert_eq!(
            tags.get_tags("/v/clip.mp4").unwrap(),
            vec![("person:bob".to_string(), TagKind::Video)]
        );
    }

    #[test]
    fn test_remove_tags() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("/p/a.jpg").unwrap();
        faces.insert("/p/a.jpg", &[new_face("alice", 0)], Commit::Now).unwrap();

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        sync.set_tags(false).unwrap();
        sync.remove_tags().unwrap();

        assert!(tags.get_tags("/p/a.jpg").unwrap().is_empty());
        assert!(!tags.tag_exists("person:alice", TagKind::Photo).unwrap());
    }

    #[test]
    fn test_set_differences() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        for f in ["/p/both.jpg", "/p/new.jpg", "/p/new.mp4", "/p/notes.txt", "/q/other.jpg"] {
            tags.register_file(f).unwrap();
        }
        for f in ["/p/both.jpg", "/p/stale.jpg", "/q/kept.jpg"] {
            faces.insert(f, &[new_face("", 0)], Commit::Now).unwrap();
        }

        let sync = TagSynchronizer::new(names(&[]), &faces, &tags, 1);
        assert_eq!(sync.files_to_add("/p/", &[".jpg"]).unwrap(), vec!["/p/new.jpg"]);
        assert_eq!(
            sync.files_to_add("/p/", &[".jpg", ".mp4"]).unwrap(),
            vec!["/p/new.jpg", "/p/new.mp4"]
        );
        assert_eq!(sync.files_to_remove("/p/").unwrap(), vec!["/p/stale.jpg"]);
        assert_eq!(sync.files_to_remove("/q/").unwrap(), vec!["/q/kept.jpg"]);
        assert!(sync.files_to_add("/r/", &[".jpg"]).unwrap().is_empty());
    }

    #[test]
    fn test_sync_new_recognizes_and_tags() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        for f in ["/p/b.jpg", "/p/a.jpg", "/p/broken.jpg", "/p/known.jpg"] {
            tags.register_file(f).unwrap();
        }
        faces.insert("/p/known.jpg", &[new_face("alice", 0)], Commit::Now).unwrap();
        faces.mark_synced("/p/known.jpg", Commit::Now).unwrap();

        let mut recognizer = TableRecognizer {
            table: HashMap::from([
                ("/p/a.jpg".to_string(), vec![new_face("alice", 0)]),
                ("/p/b.jpg".to_string(), vec![new_face("", 0)]),
            ]),
            calls: Vec::new(),
        };

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        let report = sync
            .sync_new(&names(&["/p/"]), &mut recognizer, &[".jpg"])
            .unwrap();

        assert_eq!(recognizer.calls, vec!["/p/a.jpg", "/p/b.jpg", "/p/broken.jpg"]);
        assert_eq!(report.added, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.tagged, SyncReport { files: 2, tags: 1 });
        assert_eq!(
            tags.get_tags("/p/a.jpg").unwrap(),
            vec![("person:alice".to_string(), TagKind::Photo)]
        );
        assert!(!faces.db().file_exists("/p/broken.jpg").unwrap());
    }

    #[test]
    fn test_sync_deleted_removes_missing() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("/p/a.jpg").unwrap();
        for f in ["/p/a.jpg", "/p/b.jpg", "/p/c.mp4", "/elsewhere/d.jpg"] {
            faces.insert(f, &[new_face("alice", 0)], Commit::Now).unwrap();
        }

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        let removed = sync.sync_deleted(&names(&["/p/"])).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(
            faces.get_files(None).unwrap(),
            vec!["/elsewhere/d.jpg", "/p/a.jpg"]
        );
    }

    #[test]
    fn test_dry_run_sync_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let face_path = dir.path().join("faces.db");
        let tag_path = dir.path().join("catalog.db");
        {
            let faces = SqliteFaceStore::open(&face_path).unwrap();
            faces.insert("/p/a.jpg", &[new_face("alice", 0)], Commit::Now).unwrap();
            let tags = CatalogTagStore::open(&tag_path).unwrap();
            tags.register_file("/p/a.jpg").unwrap();
        }

        let faces = crate::store::open_face_store(&face_path, true).unwrap();
        let tags = crate::tags::open_tag_store(&tag_path, true).unwrap();
        let sync = TagSynchronizer::new(names(&["alice"]), faces.as_ref(), tags.as_ref(), 1);
        let report = sync.set_tags(false).unwrap();

        assert_eq!(report.files, 1);
        assert_eq!(faces.db().is_synced("/p/a.jpg").unwrap(), Some(false));
        assert!(tags.get_tags("/p/a.jpg").unwrap().is_empty());
        assert!(!tags.tag_exists("person:alice", TagKind::Photo).unwrap());
    }

    #[test]
    fn test_file_reduced_to_no_faces_loses_stale_tags() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        tags.register_file("/p/a.jpg").unwrap();
        faces.insert("/p/a.jpg", &[new_face("bob", 0)], Commit::Now).unwrap();

        let sync = TagSynchronizer::new(names(&["bob"]), &faces, &tags, 1);
        sync.set_tags(false).unwrap();
        assert_eq!(tags.get_tags("/p/a.jpg").unwrap().len(), 1);

        faces.insert("/p/a.jpg", &[], Commit::Now).unwrap();
        let report = sync.set_tags(false).unwrap();

        assert_eq!(report, SyncReport { files: 1, tags: 0 });
        assert!(tags.get_tags("/p/a.jpg").unwrap().is_empty());
        assert_eq!(faces.db().is_synced("/p/a.jpg").unwrap(), Some(true));
    }

    /// Catalog that refuses to tag one file.
    struct RefusingCatalog {
        inner: CatalogTagStore,
        refuse: &'static str,
    }

    impl TagStore for RefusingCatalog {
        fn is_read_only(&self) -> bool {
            false
        }
        fn tag_exists(&self, tag: &str, kind: TagKind) -> Result<bool, TagStoreError> {
            self.inner.tag_exists(tag, kind)
        }
        fn create_tag(&self, tag: &str, kind: TagKind, c: Commit) -> Result<(), TagStoreError> {
            self.inner.create_tag(tag, kind, c)
        }
        fn clean_tags(&self, f: &str, prefix: &str, c: Commit) -> Result<(), TagStoreError> {
            self.inner.clean_tags(f, prefix, c)
        }
        fn set_tags(
            &self,
            f: &str,
            tags: &[String],
            kind: TagKind,
            c: Commit,
        ) -> Result<usize, TagStoreError> {
            if f == self.refuse {
                return Err(TagStoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
            }
            self.inner.set_tags(f, tags, kind, c)
        }
        fn delete_tags(&self, prefix: &str, cleanup: bool) -> Result<(), TagStoreError> {
            self.inner.delete_tags(prefix, cleanup)
        }
        fn get_files(&self, folder: &str) -> Result<Vec<String>, TagStoreError> {
            self.inner.get_files(folder)
        }
        fn get_tags(&self, f: &str) -> Result<Vec<(String, TagKind)>, TagStoreError> {
            self.inner.get_tags(f)
        }
        fn commit(&self) -> Result<(), TagStoreError> {
            self.inner.commit()
        }
        fn rollback(&self) -> Result<(), TagStoreError> {
            self.inner.rollback()
        }
    }

    #[test]
    fn test_set_tags_failure_discards_whole_batch() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = RefusingCatalog {
            inner: CatalogTagStore::open_in_memory().unwrap(),
            refuse: "/p/b.jpg",
        };
        for f in ["/p/a.jpg", "/p/b.jpg"] {
            tags.inner.register_file(f).unwrap();
            faces.insert(f, &[new_face("alice", 0)], Commit::Now).unwrap();
        }

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        assert!(matches!(sync.set_tags(false), Err(SyncError::Tags(_))));

        faces.commit().unwrap();
        tags.commit().unwrap();
        assert_eq!(faces.db().is_synced("/p/a.jpg").unwrap(), Some(false));
        assert!(tags.get_tags("/p/a.jpg").unwrap().is_empty());
        assert!(!tags.tag_exists("person:alice", TagKind::Photo).unwrap());
    }

    /// Recognizer that crashes on one file.
    struct CrashingRecognizer {
        crash_on: &'static str,
    }

    impl Recognizer for CrashingRecognizer {
        fn recognize(&mut self, filename: &str) -> Result<Vec<NewFace>, RecognizerError> {
            if filename == self.crash_on {
                return Err(RecognizerError::Failed {
                    path: filename.to_string(),
                    stderr: "segfault".into(),
                });
            }
            Ok(vec![new_face("alice", 0)])
        }
    }

    #[test]
    fn test_sync_new_fatal_error_discards_folder_batch() {
        let faces = SqliteFaceStore::open_in_memory().unwrap();
        let tags = CatalogTagStore::open_in_memory().unwrap();
        for f in ["/p/a.jpg", "/p/b.jpg"] {
            tags.register_file(f).unwrap();
        }

        let sync = TagSynchronizer::new(names(&["alice"]), &faces, &tags, 1);
        let mut recognizer = CrashingRecognizer { crash_on: "/p/b.jpg" };
        let err = sync
            .sync_new(&names(&["/p/"]), &mut recognizer, &[".jpg"])
            .unwrap_err();
        assert!(matches!(err, SyncError::Recognizer(_)));

        faces.commit().unwrap();
        assert!(faces.get_files(None).unwrap().is_empty());
    }
}
