use super::db::{FaceDb, SCHEMA};
use super::{FaceStore, StoreError};
use crate::codec;
use crate::txn;
use crate::types::{Commit, FaceId, NewFace};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

/// Writable SQLite face store.
///
/// `Commit::Deferred` mutations open a transaction that later calls join;
/// they are visible to reads on this connection right away and become durable
/// on the next `Commit::Now` or [`FaceStore::commit`]. Dropping the store with
/// a transaction open rolls it back.
pub struct SqliteFaceStore {
    db: FaceDb,
}

impl SqliteFaceStore {
    /// Open (creating if needed) a writable store and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory store, used by tests and tooling.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open an existing store with a read-only SQLite connection.
    ///
    /// Any write attempted through this connection fails at the SQLite level;
    /// wrap it in [`crate::ReadOnly`] to get silent no-op mutators.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            db: FaceDb::new(conn),
        })
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            db: FaceDb::new(conn),
        })
    }

    fn conn(&self) -> &Connection {
        self.db.conn()
    }

    fn begin(&self) -> Result<(), StoreError> {
        Ok(txn::begin(self.conn())?)
    }

    fn finish(&self, commit: Commit) -> Result<(), StoreError> {
        match commit {
            Commit::Now => self.commit(),
            Commit::Deferred => Ok(()),
        }
    }

    fn delete_file_rows(&self, filename: &str) -> Result<usize, StoreError> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM faces WHERE file_id IN (SELECT id FROM files WHERE filename = ?1)",
            params![filename],
        )?;
        Ok(conn.execute("DELETE FROM files WHERE filename = ?1", params![filename])?)
    }

    /// Upsert by filename: drop any existing record and its faces, then insert
    /// the new file row and its faces.
    pub fn replace_file(&self, filename: &str, faces: &[NewFace]) -> Result<Vec<FaceId>, StoreError> {
        let replaced = self.delete_file_rows(filename)?;
        if replaced > 0 {
            tracing::debug!(filename, "replacing existing file record");
        }

        let conn = self.conn();
        conn.execute("INSERT INTO files (filename) VALUES (?1)", params![filename])?;
        let file_id = conn.last_insert_rowid();

        let mut stmt = conn.prepare_cached(
            "INSERT INTO faces (file_id, box, encoding, landmarks, name, dist, frame, pattern) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        let mut ids = Vec::with_capacity(faces.len());
        for face in faces {
            stmt.execute(params![
                file_id,
                codec::encode_box(&face.face_box)?,
                codec::encode_encoding(&face.encoding),
                codec::encode_landmarks(face.landmarks.as_ref())?,
                face.name,
                face.distance,
                face.frame,
                face.pattern,
            ])?;
            ids.push(conn.last_insert_rowid());
        }
        Ok(ids)
    }
}

impl FaceStore for SqliteFaceStore {
    fn db(&self) -> &FaceDb {
        &self.db
    }

    fn is_read_only(&self) -> bool {
        self.conn().is_readonly(rusqlite::DatabaseName::Main).unwrap_or(false)
    }

    fn insert(
        &self,
        filename: &str,
        faces: &[NewFace],
        commit: Commit,
    ) -> Result<Vec<FaceId>, StoreError> {
        self.begin()?;
        let ids = self.replace_file(filename, faces)?;
        tracing::debug!(filename, faces = ids.len(), "file inserted");
        self.finish(commit)?;
        Ok(ids)
    }

    fn remove(&self, filename: &str, commit: Commit) -> Result<(), StoreError> {
        self.begin()?;
        let removed = self.delete_file_rows(filename)?;
        tracing::debug!(filename, removed, "file removed");
        self.finish(commit)
    }

    fn move_file(&self, old: &str, new: &str, commit: Commit) -> Result<(), StoreError> {
        self.begin()?;
        let updated = self.conn().execute(
            "UPDATE files SET filename = ?1, synced = 0 WHERE filename = ?2",
            params![new, old],
        )?;
        if updated == 0 {
            tracing::warn!(old, new, "move: file not in store");
        }
        self.finish(commit)
    }

    fn set_face_name(
        &self,
        face_id: FaceId,
        name: &str,
        distance: f64,
        pattern: &str,
        commit: Commit,
    ) -> Result<(), StoreError> {
        self.begin()?;
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE faces SET name = ?1, dist = ?2, pattern = ?3 WHERE id = ?4",
            params![name, distance, pattern, face_id],
        )?;
        if updated == 0 {
            tracing::warn!(face_id, "set_face_name: face not in store");
        } else {
            conn.execute(
                "UPDATE files SET synced = 0 \
                 WHERE id = (SELECT file_id FROM faces WHERE id = ?1)",
                params![face_id],
            )?;
        }
        self.finish(commit)
    }

    fn mark_synced(&self, filename: &str, commit: Commit) -> Result<(), StoreError> {
        self.begin()?;
        self.conn().execute(
            "UPDATE files SET synced = 1 WHERE filename = ?1",
            params![filename],
        )?;
        self.finish(commit)
    }

    fn commit(&self) -> Result<(), StoreError> {
        Ok(txn::commit(self.conn())?)
    }

    fn rollback(&self) -> Result<(), StoreError> {
        Ok(txn::rollback(self.conn())?)
    }
}
