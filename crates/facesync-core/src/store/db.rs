//! Shared query engine over one SQLite connection.

use super::query::{FaceQuery, FilesFaces};
use super::StoreError;
use crate::media;
use crate::types::{Encoding, Face, FileFaces};
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id       INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    filename TEXT NOT NULL,
    synced   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS faces (
    id        INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    file_id   INTEGER NOT NULL REFERENCES files(id),
    box       TEXT NOT NULL,
    encoding  BLOB NOT NULL,
    landmarks TEXT,
    name      TEXT NOT NULL DEFAULT '',
    dist      REAL NOT NULL DEFAULT 0,
    frame     INTEGER NOT NULL DEFAULT 0,
    pattern   TEXT NOT NULL DEFAULT ''
);

CREATE UNIQUE INDEX IF NOT EXISTS files_filename ON files (filename);
CREATE INDEX IF NOT EXISTS faces_file_id ON faces (file_id);
CREATE INDEX IF NOT EXISTS faces_name ON faces (name);
"#;

/// Every encoding in the store with a `(filename, face)` back-reference.
///
/// `shards` is a contiguous split of the encodings; `info[i]` describes the
/// i-th encoding counted across all shards in order.
#[derive(Debug, Clone, Default)]
pub struct AllEncodings {
    pub shards: Vec<Vec<Encoding>>,
    pub info: Vec<(String, Face)>,
}

impl AllEncodings {
    pub fn len(&self) -> usize {
        self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// Face count per name plus totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    /// `(name, faces)` ordered by count, descending.
    pub per_name: Vec<(String, i64)>,
    pub total_faces: i64,
    pub total_files: i64,
}

/// Split `items` into `parts` contiguous chunks whose sizes differ by at most one.
pub(crate) fn split_even<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    let parts = parts.max(1);
    let base = items.len() / parts;
    let extra = items.len() % parts;
    let mut iter = items.into_iter();
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            iter.by_ref().take(size).collect()
        })
        .collect()
}

/// Query side of the face store, shared by the writable and read-only variants.
pub struct FaceDb {
    conn: Connection,
    encodings: OnceCell<AllEncodings>,
}

impl FaceDb {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn,
            encodings: OnceCell::new(),
        }
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run a face query.
    pub fn select(&self, query: &FaceQuery) -> Result<FilesFaces<'_>, StoreError> {
        FilesFaces::new(&self.conn, query)
    }

    pub fn file_exists(&self, filename: &str) -> Result<bool, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files WHERE filename = ?1",
            params![filename],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn is_synced(&self, filename: &str) -> Result<Option<bool>, StoreError> {
        let synced = self
            .conn
            .query_row(
                "SELECT synced FROM files WHERE filename = ?1",
                params![filename],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(synced.map(|s| s != 0))
    }

    /// Filenames under a path prefix (`*` suffix stripped); `None` lists every file.
    pub fn get_files(&self, folder: Option<&str>) -> Result<Vec<String>, StoreError> {
        let folder = media::strip_wildcard(folder.unwrap_or(""));
        let mut stmt = self.conn.prepare(
            "SELECT filename FROM files \
             WHERE substr(filename, 1, ?1) = ?2 ORDER BY filename",
        )?;
        let files = stmt
            .query_map(params![folder.chars().count() as i64, folder], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(files)
    }

    /// Each file's directory and that directory's parent, sorted.
    pub fn get_folders(&self) -> Result<Vec<String>, StoreError> {
        let mut folders = BTreeSet::new();
        for filename in self.get_files(None)? {
            let Some(dir) = Path::new(&filename).parent() else {
                continue;
            };
            folders.insert(dir.to_string_lossy().into_owned());
            if let Some(parent) = dir.parent() {
                folders.insert(parent.to_string_lossy().into_owned());
            }
        }
        Ok(folders.into_iter().collect())
    }

    /// Occurrence count of each face name in one file.
    pub fn get_names(&self, filename: &str) -> Result<BTreeMap<String, usize>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT faces.name FROM files JOIN faces ON files.id = faces.file_id \
             WHERE files.filename = ?1",
        )?;
        let mut names = BTreeMap::new();
        let rows = stmt.query_map(params![filename], |row| row.get::<_, String>(0))?;
        for name in rows {
            *names.entry(name?).or_insert(0) += 1;
        }
        Ok(names)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, COUNT(*) FROM faces GROUP BY name ORDER BY 2 DESC, name",
        )?;
        let per_name = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, i64)>, _>>()?;
        let total_faces = self
            .conn
            .query_row("SELECT COUNT(*) FROM faces", [], |row| row.get(0))?;
        let total_files = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(StoreStats {
            per_name,
            total_faces,
            total_files,
        })
    }

    /// Materialize every image-file encoding, split into `split` shards.
    ///
    /// Loaded once per store instance: later writes are not reflected, and the
    /// shard count of the first call sticks (a later `split` is ignored).
    pub fn get_all_encodings(&self, split: usize) -> Result<&AllEncodings, StoreError> {
        if let Some(cached) = self.encodings.get() {
            return Ok(cached);
        }

        tracing::debug!("loading all encodings");
        let mut encodings = Vec::new();
        let mut info = Vec::new();
        for group in self.select(&FaceQuery::All)? {
            let FileFaces { filename, faces } = group?;
            if !media::is_image(&filename) {
                continue;
            }
            for face in faces {
                encodings.push(face.encoding.clone());
                info.push((filename.clone(), face));
            }
        }
        tracing::debug!(count = info.len(), shards = split.max(1), "encodings loaded");

        let loaded = AllEncodings {
            shards: split_even(encodings, split),
            info,
        };
        Ok(self.encodings.get_or_init(|| loaded))
    }

    /// Files holding a face for every name in `names`, optionally restricted to
    /// paths containing `subfolder`. Sorted, without duplicates.
    pub fn find_files_by_names(
        &self,
        names: &[String],
        subfolder: Option<&str>,
    ) -> Result<Vec<String>, StoreError> {
        let subfolder = subfolder.unwrap_or("");
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT files.filename \
             FROM files JOIN faces ON files.id = faces.file_id \
             WHERE instr(files.filename, ?1) > 0 AND faces.name = ?2",
        )?;

        let mut files: Option<BTreeSet<String>> = None;
        for name in names {
            let found = stmt
                .query_map(params![subfolder, name], |row| row.get::<_, String>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            files = Some(match files {
                None => found,
                Some(acc) => acc.intersection(&found).cloned().collect(),
            });
        }
        Ok(files.unwrap_or_default().into_iter().collect())
    }
}
