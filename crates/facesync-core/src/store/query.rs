//! Face queries: predicates over files left-joined with their faces and the
//! lazy, filename-grouped iterator that runs them.
//!
//! Predicates on file columns also match files that have no faces; such a
//! file comes back as a group with an empty face list.

use super::StoreError;
use crate::codec;
use crate::types::{Face, FaceId, FileFaces, WEAK_SUFFIX};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::VecDeque;

/// Number of distinct files fetched per page.
const PAGE_FILES: usize = 256;

const FROM_JOIN: &str = "FROM files LEFT JOIN faces ON files.id = faces.file_id";

/// Selection predicate for the face query family.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceQuery {
    All,
    Unsynced,
    Unmatched,
    /// Files under a path prefix.
    Folder(String),
    /// Faces with exactly this name under a path prefix.
    ByName { folder: String, name: String },
    /// Weak matches under a path prefix.
    Weak { folder: String },
    /// Weak or unmatched faces under a path prefix.
    WeakOrUnmatched { folder: String },
    /// A single file by path.
    File(String),
    /// The file holding one face, restricted to that face.
    Face(FaceId),
}

fn prefix_clause(prefix: &str, params: &mut Vec<Value>) -> &'static str {
    params.push(Value::Integer(prefix.chars().count() as i64));
    params.push(Value::Text(prefix.to_string()));
    "substr(files.filename, 1, ?) = ?"
}

impl FaceQuery {
    /// SQL predicate and its positional parameters.
    pub(crate) fn predicate(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = match self {
            FaceQuery::All => "1".to_string(),
            FaceQuery::Unsynced => "files.synced = 0".to_string(),
            FaceQuery::Unmatched => "faces.name = ''".to_string(),
            FaceQuery::Folder(folder) => prefix_clause(folder, &mut params).to_string(),
            FaceQuery::ByName { folder, name } => {
                let prefix = prefix_clause(folder, &mut params);
                params.push(Value::Text(name.clone()));
                format!("{prefix} AND faces.name = ?")
            }
            FaceQuery::Weak { folder } => {
                let prefix = prefix_clause(folder, &mut params);
                params.push(Value::Text(WEAK_SUFFIX.to_string()));
                format!("{prefix} AND substr(faces.name, -{}) = ?", WEAK_SUFFIX.len())
            }
            FaceQuery::WeakOrUnmatched { folder } => {
                let prefix = prefix_clause(folder, &mut params);
                params.push(Value::Text(WEAK_SUFFIX.to_string()));
                format!(
                    "{prefix} AND (substr(faces.name, -{}) = ? OR faces.name = '')",
                    WEAK_SUFFIX.len()
                )
            }
            FaceQuery::File(filename) => {
                params.push(Value::Text(filename.clone()));
                "files.filename = ?".to_string()
            }
            FaceQuery::Face(id) => {
                params.push(Value::Integer(*id));
                "faces.id = ?".to_string()
            }
        };
        (sql, params)
    }
}

/// Lazily produced `(filename, faces)` records, ordered by filename.
///
/// Pages through distinct filenames with a keyset cursor, so the grouping
/// never depends on join output order. Restartable per query call, not
/// resumable mid-iteration.
pub struct FilesFaces<'a> {
    conn: &'a Connection,
    predicate: String,
    params: Vec<Value>,
    count: usize,
    cursor: Option<String>,
    buffer: VecDeque<FileFaces>,
    done: bool,
    page_files: usize,
}

impl<'a> FilesFaces<'a> {
    pub(crate) fn new(conn: &'a Connection, query: &FaceQuery) -> Result<Self, StoreError> {
        Self::with_page_size(conn, query, PAGE_FILES)
    }

    pub(crate) fn with_page_size(
        conn: &'a Connection,
        query: &FaceQuery,
        page_files: usize,
    ) -> Result<Self, StoreError> {
        let (predicate, params) = query.predicate();
        let start = std::time::Instant::now();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(DISTINCT files.filename) {FROM_JOIN} WHERE {predicate}"),
            params_from_iter(params.iter()),
            |row| row.get(0),
        )?;
        tracing::debug!(
            ?query,
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "face query counted"
        );

        Ok(Self {
            conn,
            predicate,
            params,
            count: count as usize,
            cursor: None,
            buffer: VecDeque::new(),
            done: count == 0,
            page_files: page_files.max(1),
        })
    }

    /// Number of distinct files the query matches.
    pub fn file_count(&self) -> usize {
        self.count
    }

    fn fetch_page(&mut self) -> Result<(), StoreError> {
        let mut params = self.params.clone();
        let mut sql = format!(
            "SELECT DISTINCT files.filename {FROM_JOIN} WHERE ({})",
            self.predicate
        );
        if let Some(cursor) = &self.cursor {
            sql.push_str(" AND files.filename > ?");
            params.push(Value::Text(cursor.clone()));
        }
        sql.push_str(" ORDER BY files.filename LIMIT ?");
        params.push(Value::Integer(self.page_files as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let filenames = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let (Some(first), Some(last)) = (filenames.first(), filenames.last()) else {
            self.done = true;
            return Ok(());
        };
        if filenames.len() < self.page_files {
            self.done = true;
        }

        let mut params = self.params.clone();
        params.push(Value::Text(first.clone()));
        params.push(Value::Text(last.clone()));
        let sql = format!(
            "SELECT files.filename, faces.id, faces.box, faces.encoding, faces.landmarks, \
                    faces.name, faces.dist, faces.frame, faces.pattern \
             {FROM_JOIN} \
             WHERE ({}) AND files.filename >= ? AND files.filename <= ? \
             ORDER BY files.filename, faces.id",
            self.predicate
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), RawFace::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for raw in rows {
            let (filename, face) = raw.decode()?;
            let new_group = self.buffer.back().map_or(true, |g| g.filename != filename);
            if new_group {
                self.buffer.push_back(FileFaces {
                    filename,
                    faces: Vec::new(),
                });
            }
            if let (Some(group), Some(face)) = (self.buffer.back_mut(), face) {
                group.faces.push(face);
            }
        }

        self.cursor = Some(last.clone());
        Ok(())
    }
}

impl Iterator for FilesFaces<'_> {
    type Item = Result<FileFaces, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(group) = self.buffer.pop_front() {
                return Some(Ok(group));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

/// Undecoded face row; JSON and blob columns are decoded outside rusqlite's row callback.
///
/// Face columns are all `NULL` for a file without faces.
pub(crate) struct RawFace {
    filename: String,
    id: Option<FaceId>,
    face_box: Option<String>,
    encoding: Option<Vec<u8>>,
    landmarks: Option<String>,
    name: Option<String>,
    distance: Option<f64>,
    frame: Option<i64>,
    pattern: Option<String>,
}

impl RawFace {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filename: row.get(0)?,
            id: row.get(1)?,
            face_box: row.get(2)?,
            encoding: row.get(3)?,
            landmarks: row.get(4)?,
            name: row.get(5)?,
            distance: row.get(6)?,
            frame: row.get(7)?,
            pattern: row.get(8)?,
        })
    }

    pub(crate) fn decode(self) -> Result<(String, Option<Face>), StoreError> {
        let (Some(id), Some(face_box), Some(encoding)) = (self.id, self.face_box, self.encoding)
        else {
            return Ok((self.filename, None));
        };
        let face = Face {
            id,
            face_box: codec::decode_box(&face_box)?,
            encoding: codec::decode_encoding(&encoding)?,
            landmarks: codec::decode_landmarks(self.landmarks.as_deref())?,
            name: self.name.unwrap_or_default(),
            distance: self.distance.unwrap_or_default(),
            frame: self.frame.unwrap_or_default(),
            pattern: self.pattern.unwrap_or_default(),
        };
        Ok((self.filename, Some(face)))
    }
}
