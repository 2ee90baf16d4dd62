use super::{TagKind, TagStore, TagStoreError};
use crate::media;
use crate::txn;
use crate::types::Commit;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

const CATALOG_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS media_items (
    id   INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    file TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS tags (
    id       INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    tag      TEXT NOT NULL,
    tag_type TEXT NOT NULL,
    UNIQUE (tag, tag_type)
);

CREATE TABLE IF NOT EXISTS taggings (
    id            INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    media_item_id INTEGER NOT NULL REFERENCES media_items(id),
    tag_id        INTEGER NOT NULL REFERENCES tags(id),
    UNIQUE (media_item_id, tag_id)
);

CREATE INDEX IF NOT EXISTS taggings_tag_id ON taggings (tag_id);
"#;

const PREFIX_TAG_IDS: &str = "SELECT id FROM tags WHERE substr(tag, 1, ?1) = ?2";

/// SQLite media catalog: media items, typed tags, and the taggings between them.
pub struct CatalogTagStore {
    conn: Connection,
}

impl CatalogTagStore {
    pub fn open(path: &Path) -> Result<Self, TagStoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, TagStoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn open_read_only(path: &Path) -> Result<Self, TagStoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    fn init(conn: Connection) -> Result<Self, TagStoreError> {
        conn.execute_batch(CATALOG_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Add a media item to the catalog. Existing items are left alone.
    pub fn register_file(&self, filename: &str) -> Result<(), TagStoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO media_items (file) VALUES (?1)",
            params![filename],
        )?;
        Ok(())
    }

    fn media_item_id(&self, filename: &str) -> Result<Option<i64>, TagStoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM media_items WHERE file = ?1",
                params![filename],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn ensure_tag(&self, tag: &str, kind: TagKind) -> Result<i64, TagStoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO tags (tag, tag_type) VALUES (?1, ?2)",
            params![tag, kind.as_str()],
        )?;
        Ok(self.conn.query_row(
            "SELECT id FROM tags WHERE tag = ?1 AND tag_type = ?2",
            params![tag, kind.as_str()],
            |row| row.get(0),
        )?)
    }

    fn finish(&self, commit: Commit) -> Result<(), TagStoreError> {
        match commit {
            Commit::Now => TagStore::commit(self),
            Commit::Deferred => Ok(()),
        }
    }
}

impl TagStore for CatalogTagStore {
    fn is_read_only(&self) -> bool {
        self.conn
            .is_readonly(rusqlite::DatabaseName::Main)
            .unwrap_or(false)
    }

    fn tag_exists(&self, tag: &str, kind: TagKind) -> Result<bool, TagStoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tags WHERE tag = ?1 AND tag_type = ?2",
            params![tag, kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }

    fn create_tag(&self, tag: &str, kind: TagKind, commit: Commit) -> Result<(), TagStoreError> {
        txn::begin(&self.conn)?;
        self.ensure_tag(tag, kind)?;
        self.finish(commit)
    }

    fn clean_tags(&self, filename: &str, prefix: &str, commit: Commit) -> Result<(), TagStoreError> {
        txn::begin(&self.conn)?;
        let removed = self.conn.execute(
            &format!(
                "DELETE FROM taggings \
                 WHERE media_item_id IN (SELECT id FROM media_items WHERE file = ?3) \
                   AND tag_id IN ({PREFIX_TAG_IDS})"
            ),
            params![prefix.chars().count() as i64, prefix, filename],
        )?;
        tracing::trace!(filename, prefix, removed, "tags cleaned");
        self.finish(commit)
    }

    fn set_tags(
        &self,
        filename: &str,
        tags: &[String],
        kind: TagKind,
        commit: Commit,
    ) -> Result<usize, TagStoreError> {
        let Some(item_id) = self.media_item_id(filename)? else {
            tracing::warn!(filename, "file not in catalog; tags not set");
            return Ok(0);
        };
        txn::begin(&self.conn)?;
        let mut added = 0;
        for tag in tags {
            let tag_id = self.ensure_tag(tag, kind)?;
            added += self.conn.execute(
                "INSERT OR IGNORE INTO taggings (media_item_id, tag_id) VALUES (?1, ?2)",
                params![item_id, tag_id],
            )?;
        }
        self.finish(commit)?;
        Ok(added)
    }

    fn delete_tags(&self, prefix: &str, cleanup: bool) -> Result<(), TagStoreError> {
        txn::begin(&self.conn)?;
        let len = prefix.chars().count() as i64;
        let taggings = self.conn.execute(
            &format!("DELETE FROM taggings WHERE tag_id IN ({PREFIX_TAG_IDS})"),
            params![len, prefix],
        )?;
        let definitions = if cleanup {
            self.conn.execute(
                "DELETE FROM tags WHERE substr(tag, 1, ?1) = ?2 \
                   AND id NOT IN (SELECT tag_id FROM taggings)",
                params![len, prefix],
            )?
        } else {
            0
        };
        txn::commit(&self.conn)?;
        tracing::info!(prefix, taggings, definitions, "tags deleted");
        Ok(())
    }

    fn get_files(&self, folder: &str) -> Result<Vec<String>, TagStoreError> {
        let folder = media::strip_wildcard(folder);
        let mut stmt = self.conn.prepare(
            "SELECT file FROM media_items WHERE substr(file, 1, ?1) = ?2 ORDER BY file",
        )?;
        let files = stmt
            .query_map(params![folder.chars().count() as i64, folder], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(files)
    }

    fn get_tags(&self, filename: &str) -> Result<Vec<(String, TagKind)>, TagStoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT tags.tag, tags.tag_type \
             FROM taggings \
             JOIN tags ON tags.id = taggings.tag_id \
             JOIN media_items ON media_items.id = taggings.media_item_id \
             WHERE media_items.file = ?1 \
             ORDER BY tags.tag, tags.tag_type",
        )?;
        let rows = stmt
            .query_map(params![filename], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter_map(|(tag, kind)| TagKind::from_db(&kind).map(|k| (tag, k)))
            .collect())
    }

    fn commit(&self) -> Result<(), TagStoreError> {
        Ok(txn::commit(&self.conn)?)
    }

    fn rollback(&self) -> Result<(), TagStoreError> {
        Ok(txn::rollback(&self.conn)?)
    }
}
