//! SQLite backend for the persistent entry store.
//!
//! This module provides:
//! - `Database`: entry and chunk tables with a unique content-hash index
//! - `fts`: the FTS5 lexical index over chunk text, kept in sync by triggers

pub mod fts;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use thiserror::Error;

use crate::memory_types::{Chunk, MemoryEntry, MemoryType, Metadata};

/// Maximum number of rows a single query may request.
pub const MAX_QUERY_LIMIT: usize = 10_000;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the persistent entry store. Always fatal to the caller.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Integrity error: {0}")]
    Integrity(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of an insert guarded by the content-hash uniqueness constraint.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    /// Identical content already stored; its `updated_at` was refreshed.
    Existing(MemoryEntry),
}

/// Aggregates reported by `Database::summary`.
#[derive(Debug, Default)]
pub struct StoreSummary {
    pub total_entries: usize,
    pub total_chunks: usize,
    pub entries_by_type: BTreeMap<String, usize>,
    pub embedding_models: BTreeMap<String, usize>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// SQLite database holding entries, chunks and the lexical index.
///
/// Writes go through a single writer connection, which serializes them and
/// keeps the content-hash check and insert atomic. Reads use a separate
/// connection so they never wait on an in-flight write (WAL mode).
pub struct Database {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

const ENTRY_COLUMNS: &str =
    "m.id, m.content, m.content_hash, m.metadata, m.memory_type, m.embedding_model, m.created_at, m.updated_at";

/// Initialize database schema and create necessary tables and triggers.
fn create_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS memories (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            metadata TEXT NOT NULL DEFAULT '{}',
            memory_type TEXT NOT NULL,
            embedding_model TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(memory_type);
        CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);

        CREATE TABLE IF NOT EXISTS chunks (
            chunk_id TEXT PRIMARY KEY,
            parent_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
            chunk_index INTEGER NOT NULL,
            total_chunks INTEGER NOT NULL,
            overlap INTEGER NOT NULL DEFAULT 0,
            text TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_parent ON chunks(parent_id);

        CREATE TABLE IF NOT EXISTS pending_vector_deletes (
            chunk_id TEXT PRIMARY KEY
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
            text,
            tokenize='porter unicode61',
            content='chunks',
            content_rowid='rowid'
        );

        CREATE TRIGGER IF NOT EXISTS chunks_fts_insert AFTER INSERT ON chunks BEGIN
            INSERT INTO chunks_fts(rowid, text) VALUES (new.rowid, new.text);
        END;

        CREATE TRIGGER IF NOT EXISTS chunks_fts_delete AFTER DELETE ON chunks BEGIN
            INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES('delete', old.rowid, old.text);
        END;

        CREATE TRIGGER IF NOT EXISTS chunks_fts_update AFTER UPDATE ON chunks BEGIN
            INSERT INTO chunks_fts(chunks_fts, rowid, text) VALUES('delete', old.rowid, old.text);
            INSERT INTO chunks_fts(rowid, text) VALUES (new.rowid, new.text);
        END;
        "#,
    )?;
    Ok(())
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    Ok(())
}

/// Validate a row limit is within acceptable bounds.
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(StorageError::InvalidLimit(
            "Limit must be greater than 0".to_string(),
        ));
    }
    if limit > MAX_QUERY_LIMIT {
        return Err(StorageError::InvalidLimit(format!(
            "Limit {} exceeds maximum allowed ({})",
            limit, MAX_QUERY_LIMIT
        )));
    }
    Ok(())
}

/// Current time at the precision timestamps are persisted with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

/// Map a row selected with `ENTRY_COLUMNS` (starting at column 0).
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let metadata: String = row.get(3)?;
    let memory_type: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(MemoryEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        content_hash: row.get(2)?,
        metadata: serde_json::from_str::<Metadata>(&metadata).map_err(|e| conversion_error(3, e))?,
        memory_type: memory_type.parse::<MemoryType>().map_err(|e| {
            conversion_error(4, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?,
        embedding_model: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

fn touch_in(tx: &Transaction<'_>, content_hash: &str) -> Result<Option<MemoryEntry>> {
    let rows = tx.execute(
        "UPDATE memories SET updated_at = ?1 WHERE content_hash = ?2",
        params![format_timestamp(&now()), content_hash],
    )?;
    if rows == 0 {
        return Ok(None);
    }
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM memories m WHERE m.content_hash = ?1");
    Ok(tx.query_row(&sql, [content_hash], entry_from_row).optional()?)
}

impl Database {
    /// Open or create a SQLite database at the given path.
    ///
    /// Initializes the schema if the database is new.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened or schema initialization fails.
    pub fn open(path: &Path) -> Result<Self> {
        let mut writer = Connection::open(path)?;
        configure(&writer)?;
        create_schema(&mut writer)?;
        fts::repair_if_stale(&mut writer)?;

        let reader = Connection::open(path)?;
        configure(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert an entry and its chunks, unless identical content exists.
    ///
    /// The hash check and the insert run in one write transaction, so two
    /// concurrent stores of the same content can never create two entries.
    pub fn insert_or_touch(&self, entry: &MemoryEntry, chunks: &[Chunk]) -> Result<InsertOutcome> {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction()?;

        if let Some(existing) = touch_in(&tx, &entry.content_hash)? {
            tx.commit()?;
            return Ok(InsertOutcome::Existing(existing));
        }

        tx.execute(
            r#"
            INSERT INTO memories (id, content, content_hash, metadata, memory_type, embedding_model, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                &entry.id,
                &entry.content,
                &entry.content_hash,
                serde_json::to_string(&entry.metadata)?,
                entry.memory_type.as_str(),
                &entry.embedding_model,
                format_timestamp(&entry.created_at),
                format_timestamp(&entry.updated_at),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (chunk_id, parent_id, chunk_index, total_chunks, overlap, text)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for chunk in chunks {
                stmt.execute(params![
                    &chunk.chunk_id,
                    &chunk.parent_id,
                    chunk.index as i64,
                    chunk.total_chunks as i64,
                    chunk.overlap as i64,
                    &chunk.text,
                ])?;
            }
        }

        tx.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    /// Refresh `updated_at` of the entry with this content hash, if any.
    pub fn touch_by_hash(&self, content_hash: &str) -> Result<Option<MemoryEntry>> {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction()?;
        let entry = touch_in(&tx, content_hash)?;
        tx.commit()?;
        Ok(entry)
    }

    /// Record which model produced an entry's vectors.
    pub fn set_embedding_model(&self, id: &str, model: &str) -> Result<()> {
        let conn = lock(&self.writer);
        conn.execute(
            "UPDATE memories SET embedding_model = ?1 WHERE id = ?2",
            params![model, id],
        )?;
        Ok(())
    }

    /// Retrieve a single entry by ID.
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let conn = lock(&self.reader);
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM memories m WHERE m.id = ?1");
        Ok(conn.query_row(&sql, [id], entry_from_row).optional()?)
    }

    /// Retrieve a single entry by content hash.
    pub fn get_by_hash(&self, content_hash: &str) -> Result<Option<MemoryEntry>> {
        let conn = lock(&self.reader);
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM memories m WHERE m.content_hash = ?1");
        Ok(conn.query_row(&sql, [content_hash], entry_from_row).optional()?)
    }

    /// Chunks of an entry, in order.
    pub fn chunks(&self, parent_id: &str) -> Result<Vec<Chunk>> {
        let conn = lock(&self.reader);
        let mut stmt = conn.prepare(
            r#"
            SELECT chunk_id, parent_id, chunk_index, total_chunks, overlap, text
            FROM chunks
            WHERE parent_id = ?1
            ORDER BY chunk_index
            "#,
        )?;

        let chunks = stmt
            .query_map([parent_id], |row| {
                Ok(Chunk {
                    chunk_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    index: row.get::<_, i64>(2)? as usize,
                    total_chunks: row.get::<_, i64>(3)? as usize,
                    overlap: row.get::<_, i64>(4)? as usize,
                    text: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    /// List entries newest first, optionally restricted to one type.
    pub fn list(&self, limit: usize, memory_type: Option<MemoryType>) -> Result<Vec<MemoryEntry>> {
        validate_limit(limit)?;

        let conn = lock(&self.reader);
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}
            FROM memories m
            WHERE (?1 IS NULL OR m.memory_type = ?1)
            ORDER BY m.created_at DESC, m.id
            LIMIT ?2
            "#
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(
                params![memory_type.map(|t| t.as_str()), limit as i64],
                entry_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Delete an entry with its chunks and lexical index rows.
    ///
    /// The removed chunk ids are queued in `pending_vector_deletes` in the
    /// same transaction until the vector index confirms their removal.
    /// Returns those ids, or `None` if the entry did not exist.
    pub fn delete(&self, id: &str) -> Result<Option<Vec<String>>> {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction()?;

        let chunk_ids = {
            let mut stmt =
                tx.prepare("SELECT chunk_id FROM chunks WHERE parent_id = ?1 ORDER BY chunk_index")?;
            stmt.query_map([id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        tx.execute("DELETE FROM chunks WHERE parent_id = ?1", [id])?;
        let rows = tx.execute("DELETE FROM memories WHERE id = ?1", [id])?;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO pending_vector_deletes (chunk_id) VALUES (?1)")?;
            for chunk_id in &chunk_ids {
                stmt.execute([chunk_id])?;
            }
        }
        tx.commit()?;

        Ok((rows > 0).then_some(chunk_ids))
    }

    /// Chunk ids whose vectors still have to be removed from the vector index.
    pub fn pending_vector_deletes(&self) -> Result<Vec<String>> {
        let conn = lock(&self.reader);
        let mut stmt = conn.prepare("SELECT chunk_id FROM pending_vector_deletes ORDER BY chunk_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Forget chunk ids once the vector index has removed them.
    pub fn clear_vector_deletes(&self, chunk_ids: &[String]) -> Result<()> {
        let mut conn = lock(&self.writer);
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM pending_vector_deletes WHERE chunk_id = ?1")?;
            for chunk_id in chunk_ids {
                stmt.execute([chunk_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Counts and time range for `stats()`.
    pub fn summary(&self) -> Result<StoreSummary> {
        let conn = lock(&self.reader);
        let mut summary = StoreSummary {
            total_entries: conn.query_row("SELECT COUNT(*) FROM memories", [], |row| {
                row.get::<_, i64>(0)
            })? as usize,
            total_chunks: conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| {
                row.get::<_, i64>(0)
            })? as usize,
            ..StoreSummary::default()
        };

        let mut stmt =
            conn.prepare("SELECT memory_type, COUNT(*) FROM memories GROUP BY memory_type")?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (memory_type, count) = row?;
            summary.entries_by_type.insert(memory_type, count as usize);
        }

        let mut stmt = conn.prepare(
            "SELECT COALESCE(embedding_model, 'none'), COUNT(*) FROM memories GROUP BY 1",
        )?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (model, count) = row?;
            summary.embedding_models.insert(model, count as usize);
        }

        let (oldest, newest): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM memories",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        summary.oldest = oldest.as_deref().map(|s| parse_timestamp(0, s)).transpose()?;
        summary.newest = newest.as_deref().map(|s| parse_timestamp(1, s)).transpose()?;

        Ok(summary)
    }

    /// Size of the database file on disk, including the WAL.
    pub fn storage_size(&self) -> u64 {
        let wal = PathBuf::from(format!("{}-wal", self.path.display()));
        [self.path.as_path(), wal.as_path()]
            .iter()
            .filter_map(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }

    /// Reader connection, for crate-internal queries and tests.
    pub(crate) fn read_conn(&self) -> MutexGuard<'_, Connection> {
        lock(&self.reader)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chunker;
    use tempfile::TempDir;

    pub(crate) fn create_test_db() -> Database {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::open(&path).unwrap();
        std::mem::forget(dir);
        db
    }

    pub(crate) fn make_entry(id: &str, content: &str, memory_type: MemoryType) -> (MemoryEntry, Vec<Chunk>) {
        let ts = now();
        let entry = MemoryEntry {
            id: id.to_string(),
            content: content.to_string(),
            content_hash: chunker::identify(content),
            metadata: Metadata::new(),
            created_at: ts,
            updated_at: ts,
            memory_type,
            embedding_model: Some("test-model".to_string()),
        };
        let pieces = chunker::chunk_with_overlap(content, 100, 10);
        let total = pieces.len();
        let chunks = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| Chunk {
                chunk_id: Chunk::chunk_id(id, i),
                parent_id: id.to_string(),
                index: i,
                total_chunks: total,
                text: piece.text,
                overlap: piece.overlap,
            })
            .collect();
        (entry, chunks)
    }

    fn insert(db: &Database, id: &str, content: &str) -> MemoryEntry {
        let (entry, chunks) = make_entry(id, content, MemoryType::Note);
        assert!(matches!(
            db.insert_or_touch(&entry, &chunks).unwrap(),
            InsertOutcome::Inserted
        ));
        entry
    }

    #[test]
    fn test_insert_and_get() {
        let db = create_test_db();
        let entry = insert(&db, "mem_1", "test content");

        let stored = db.get("mem_1").unwrap().unwrap();
        assert_eq!(stored.content, "test content");
        assert_eq!(stored.memory_type, MemoryType::Note);
        assert_eq!(stored.created_at, entry.created_at);
        assert_eq!(db.get_by_hash(&entry.content_hash).unwrap().unwrap().id, "mem_1");
    }

    #[test]
    fn test_metadata_round_trip() {
        let db = create_test_db();
        let (mut entry, chunks) = make_entry("mem_meta", "with metadata", MemoryType::Decision);
        entry.metadata.insert("project".into(), serde_json::json!("neura"));
        entry.metadata.insert("priority".into(), serde_json::json!(3));
        db.insert_or_touch(&entry, &chunks).unwrap();

        let stored = db.get("mem_meta").unwrap().unwrap();
        assert_eq!(stored.metadata, entry.metadata);
        assert_eq!(stored.memory_type, MemoryType::Decision);
    }

    #[test]
    fn test_duplicate_hash_touches_existing() {
        let db = create_test_db();
        let original = insert(&db, "mem_1", "same content");
        std::thread::sleep(std::time::Duration::from_millis(5));

        let (dup, chunks) = make_entry("mem_2", "same content", MemoryType::Note);
        match db.insert_or_touch(&dup, &chunks).unwrap() {
            InsertOutcome::Existing(existing) => {
                assert_eq!(existing.id, "mem_1");
                assert!(existing.updated_at > original.updated_at);
                assert_eq!(existing.created_at, original.created_at);
            }
            InsertOutcome::Inserted => panic!("duplicate content was inserted"),
        }
        assert!(db.get("mem_2").unwrap().is_none());
        assert_eq!(db.summary().unwrap().total_entries, 1);
    }

    #[test]
    fn test_set_embedding_model() {
        let db = create_test_db();
        insert(&db, "mem_1", "model tracking");
        db.set_embedding_model("mem_1", "mistral").unwrap();
        let entry = db.get("mem_1").unwrap().unwrap();
        assert_eq!(entry.embedding_model.as_deref(), Some("mistral"));
        assert_eq!(db.summary().unwrap().embedding_models.get("mistral"), Some(&1));
    }

    #[test]
    fn test_touch_by_hash_missing() {
        let db = create_test_db();
        assert!(db.touch_by_hash("deadbeef").unwrap().is_none());
    }

    #[test]
    fn test_chunks_are_ordered() {
        let db = create_test_db();
        let content = "word ".repeat(100);
        insert(&db, "mem_long", &content);

        let chunks = db.chunks("mem_long").unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
            assert_eq!(chunk.chunk_id, format!("mem_long_chunk{i}"));
        }
    }

    #[test]
    fn test_list_newest_first_with_type_filter() {
        let db = create_test_db();
        insert(&db, "mem_a", "first");
        std::thread::sleep(std::time::Duration::from_millis(2));
        insert(&db, "mem_b", "second");
        let (obs, chunks) = make_entry("mem_c", "observed", MemoryType::Observation);
        db.insert_or_touch(&obs, &chunks).unwrap();

        let notes = db.list(10, Some(MemoryType::Note)).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "mem_b");
        assert_eq!(notes[1].id, "mem_a");

        assert_eq!(db.list(10, None).unwrap().len(), 3);
        assert_eq!(db.list(1, None).unwrap().len(), 1);
    }

    #[test]
    fn test_list_invalid_limit() {
        let db = create_test_db();
        assert!(matches!(db.list(0, None), Err(StorageError::InvalidLimit(_))));
        assert!(matches!(
            db.list(MAX_QUERY_LIMIT + 1, None),
            Err(StorageError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_delete_returns_chunk_ids() {
        let db = create_test_db();
        insert(&db, "mem_del", &"chunky text ".repeat(30));

        let removed = db.delete("mem_del").unwrap().unwrap();
        assert!(removed.len() > 1);
        assert_eq!(removed[0], "mem_del_chunk0");
        assert!(db.get("mem_del").unwrap().is_none());
        assert!(db.chunks("mem_del").unwrap().is_empty());
    }

    #[test]
    fn test_delete_queues_vector_removal() {
        let db = create_test_db();
        insert(&db, "mem_q", &"queued text ".repeat(30));
        insert(&db, "mem_keep", "kept");

        let mut removed = db.delete("mem_q").unwrap().unwrap();
        removed.sort();
        assert_eq!(db.pending_vector_deletes().unwrap(), removed);

        db.clear_vector_deletes(&removed[..1]).unwrap();
        assert_eq!(db.pending_vector_deletes().unwrap(), removed[1..].to_vec());
        db.clear_vector_deletes(&removed).unwrap();
        assert!(db.pending_vector_deletes().unwrap().is_empty());

        assert!(db.delete("does-not-exist").unwrap().is_none());
        assert!(db.pending_vector_deletes().unwrap().is_empty());
    }

    #[test]
    fn test_delete_nonexistent() {
        let db = create_test_db();
        assert!(db.delete("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn test_summary_counts() {
        let db = create_test_db();
        insert(&db, "mem_1", "one");
        let (obs, chunks) = make_entry("mem_2", "two", MemoryType::Observation);
        db.insert_or_touch(&obs, &chunks).unwrap();

        let summary = db.summary().unwrap();
        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_chunks, 2);
        assert_eq!(summary.entries_by_type.get("note"), Some(&1));
        assert_eq!(summary.entries_by_type.get("observation"), Some(&1));
        assert_eq!(summary.embedding_models.get("test-model"), Some(&2));
        assert!(summary.oldest.unwrap() <= summary.newest.unwrap());
        assert!(db.storage_size() > 0);
    }

    #[test]
    fn test_empty_summary() {
        let db = create_test_db();
        let summary = db.summary().unwrap();
        assert_eq!(summary.total_entries, 0);
        assert!(summary.oldest.is_none());
    }

    #[test]
    fn test_database_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        {
            let db = Database::open(&path).unwrap();
            insert(&db, "mem_p", "persistent");
        }

        {
            let db = Database::open(&path).unwrap();
            let entry = db.get("mem_p").unwrap().unwrap();
            assert_eq!(entry.content, "persistent");
        }
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(100_000).is_err());
        assert!(validate_limit(10).is_ok());
    }
}
