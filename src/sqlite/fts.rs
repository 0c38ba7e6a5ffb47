//! FTS5 lexical index over chunk text with BM25 ranking.
//!
//! Chunk rows are indexed by triggers, so indexing happens inside the same
//! transaction as the entry insert and removal inside the same transaction
//! as the delete.

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::{entry_from_row, validate_limit, Database, Result, StorageError, ENTRY_COLUMNS};
use crate::memory_types::{MemoryEntry, MemoryType};

/// Chunk hits fetched per requested entry, so several matching chunks of one
/// entry don't starve the result list.
const CHUNK_FANOUT: usize = 4;

/// Rebuild the FTS index if its document count drifted from the chunk table.
pub(super) fn repair_if_stale(conn: &mut Connection) -> Result<()> {
    let chunk_count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
    let indexed: i64 =
        conn.query_row("SELECT COUNT(*) FROM chunks_fts_docsize", [], |row| row.get(0))?;

    if chunk_count == indexed {
        return Ok(());
    }

    warn!(chunk_count, indexed, "lexical index out of sync, rebuilding");
    let tx = conn.transaction()?;
    tx.execute("INSERT INTO chunks_fts(chunks_fts) VALUES('rebuild')", [])?;

    let rebuilt: i64 =
        tx.query_row("SELECT COUNT(*) FROM chunks_fts_docsize", [], |row| row.get(0))?;
    if rebuilt != chunk_count {
        tx.rollback()?;
        return Err(StorageError::Integrity(format!(
            "FTS5 rebuild incomplete: expected {chunk_count} rows, got {rebuilt} rows"
        )));
    }
    tx.commit()?;
    Ok(())
}

/// Quote every whitespace-separated term and OR them together.
///
/// Quoting keeps FTS5 operators and punctuation in user input literal; OR
/// lets an entry match on any term, with BM25 favouring entries that match
/// more of them.
pub fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// BM25 rank (lower is better, usually negative) to a score in (0, 1].
pub fn rank_to_score(rank: f64) -> f64 {
    1.0 / (1.0 + rank.abs())
}

impl Database {
    /// Search entries by chunk text using FTS5 BM25 ranking.
    ///
    /// Returns at most `limit` distinct entries, best first, each scored by
    /// its best-matching chunk.
    ///
    /// # Errors
    ///
    /// Returns error if the limit is invalid or the FTS5 query fails.
    pub fn search_lexical(
        &self,
        query: &str,
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<(MemoryEntry, f64)>> {
        validate_limit(limit)?;

        let escaped_query = escape_fts_query(query);

        // Empty query returns no results (avoid FTS5 syntax error)
        if escaped_query.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS}, bm25(chunks_fts) AS bm25_score
            FROM chunks_fts
            JOIN chunks c ON c.rowid = chunks_fts.rowid
            JOIN memories m ON m.id = c.parent_id
            WHERE chunks_fts MATCH ?1 AND (?2 IS NULL OR m.memory_type = ?2)
            ORDER BY bm25_score
            LIMIT ?3
            "#
        );

        let conn = self.read_conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                escaped_query,
                memory_type.map(|t| t.as_str()),
                (limit * CHUNK_FANOUT) as i64
            ],
            |row| Ok((entry_from_row(row)?, row.get::<_, f64>(8)?)),
        )?;

        let mut results: Vec<(MemoryEntry, f64)> = Vec::with_capacity(limit);
        for row in rows {
            let (entry, rank) = row?;
            if results.iter().any(|(seen, _)| seen.id == entry.id) {
                continue;
            }
            results.push((entry, rank_to_score(rank)));
            if results.len() == limit {
                break;
            }
        }

        debug!(query, hits = results.len(), "lexical search");
        Ok(results)
    }
}
