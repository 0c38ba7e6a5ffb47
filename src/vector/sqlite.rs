//! Local vector index: a separate SQLite file with brute-force cosine search.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::{Result, VectorError, VectorHit, VectorIndex, VectorPayload};
use crate::memory_types::MemoryType;

/// Convert a vector of f32 values to a BLOB (little-endian bytes).
///
/// # Errors
///
/// - Returns `VectorError::MismatchedDimensions` if the vector length is not `dims`.
/// - Returns `VectorError::InvalidVector` if any value is NaN or infinite.
pub fn vec_to_blob(vec: &[f32], dims: usize) -> Result<Vec<u8>> {
    if vec.len() != dims {
        return Err(VectorError::MismatchedDimensions {
            expected: dims,
            actual: vec.len(),
        });
    }
    if vec.iter().any(|x| !x.is_finite()) {
        return Err(VectorError::InvalidVector(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }
    Ok(vec.iter().flat_map(|&x| x.to_le_bytes()).collect())
}

/// Convert a BLOB (little-endian bytes) back to f32 values.
///
/// # Errors
///
/// Returns `VectorError::InvalidBlobSize` if the blob is not `dims * 4` bytes.
pub fn blob_to_vec(blob: &[u8], dims: usize) -> Result<Vec<f32>> {
    if blob.len() != dims * 4 {
        return Err(VectorError::InvalidBlobSize {
            expected: dims * 4,
            actual: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Compute cosine similarity between two vectors.
///
/// # Errors
///
/// - Returns `VectorError::InvalidVector` if either vector is empty or holds NaN/infinite values.
/// - Returns `VectorError::MismatchedDimensions` if vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(VectorError::InvalidVector("empty vector".to_string()));
    }

    if a.len() != b.len() {
        return Err(VectorError::MismatchedDimensions {
            expected: a.len(),
            actual: b.len(),
        });
    }

    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(VectorError::InvalidVector(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    dimension: usize,
}

impl SqliteVectorIndex {
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunk_vectors (
                chunk_id TEXT PRIMARY KEY,
                parent_id TEXT NOT NULL,
                memory_type TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunk_vectors_type ON chunk_vectors(memory_type);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            dimension,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_ready(&self) -> Result<()> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM chunk_vectors", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn upsert(&self, payload: &VectorPayload, vector: &[f32]) -> Result<()> {
        let blob = vec_to_blob(vector, self.dimension)?;
        self.conn().execute(
            r#"
            INSERT INTO chunk_vectors (chunk_id, parent_id, memory_type, embedding)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(chunk_id) DO UPDATE SET
                parent_id = excluded.parent_id,
                memory_type = excluded.memory_type,
                embedding = excluded.embedding
            "#,
            params![
                &payload.chunk_id,
                &payload.parent_id,
                payload.memory_type.as_str(),
                blob
            ],
        )?;
        Ok(())
    }

    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<VectorHit>> {
        if vector.len() != self.dimension {
            debug!(
                expected = self.dimension,
                actual = vector.len(),
                "query vector width differs from index, no semantic hits"
            );
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(
            r#"
            SELECT chunk_id, parent_id, embedding
            FROM chunk_vectors
            WHERE (?1 IS NULL OR memory_type = ?1)
            "#,
        )?;
        let rows = stmt.query_map(params![memory_type.map(|t| t.as_str())], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (chunk_id, parent_id, blob) = row?;
            let score = blob_to_vec(&blob, self.dimension)
                .and_then(|stored| cosine_similarity(vector, &stored));
            match score {
                Ok(score) => hits.push(VectorHit {
                    chunk_id,
                    parent_id,
                    score,
                }),
                Err(e) => warn!(chunk_id = %chunk_id, error = %e, "skipping unreadable stored vector"),
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        debug!(hits = hits.len(), "sqlite vector search");
        Ok(hits)
    }

    fn delete(&self, chunk_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM chunk_vectors WHERE chunk_id = ?1")?;
            for chunk_id in chunk_ids {
                stmt.execute([chunk_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_index(dims: usize) -> SqliteVectorIndex {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.db");
        let index = SqliteVectorIndex::open(&path, dims).unwrap();
        std::mem::forget(dir);
        index
    }

    fn payload(chunk_id: &str, parent_id: &str, memory_type: MemoryType) -> VectorPayload {
        VectorPayload {
            chunk_id: chunk_id.to_string(),
            parent_id: parent_id.to_string(),
            memory_type,
        }
    }

    #[test]
    fn test_blob_round_trip() {
        let vec = vec![0.1f32, -2.5, 3.0];
        let blob = vec_to_blob(&vec, 3).unwrap();
        assert_eq!(blob.len(), 12);
        assert_eq!(blob_to_vec(&blob, 3).unwrap(), vec);
    }

    #[test]
    fn test_blob_wrong_sizes() {
        assert!(matches!(
            vec_to_blob(&[1.0, 2.0], 3),
            Err(VectorError::MismatchedDimensions { .. })
        ));
        assert!(matches!(
            blob_to_vec(&[0u8; 10], 3),
            Err(VectorError::InvalidBlobSize { .. })
        ));
    }

    #[test]
    fn test_non_finite_vector_rejected() {
        assert!(matches!(
            vec_to_blob(&[1.0, f32::NAN, 0.0], 3),
            Err(VectorError::InvalidVector(_))
        ));
        let index = create_test_index(3);
        let result = index.upsert(&payload("a_chunk0", "a", MemoryType::Note), &[f32::INFINITY, 0.0, 0.0]);
        assert!(matches!(result, Err(VectorError::InvalidVector(_))));
        assert!(index.search(&[1.0, 0.0, 0.0], 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_search_skips_corrupt_rows() {
        let index = create_test_index(3);
        index.upsert(&payload("a_chunk0", "a", MemoryType::Note), &[1.0, 0.0, 0.0]).unwrap();
        {
            let conn = index.conn();
            let nan = [f32::NAN, 0.0, 0.0].iter().flat_map(|x| x.to_le_bytes()).collect::<Vec<u8>>();
            conn.execute(
                "INSERT INTO chunk_vectors (chunk_id, parent_id, memory_type, embedding) VALUES ('b_chunk0', 'b', 'note', ?1)",
                [nan],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO chunk_vectors (chunk_id, parent_id, memory_type, embedding) VALUES ('c_chunk0', 'c', 'note', ?1)",
                [vec![0u8; 5]],
            )
            .unwrap();
        }

        let hits = index.search(&[1.0, 0.0, 0.0], 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].parent_id, "a");
    }

    #[test]
    fn test_cosine_similarity() {
        let a = [1.0f32, 0.0, 0.0];
        let b = [0.0f32, 1.0, 0.0];
        assert!((cosine_similarity(&a, &a).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0; 3], &a).unwrap(), 0.0);
        assert!(cosine_similarity(&[], &a).is_err());
        assert!(cosine_similarity(&[f32::NAN, 0.0, 0.0], &a).is_err());
        assert!(cosine_similarity(&[1.0, 0.0], &a).is_err());
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = create_test_index(3);
        index.upsert(&payload("a_chunk0", "a", MemoryType::Note), &[1.0, 0.0, 0.0]).unwrap();
        index.upsert(&payload("b_chunk0", "b", MemoryType::Note), &[0.7, 0.7, 0.0]).unwrap();
        index.upsert(&payload("c_chunk0", "c", MemoryType::Note), &[0.0, 0.0, 1.0]).unwrap();

        let hits = index.search(&[1.0, 0.1, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].parent_id, "a");
        assert_eq!(hits[1].parent_id, "b");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_type_filter() {
        let index = create_test_index(2);
        index.upsert(&payload("a_chunk0", "a", MemoryType::Note), &[1.0, 0.0]).unwrap();
        index.upsert(&payload("b_chunk0", "b", MemoryType::Learning), &[1.0, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0], 10, Some(MemoryType::Learning)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "b_chunk0");
    }

    #[test]
    fn test_upsert_replaces_and_delete_removes() {
        let index = create_test_index(2);
        let p = payload("a_chunk0", "a", MemoryType::Note);
        index.upsert(&p, &[1.0, 0.0]).unwrap();
        index.upsert(&p, &[0.0, 1.0]).unwrap();

        let hits = index.search(&[0.0, 1.0], 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);

        index.delete(&["a_chunk0".to_string(), "missing".to_string()]).unwrap();
        assert!(index.search(&[0.0, 1.0], 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_query_dimension() {
        let index = create_test_index(4);
        assert!(index.ensure_ready().is_ok());
        index.upsert(&payload("a_chunk0", "a", MemoryType::Note), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(index.search(&[1.0, 0.0], 10, None).unwrap().is_empty());
        assert!(matches!(
            index.upsert(&payload("b_chunk0", "b", MemoryType::Note), &[1.0, 0.0]),
            Err(VectorError::MismatchedDimensions { .. })
        ));
        assert_eq!(index.search(&[1.0, 0.0, 0.0, 0.0], 10, None).unwrap().len(), 1);
    }
}
