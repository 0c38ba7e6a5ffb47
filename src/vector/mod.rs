//! Optional nearest-neighbour index over chunk vectors.
//!
//! Two backends implement [`VectorIndex`]: a local SQLite file scanned by
//! cosine similarity, and a Qdrant collection over REST. The engine never
//! talks to a backend directly; it goes through [`VectorIndexHandle`], which
//! turns backend outages into degraded mode.

pub mod handle;
pub mod qdrant;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory_types::MemoryType;

pub use handle::VectorIndexHandle;
pub use qdrant::QdrantVectorIndex;
pub use sqlite::SqliteVectorIndex;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("vector index unreachable: {0}")]
    Unreachable(String),

    #[error("vector index request failed: {0}")]
    Request(String),

    #[error("vector index rejected the request: {0}")]
    Rejected(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    MismatchedDimensions { expected: usize, actual: usize },

    #[error("Invalid vector blob: expected {expected} bytes, got {actual}")]
    InvalidBlobSize { expected: usize, actual: usize },

    #[error("Invalid vector: {0}")]
    InvalidVector(String),
}

impl VectorError {
    /// Whether the backend itself is unusable, as opposed to one bad input.
    ///
    /// Only these errors put the handle into degraded mode; the rest are
    /// logged and the offending item skipped.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Request(_) | Self::Sqlite(_))
    }
}

pub type Result<T> = std::result::Result<T, VectorError>;

/// Data stored alongside each chunk vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    pub chunk_id: String,
    pub parent_id: String,
    pub memory_type: MemoryType,
}

/// A chunk returned by similarity search, higher score is closer.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub chunk_id: String,
    pub parent_id: String,
    pub score: f64,
}

/// A backend that stores one vector per chunk id.
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs and stats.
    fn name(&self) -> &'static str;

    /// Verify the backend is reachable, creating its collection if needed.
    fn ensure_ready(&self) -> Result<()>;

    /// Insert or replace the vector for `payload.chunk_id`. Vectors of the
    /// wrong width or with non-finite values are rejected.
    fn upsert(&self, payload: &VectorPayload, vector: &[f32]) -> Result<()>;

    /// Closest chunks to `vector`, best first. A query whose width differs
    /// from the index yields no hits.
    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<VectorHit>>;

    /// Remove vectors by chunk id. Unknown ids are ignored.
    fn delete(&self, chunk_ids: &[String]) -> Result<()>;
}
