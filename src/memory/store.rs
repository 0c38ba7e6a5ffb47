//! Core engine struct and its construction.

use std::path::Component;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::config::{Config, VectorTarget};
use crate::embedding::{EmbeddingProvider, OllamaBackend};
use crate::errors::Error;
use crate::sqlite::Database;
use crate::vector::{QdrantVectorIndex, SqliteVectorIndex, VectorIndex, VectorIndexHandle};

/// Maximum allowed content or query length, in characters.
pub const MAX_INPUT_LENGTH: usize = 100_000;
/// Maximum number of results a single recall may request.
pub const MAX_RECALL_K: usize = 50;

/// Hybrid memory engine.
///
/// All operations take `&self`; the engine can be shared across threads and
/// `store`/`recall` may run concurrently. Writes to the persistent store are
/// serialized inside [`Database`].
pub struct MemoryEngine {
    pub(crate) db: Database,
    pub(crate) embedder: EmbeddingProvider,
    pub(crate) vectors: VectorIndexHandle,
    pub(crate) config: Config,
}

impl MemoryEngine {
    /// Open the engine described by `config`.
    ///
    /// The vector index is connected here; if it is unreachable the engine
    /// starts in degraded (lexical-only) mode instead of failing.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The configuration is invalid
    /// - Database path contains path traversal sequences (e.g., "../")
    /// - Directories cannot be created or the database cannot be opened
    pub fn open(config: Config) -> Result<Self, Error> {
        config.validate()?;

        // Path traversal guard: reject parent directory components (works on all platforms)
        if config
            .database_path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(Error::Config(
                "Invalid database path: contains '..' which may escape the intended directory"
                    .to_string(),
            ));
        }

        config.ensure_directories()?;
        let db = Database::open(&config.database_path)?;

        let backend = OllamaBackend::new(
            &config.embedding_url,
            Duration::from_millis(config.embedding_timeout_ms),
        )?;
        let embedder = EmbeddingProvider::new(
            Box::new(backend),
            config.embedding_model.clone(),
            config.fallback_model.clone(),
            config.embedding_dimension,
            config.cache_size,
        );

        let vectors = Self::connect_vectors(&config)?;

        info!(
            database = %config.database_path.display(),
            vector_backend = vectors.backend_name().unwrap_or("none"),
            degraded = !vectors.available(),
            "memory engine opened"
        );

        Ok(Self::with_components(db, embedder, vectors, config))
    }

    /// Assemble an engine from already-built parts.
    pub fn with_components(
        db: Database,
        embedder: EmbeddingProvider,
        vectors: VectorIndexHandle,
        config: Config,
    ) -> Self {
        Self {
            db,
            embedder,
            vectors,
            config,
        }
    }

    fn connect_vectors(config: &Config) -> Result<VectorIndexHandle, Error> {
        let retry = Duration::from_secs(config.vector_retry_secs);

        match config.vector_target() {
            VectorTarget::Disabled => Ok(VectorIndexHandle::disabled()),
            VectorTarget::Qdrant(url) => {
                let index = QdrantVectorIndex::new(
                    &url,
                    &config.vector_collection,
                    config.embedding_dimension,
                    Duration::from_millis(config.vector_timeout_ms),
                )
                .map_err(|e| Error::IndexUnavailable(e.to_string()))?;
                Ok(VectorIndexHandle::from_index(Arc::new(index), retry))
            }
            VectorTarget::Sqlite(path) => {
                let dimension = config.embedding_dimension;
                Ok(VectorIndexHandle::connect(
                    Box::new(move || {
                        let index = SqliteVectorIndex::open(&path, dimension)?;
                        index.ensure_ready()?;
                        Ok(Arc::new(index) as Arc<dyn VectorIndex>)
                    }),
                    retry,
                ))
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether semantic search is currently active.
    pub fn vector_index_available(&self) -> bool {
        self.vectors.available()
    }

    /// Validate text input (rejects empty, whitespace-only and oversized input).
    pub(crate) fn validate_input(what: &str, text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::Query(format!("{what} cannot be empty")));
        }
        let length = text.chars().count();
        if length > MAX_INPUT_LENGTH {
            return Err(Error::Query(format!(
                "{what} too long: {length} characters (max {MAX_INPUT_LENGTH})"
            )));
        }
        Ok(())
    }

    pub(crate) fn validate_k(k: usize) -> Result<(), Error> {
        if k == 0 || k > MAX_RECALL_K {
            return Err(Error::Query(format!(
                "k must be between 1 and {MAX_RECALL_K}, got {k}"
            )));
        }
        Ok(())
    }
}

/// New entry id: `mem_` followed by 12 hex characters.
pub(crate) fn new_memory_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("mem_{}", &hex[..12])
}
