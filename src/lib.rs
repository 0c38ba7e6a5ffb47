//! mnemo - A hybrid memory retrieval engine.
//!
//! Stores text entries durably, indexes them lexically (SQLite FTS5) and
//! semantically (embedding vectors), and recalls them by fusing both rankings
//! with Reciprocal Rank Fusion. The persistent store is the only hard
//! dependency: when the embedding service or vector index is unavailable the
//! engine keeps working in lexical-only mode.
//! All operations are synchronous (no async/await required).
//!
//! # Example
//!
//! ```no_run
//! use mnemo::{Config, MemoryEngine, MemoryType, Metadata};
//!
//! let config = Config::load(None).expect("Failed to load config");
//! let engine = MemoryEngine::open(config).expect("Failed to open engine");
//!
//! let entry = engine
//!     .store("Neura is a local-first cognitive OS", Metadata::new(), MemoryType::Note)
//!     .expect("Failed to store");
//! println!("Stored {}", entry.id);
//!
//! for result in engine.recall("cognitive OS", 5, None).unwrap() {
//!     println!("{:.4} [{}] {}", result.score, result.source, result.entry.content);
//! }
//! ```
//!
//! # Concurrency
//!
//! Every `MemoryEngine` method takes `&self`. Share one engine across threads
//! (e.g. behind an `Arc`); writes to the persistent store are serialized
//! internally while recalls read through a separate connection.

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod memory;
pub mod memory_types;
pub mod rrf;
pub mod sqlite;
pub mod vector;

// Re-export public API
pub use config::Config;
pub use embedding::{EmbeddingBackend, EmbeddingError, EmbeddingProvider, OllamaBackend};
pub use errors::Error;
pub use memory::{MAX_INPUT_LENGTH, MAX_RECALL_K, MemoryEngine};
pub use memory_types::{
    CacheStats, Chunk, MemoryEntry, MemoryStats, MemoryType, Metadata, RecallResult, RecallSource,
};
pub use sqlite::Database;
pub use vector::{QdrantVectorIndex, SqliteVectorIndex, VectorIndex, VectorIndexHandle};
