//! Memory engine data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open key/value metadata attached to an entry.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Kind of knowledge a memory entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    #[default]
    Note,
    Conversation,
    Observation,
    Thought,
    Decision,
    Learning,
}

impl MemoryType {
    pub const ALL: [MemoryType; 6] = [
        MemoryType::Note,
        MemoryType::Conversation,
        MemoryType::Observation,
        MemoryType::Thought,
        MemoryType::Decision,
        MemoryType::Learning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Note => "note",
            MemoryType::Conversation => "conversation",
            MemoryType::Observation => "observation",
            MemoryType::Thought => "thought",
            MemoryType::Decision => "decision",
            MemoryType::Learning => "learning",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        MemoryType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| format!("unknown memory type: {s}"))
    }
}

/// A stored unit of knowledge.
///
/// `content_hash` is unique across all entries; re-storing identical content
/// refreshes `updated_at` on the existing entry instead of creating a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    pub content_hash: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub memory_type: MemoryType,
    /// Primary embedding model at ingestion time, for migration tracking.
    pub embedding_model: Option<String>,
}

/// A sub-unit of an entry, indexed lexically and (when possible) semantically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub parent_id: String,
    pub index: usize,
    pub total_chunks: usize,
    /// Chunk text, including the prefix copied from the previous chunk.
    pub text: String,
    /// Number of leading characters of `text` copied from the previous chunk.
    pub overlap: usize,
}

impl Chunk {
    /// Derive a chunk id from its parent and position.
    pub fn chunk_id(parent_id: &str, index: usize) -> String {
        format!("{parent_id}_chunk{index}")
    }
}

/// Which index a recall result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecallSource {
    Lexical,
    Semantic,
    Hybrid,
}

impl fmt::Display for RecallSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecallSource::Lexical => "lexical",
            RecallSource::Semantic => "semantic",
            RecallSource::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// A ranked recall hit. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    pub entry: MemoryEntry,
    /// Non-negative relevance score, higher is better.
    pub score: f64,
    pub source: RecallSource,
}

/// Embedding cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Aggregate statistics about the memory store.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub total_entries: usize,
    pub total_chunks: usize,
    pub entries_by_type: BTreeMap<String, usize>,
    pub embedding_models: BTreeMap<String, usize>,
    /// Size of the entry database file in bytes.
    pub storage_size: u64,
    pub oldest_memory: Option<DateTime<Utc>>,
    pub newest_memory: Option<DateTime<Utc>>,
    pub vector_index_available: bool,
    pub embedding_mode: String,
    pub cache: CacheStats,
}
