//! Embedding generation: LRU cache, provider with fallback, and the HTTP
//! backend for the model service.

pub mod cache;
pub mod ollama;
pub mod provider;

use thiserror::Error;

pub use cache::{EmbeddingCache, DEFAULT_CACHE_SIZE};
pub use ollama::OllamaBackend;
pub use provider::{EmbeddingBackend, EmbeddingProvider, ProviderMode};

/// Embedding failures. Never fatal to `store`; a failed chunk stays
/// lexically searchable.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("cannot embed an empty batch")]
    EmptyBatch,

    #[error("embedding request for model '{model}' failed: {message}")]
    Transport { model: String, message: String },

    #[error("embedding service returned status {status} for model '{model}'")]
    Status { model: String, status: u16 },

    #[error("invalid embedding response for model '{model}': {message}")]
    InvalidResponse { model: String, message: String },

    #[error("primary model failed ({primary}); fallback model failed ({fallback})")]
    FallbackFailed { primary: String, fallback: String },

    #[error("all {0} embeddings in batch failed")]
    BatchFailed(usize),
}
