//! Cached embedding provider with a one-way primary to fallback transition.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::cache::EmbeddingCache;
use super::EmbeddingError;
use crate::memory_types::CacheStats;

/// Transport to an embedding model service.
///
/// Implementations must bound every call with a timeout and report a timeout
/// as an error like any other failure.
pub trait EmbeddingBackend: Send + Sync {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Which model the provider is currently calling.
///
/// The only allowed transition is `Primary -> Fallback`; it never reverts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Primary,
    Fallback,
}

impl ProviderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderMode::Primary => "primary",
            ProviderMode::Fallback => "fallback",
        }
    }
}

/// Turns text into vectors, consulting the cache first.
pub struct EmbeddingProvider {
    backend: Box<dyn EmbeddingBackend>,
    primary_model: String,
    fallback_model: String,
    dimension: usize,
    mode: Mutex<ProviderMode>,
    cache: Mutex<EmbeddingCache>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EmbeddingProvider {
    pub fn new(
        backend: Box<dyn EmbeddingBackend>,
        primary_model: impl Into<String>,
        fallback_model: impl Into<String>,
        dimension: usize,
        cache_size: usize,
    ) -> Self {
        let provider = Self {
            backend,
            primary_model: primary_model.into(),
            fallback_model: fallback_model.into(),
            dimension,
            mode: Mutex::new(ProviderMode::Primary),
            cache: Mutex::new(EmbeddingCache::new(cache_size)),
        };
        info!(
            model = %provider.primary_model,
            fallback = %provider.fallback_model,
            dim = dimension,
            "embedding provider initialized"
        );
        provider
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError::EmptyInput` for empty or whitespace-only text
    /// without touching the network, or `EmbeddingError::FallbackFailed` when
    /// both models fail.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        if self.mode() == ProviderMode::Fallback {
            return self.embed_with(&self.fallback_model, text);
        }

        match self.embed_with(&self.primary_model, text) {
            Ok(vector) => Ok(vector),
            Err(primary_err) => {
                warn!(model = %self.primary_model, error = %primary_err, "primary embedding failed, trying fallback");
                match self.embed_with(&self.fallback_model, text) {
                    Ok(vector) => {
                        self.enter_fallback();
                        Ok(vector)
                    }
                    Err(fallback_err) => Err(EmbeddingError::FallbackFailed {
                        primary: primary_err.to_string(),
                        fallback: fallback_err.to_string(),
                    }),
                }
            }
        }
    }

    /// Embed several texts; individual failures become `None`.
    ///
    /// # Errors
    ///
    /// Fails only when the batch is empty or every item failed.
    pub fn batch_embed(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, EmbeddingError> {
        if texts.is_empty() {
            return Err(EmbeddingError::EmptyBatch);
        }

        let vectors: Vec<Option<Vec<f32>>> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| match self.embed(text) {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!(index = i, error = %e, "failed to embed batch item");
                    None
                }
            })
            .collect();

        let succeeded = vectors.iter().filter(|v| v.is_some()).count();
        if succeeded == 0 {
            return Err(EmbeddingError::BatchFailed(texts.len()));
        }

        info!(succeeded, total = texts.len(), "batch embed finished");
        Ok(vectors)
    }

    /// Whether the primary model answers a tiny request.
    ///
    /// Goes straight to the backend: the result is not cached and a failure
    /// does not switch the provider to its fallback.
    pub fn check_availability(&self) -> bool {
        self.backend.embed(&self.primary_model, "availability check").is_ok()
    }

    pub fn mode(&self) -> ProviderMode {
        *lock(&self.mode)
    }

    pub fn is_degraded(&self) -> bool {
        self.mode() == ProviderMode::Fallback
    }

    /// Model currently producing vectors.
    pub fn active_model(&self) -> &str {
        match self.mode() {
            ProviderMode::Primary => &self.primary_model,
            ProviderMode::Fallback => &self.fallback_model,
        }
    }

    pub fn primary_model(&self) -> &str {
        &self.primary_model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }

    fn embed_with(&self, model: &str, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(vector) = lock(&self.cache).get(model, text) {
            debug!(model, "embedding cache hit");
            return Ok(vector);
        }

        let vector = self.backend.embed(model, text)?;
        if vector.is_empty() {
            return Err(EmbeddingError::InvalidResponse {
                model: model.to_string(),
                message: "empty embedding returned".to_string(),
            });
        }
        if vector.len() != self.dimension {
            warn!(
                model,
                expected = self.dimension,
                actual = vector.len(),
                "unexpected embedding dimension"
            );
        }

        lock(&self.cache).put(model, text, vector.clone());
        Ok(vector)
    }

    fn enter_fallback(&self) {
        let mut mode = lock(&self.mode);
        if *mode == ProviderMode::Primary {
            *mode = ProviderMode::Fallback;
            warn!(
                primary = %self.primary_model,
                fallback = %self.fallback_model,
                "embedding provider switched to fallback model"
            );
        }
    }
}
