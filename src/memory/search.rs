//! Hybrid recall: lexical and semantic lookups fused with RRF.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::errors::Error;
use crate::memory_types::{MemoryEntry, MemoryType, RecallResult, RecallSource};
use crate::rrf::{self, RrfConfig};

use super::store::MemoryEngine;

/// Vector hits fetched per wanted entry; hits are per chunk.
const SEMANTIC_FANOUT: usize = 4;

impl MemoryEngine {
    /// Recall the `k` most relevant entries for `query`.
    ///
    /// Lexical and semantic lookups run concurrently. Index failures never
    /// surface: a failed lookup contributes no candidates, and if both fail
    /// the result is empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::Query` for an empty or oversized query, or `k`
    /// outside `1..=50`.
    pub fn recall(
        &self,
        query: &str,
        k: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<RecallResult>, Error> {
        Self::validate_input("query", query)?;
        Self::validate_k(k)?;
        let started = Instant::now();

        let limit = self.config.candidate_limit.max(k);
        let (lexical, semantic) = std::thread::scope(|scope| {
            let semantic = scope.spawn(|| self.semantic_candidates(query, limit, memory_type));
            let lexical = self.lexical_candidates(query, limit, memory_type);
            let semantic = semantic.join().unwrap_or_else(|_| {
                warn!("semantic lookup panicked");
                Vec::new()
            });
            (lexical, semantic)
        });

        let (lexical_hits, semantic_hits) = (lexical.len(), semantic.len());
        let mut results = rrf::fuse(lexical, semantic, RrfConfig { k: self.config.rrf_k });
        results.truncate(k);

        info!(
            results = results.len(),
            lexical = lexical_hits,
            semantic = semantic_hits,
            hybrid = results.iter().filter(|r| r.source == RecallSource::Hybrid).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recall"
        );
        Ok(results)
    }

    fn lexical_candidates(
        &self,
        query: &str,
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Vec<(MemoryEntry, f64)> {
        self.db
            .search_lexical(query, limit, memory_type)
            .unwrap_or_else(|e| {
                warn!(error = %e, "lexical search failed");
                Vec::new()
            })
    }

    fn semantic_candidates(
        &self,
        query: &str,
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Vec<(MemoryEntry, f64)> {
        // Degraded: no embedding work, lexical only.
        if !self.vectors.available() {
            return Vec::new();
        }

        let vector = match self.embedder.embed(query) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "failed to embed query, using lexical results only");
                return Vec::new();
            }
        };

        let hits = self
            .vectors
            .search(&vector, limit * SEMANTIC_FANOUT, memory_type);

        let mut candidates: Vec<(MemoryEntry, f64)> = Vec::with_capacity(limit);
        for hit in hits {
            if candidates.iter().any(|(entry, _)| entry.id == hit.parent_id) {
                continue;
            }
            match self.db.get(&hit.parent_id) {
                Ok(Some(entry)) => {
                    if memory_type.is_some_and(|t| t != entry.memory_type) {
                        continue;
                    }
                    candidates.push((entry, hit.score));
                }
                Ok(None) => debug!(chunk_id = %hit.chunk_id, "vector without entry, skipping"),
                Err(e) => warn!(parent_id = %hit.parent_id, error = %e, "failed to load entry for vector hit"),
            }
            if candidates.len() == limit {
                break;
            }
        }
        candidates
    }
}
