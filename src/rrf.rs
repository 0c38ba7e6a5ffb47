//! Reciprocal Rank Fusion (RRF) for hybrid recall
//!
//! Merges the lexical and semantic rankings without score normalization.
//! Formula: score = Σ 1 / (rank + k) over each list, rank starting at 0.
//!
//! Entries appearing in both rankings get boosted scores.

use std::collections::HashMap;

use crate::memory_types::{MemoryEntry, RecallResult, RecallSource};

/// Default k constant for the RRF formula.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// RRF fusion configuration
#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    /// Dampens the contribution of top ranks. Must be positive.
    pub k: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

struct Fused {
    entry: MemoryEntry,
    score: f64,
    in_lexical: bool,
    in_semantic: bool,
}

/// Fuse a lexical and a semantic ranking into one recall list.
///
/// Both inputs must be sorted best first and contain each entry at most
/// once; their scores are ignored except on the pass-through path.
///
/// Output is sorted by fused score descending. Ties go to the most recently
/// updated entry, then to the smaller id, so the order is deterministic.
///
/// When `semantic` is empty the lexical list is returned unchanged, with its
/// original scores and `source=lexical`, instead of a single-list RRF.
///
/// # Example
///
/// ```ignore
/// // lexical [A, B, C], semantic [B, C, A], k = 60
/// let fused = fuse(lexical, semantic, RrfConfig::default());
/// // B (0.033060) > A (0.032796) > C (0.032522)
/// ```
pub fn fuse(
    lexical: Vec<(MemoryEntry, f64)>,
    semantic: Vec<(MemoryEntry, f64)>,
    config: RrfConfig,
) -> Vec<RecallResult> {
    if semantic.is_empty() {
        return lexical
            .into_iter()
            .map(|(entry, score)| RecallResult {
                entry,
                score,
                source: RecallSource::Lexical,
            })
            .collect();
    }

    let mut fused: HashMap<String, Fused> = HashMap::new();

    for (rank, (entry, _)) in lexical.into_iter().enumerate() {
        let contribution = 1.0 / (rank as f64 + config.k);
        let slot = fused.entry(entry.id.clone()).or_insert_with(|| Fused {
            entry,
            score: 0.0,
            in_lexical: false,
            in_semantic: false,
        });
        slot.score += contribution;
        slot.in_lexical = true;
    }

    for (rank, (entry, _)) in semantic.into_iter().enumerate() {
        let contribution = 1.0 / (rank as f64 + config.k);
        let slot = fused.entry(entry.id.clone()).or_insert_with(|| Fused {
            entry,
            score: 0.0,
            in_lexical: false,
            in_semantic: false,
        });
        slot.score += contribution;
        slot.in_semantic = true;
    }

    let mut results: Vec<RecallResult> = fused
        .into_values()
        .map(|f| RecallResult {
            source: match (f.in_lexical, f.in_semantic) {
                (true, true) => RecallSource::Hybrid,
                (false, true) => RecallSource::Semantic,
                _ => RecallSource::Lexical,
            },
            entry: f.entry,
            score: f.score,
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.entry.updated_at.cmp(&a.entry.updated_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });

    results
}
