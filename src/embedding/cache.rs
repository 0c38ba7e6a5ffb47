//! Bounded least-recently-used cache of embedding vectors.

use std::collections::{BTreeMap, HashMap};

use crate::memory_types::CacheStats;

/// Default maximum number of cached vectors.
pub const DEFAULT_CACHE_SIZE: usize = 1000;

type CacheKey = (String, String);

struct CacheSlot {
    vector: Vec<f32>,
    tick: u64,
}

/// Strict LRU cache keyed by `(model, normalized text)`.
///
/// Recency is tracked with a monotonically increasing tick; the smallest tick
/// is always the least recently used key.
pub struct EmbeddingCache {
    max_size: usize,
    entries: HashMap<CacheKey, CacheSlot>,
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl EmbeddingCache {
    /// Create a cache holding at most `max_size` vectors (minimum 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a vector, refreshing its recency on hit.
    pub fn get(&mut self, model: &str, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(model, text);
        let next = self.next_tick();

        match self.entries.get_mut(&key) {
            Some(slot) => {
                self.recency.remove(&slot.tick);
                slot.tick = next;
                self.recency.insert(next, key);
                self.hits += 1;
                Some(slot.vector.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or refresh a vector, evicting the least recently used entry
    /// only when the cache is full and the key is new.
    pub fn put(&mut self, model: &str, text: &str, vector: Vec<f32>) {
        let key = cache_key(model, text);
        let next = self.next_tick();

        if let Some(slot) = self.entries.get_mut(&key) {
            self.recency.remove(&slot.tick);
            slot.tick = next;
            slot.vector = vector;
            self.recency.insert(next, key);
            return;
        }

        if self.entries.len() >= self.max_size {
            if let Some((_, oldest)) = self.recency.pop_first() {
                self.entries.remove(&oldest);
                tracing::debug!(model = %oldest.0, "evicted embedding from cache");
            }
        }

        self.recency.insert(next, key.clone());
        self.entries.insert(
            key,
            CacheSlot {
                vector,
                tick: next,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups > 0 {
                self.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Surrounding whitespace does not change the cache identity of a text.
fn cache_key(model: &str, text: &str) -> CacheKey {
    (model.to_string(), text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let mut cache = EmbeddingCache::new(4);
        assert!(cache.get("m", "hello").is_none());
        cache.put("m", "hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("m", "hello"), Some(vec![1.0, 2.0]));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let mut cache = EmbeddingCache::new(2);
        cache.put("m", "X", vec![1.0]);
        cache.put("m", "Y", vec![2.0]);
        cache.put("m", "Z", vec![3.0]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("m", "X").is_none());
        assert!(cache.get("m", "Y").is_some());
        assert!(cache.get("m", "Z").is_some());
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = EmbeddingCache::new(2);
        cache.put("m", "X", vec![1.0]);
        cache.put("m", "Y", vec![2.0]);
        assert!(cache.get("m", "X").is_some());
        cache.put("m", "Z", vec![3.0]);

        assert!(cache.get("m", "Y").is_none());
        assert!(cache.get("m", "X").is_some());
    }

    #[test]
    fn test_put_existing_key_does_not_grow() {
        let mut cache = EmbeddingCache::new(2);
        cache.put("m", "X", vec![1.0]);
        cache.put("m", "Y", vec![2.0]);
        cache.put("m", "X", vec![9.0]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("m", "X"), Some(vec![9.0]));
        assert!(cache.get("m", "Y").is_some());
    }

    #[test]
    fn test_keys_are_scoped_by_model() {
        let mut cache = EmbeddingCache::new(4);
        cache.put("primary", "text", vec![1.0]);
        assert!(cache.get("fallback", "text").is_none());
        assert!(cache.get("primary", "  text  ").is_some());
    }

    #[test]
    fn test_size_never_exceeds_bound() {
        let mut cache = EmbeddingCache::new(3);
        for i in 0..50 {
            cache.put("m", &format!("text {i}"), vec![i as f32]);
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.stats().size, 3);
        assert_eq!(cache.stats().max_size, 3);
    }

    #[test]
    fn test_empty_stats() {
        let cache = EmbeddingCache::new(DEFAULT_CACHE_SIZE);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hit_rate, 0.0);
    }
}
