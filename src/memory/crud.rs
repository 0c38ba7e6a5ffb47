//! Store, lookup, delete and stats operations.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::chunker;
use crate::errors::Error;
use crate::memory_types::{Chunk, MemoryEntry, MemoryStats, MemoryType, Metadata};
use crate::sqlite::{self, InsertOutcome};
use crate::vector::VectorPayload;

use super::store::{MemoryEngine, new_memory_id};

impl MemoryEngine {
    /// Store text, deduplicating by content hash.
    ///
    /// Identical content returns the existing entry with a refreshed
    /// `updated_at` and does no embedding work. New content is chunked,
    /// written to the persistent store and lexical index in one
    /// transaction, then embedded chunk by chunk into the vector index.
    ///
    /// # Errors
    ///
    /// Returns `Error::Query` for empty or oversized content and
    /// `Error::Storage` if the persistent store fails. Embedding and vector
    /// index failures are logged and never returned.
    pub fn store(
        &self,
        content: &str,
        metadata: Metadata,
        memory_type: MemoryType,
    ) -> Result<MemoryEntry, Error> {
        Self::validate_input("content", content)?;
        let started = Instant::now();

        let content_hash = chunker::identify(content);
        if let Some(existing) = self.db.touch_by_hash(&content_hash)? {
            info!(id = %existing.id, "content already stored, refreshed timestamp");
            return Ok(existing);
        }

        let id = new_memory_id();
        let pieces =
            chunker::chunk_with_overlap(content, self.config.chunk_size, self.config.chunk_overlap);
        let total_chunks = pieces.len();
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(index, piece)| Chunk {
                chunk_id: Chunk::chunk_id(&id, index),
                parent_id: id.clone(),
                index,
                total_chunks,
                text: piece.text,
                overlap: piece.overlap,
            })
            .collect();

        let now = sqlite::now();
        let mut entry = MemoryEntry {
            id,
            content: content.to_string(),
            content_hash,
            metadata,
            created_at: now,
            updated_at: now,
            memory_type,
            embedding_model: None,
        };

        if let InsertOutcome::Existing(existing) = self.db.insert_or_touch(&entry, &chunks)? {
            // Lost a race with a concurrent store of the same content.
            info!(id = %existing.id, "content already stored, refreshed timestamp");
            return Ok(existing);
        }

        let vectors = self.index_chunks(&entry, &chunks);

        // Read after embedding: the provider may have switched to its fallback.
        if vectors > 0 {
            let model = self.embedder.active_model();
            self.db.set_embedding_model(&entry.id, model)?;
            entry.embedding_model = Some(model.to_string());
        }

        info!(
            id = %entry.id,
            chunks = total_chunks,
            vectors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stored memory"
        );
        Ok(entry)
    }

    /// Embed chunks and upsert their vectors. Returns how many were written.
    fn index_chunks(&self, entry: &MemoryEntry, chunks: &[Chunk]) -> usize {
        if !self.vectors.maybe_reconnect() {
            debug!(id = %entry.id, "vector index unavailable, stored lexical-only");
            return 0;
        }
        self.flush_vector_deletes();

        let mut written = 0;
        for chunk in chunks {
            let vector = match self.embedder.embed(&chunk.text) {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(chunk_id = %chunk.chunk_id, error = %e, "failed to embed chunk, keeping it lexical-only");
                    continue;
                }
            };

            let payload = VectorPayload {
                chunk_id: chunk.chunk_id.clone(),
                parent_id: entry.id.clone(),
                memory_type: entry.memory_type,
            };
            if self.vectors.upsert(&payload, &vector) {
                written += 1;
            } else {
                warn!(chunk_id = %chunk.chunk_id, "vector upsert skipped, keeping chunk lexical-only");
            }
        }
        written
    }

    /// Retrieve a single entry by ID.
    pub fn get_by_id(&self, id: &str) -> Result<Option<MemoryEntry>, Error> {
        Ok(self.db.get(id)?)
    }

    /// Chunks of an entry, in order.
    pub fn chunks(&self, id: &str) -> Result<Vec<Chunk>, Error> {
        Ok(self.db.chunks(id)?)
    }

    /// Delete an entry from the persistent store and both indexes.
    ///
    /// Returns `false` if no entry had this id. If the vector index is
    /// unavailable, the chunk ids stay queued and their vectors are removed
    /// once a later `store` or `stats` reconnects.
    pub fn delete(&self, id: &str) -> Result<bool, Error> {
        let Some(chunk_ids) = self.db.delete(id)? else {
            return Ok(false);
        };

        let vectors_removed = self.flush_vector_deletes();

        info!(id, chunks = chunk_ids.len(), vectors_removed, "deleted memory");
        Ok(true)
    }

    /// Remove queued vectors of deleted entries. Returns how many were removed.
    fn flush_vector_deletes(&self) -> usize {
        if !self.vectors.available() {
            return 0;
        }
        let pending = match self.db.pending_vector_deletes() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "failed to read queued vector deletes");
                return 0;
            }
        };
        if pending.is_empty() || !self.vectors.delete(&pending) {
            return 0;
        }
        if let Err(e) = self.db.clear_vector_deletes(&pending) {
            warn!(error = %e, "failed to clear queued vector deletes");
        }
        debug!(chunks = pending.len(), "removed vectors of deleted memories");
        pending.len()
    }

    /// List entries newest first.
    pub fn list(
        &self,
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<MemoryEntry>, Error> {
        Ok(self.db.list(limit, memory_type)?)
    }

    /// Aggregate statistics about the store, indexes and embedding cache.
    pub fn stats(&self) -> Result<MemoryStats, Error> {
        let vector_index_available = self.vectors.maybe_reconnect();
        if vector_index_available {
            self.flush_vector_deletes();
        }
        let summary = self.db.summary()?;

        Ok(MemoryStats {
            total_entries: summary.total_entries,
            total_chunks: summary.total_chunks,
            entries_by_type: summary.entries_by_type,
            embedding_models: summary.embedding_models,
            storage_size: self.db.storage_size(),
            oldest_memory: summary.oldest,
            newest_memory: summary.newest,
            vector_index_available,
            embedding_mode: self.embedder.mode().as_str().to_string(),
            cache: self.embedder.cache_stats(),
        })
    }
}
