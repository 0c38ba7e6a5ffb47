//! Memory engine orchestrating chunking, embedding, both indexes and fusion.
//!
//! Provides a high-level API for storing, recalling, and retrieving memories.
//! The persistent store is the only hard dependency; embedding and the
//! vector index degrade to lexical-only operation when they fail.

mod crud;
mod search;

// pub(crate): module internals hidden; public items re-exported explicitly via lib.rs
pub(crate) mod store;

pub use store::{MAX_INPUT_LENGTH, MAX_RECALL_K, MemoryEngine};
