//! Environment variable overrides for configuration.

use crate::errors::Error;

use super::env_parser::{apply_number, apply_path, apply_string};
use super::Config;

/// Every environment variable read by `apply_env_overrides`.
pub const ENV_VARS: &[&str] = &[
    "MNEMO_DATABASE_PATH",
    "MNEMO_VECTOR_INDEX",
    "MNEMO_VECTOR_COLLECTION",
    "MNEMO_EMBEDDING_URL",
    "MNEMO_EMBEDDING_MODEL",
    "MNEMO_FALLBACK_MODEL",
    "MNEMO_EMBEDDING_DIMENSION",
    "MNEMO_CHUNK_SIZE",
    "MNEMO_CHUNK_OVERLAP",
    "MNEMO_CACHE_SIZE",
    "MNEMO_RRF_K",
    "MNEMO_CANDIDATE_LIMIT",
    "MNEMO_EMBEDDING_TIMEOUT_MS",
    "MNEMO_VECTOR_TIMEOUT_MS",
    "MNEMO_VECTOR_RETRY_SECS",
];

/// Apply environment variable overrides to configuration.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), Error> {
    apply_path("MNEMO_DATABASE_PATH", &mut config.database_path)?;
    apply_string("MNEMO_VECTOR_INDEX", &mut config.vector_index)?;
    apply_string("MNEMO_VECTOR_COLLECTION", &mut config.vector_collection)?;
    apply_string("MNEMO_EMBEDDING_URL", &mut config.embedding_url)?;
    apply_string("MNEMO_EMBEDDING_MODEL", &mut config.embedding_model)?;
    apply_string("MNEMO_FALLBACK_MODEL", &mut config.fallback_model)?;
    apply_number("MNEMO_EMBEDDING_DIMENSION", &mut config.embedding_dimension)?;
    apply_number("MNEMO_CHUNK_SIZE", &mut config.chunk_size)?;
    apply_number("MNEMO_CHUNK_OVERLAP", &mut config.chunk_overlap)?;
    apply_number("MNEMO_CACHE_SIZE", &mut config.cache_size)?;
    apply_number("MNEMO_RRF_K", &mut config.rrf_k)?;
    apply_number("MNEMO_CANDIDATE_LIMIT", &mut config.candidate_limit)?;
    apply_number("MNEMO_EMBEDDING_TIMEOUT_MS", &mut config.embedding_timeout_ms)?;
    apply_number("MNEMO_VECTOR_TIMEOUT_MS", &mut config.vector_timeout_ms)?;
    apply_number("MNEMO_VECTOR_RETRY_SECS", &mut config.vector_retry_secs)?;
    Ok(())
}
