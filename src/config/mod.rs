//! Configuration system for mnemo.

mod env_parser;
mod loader;
mod overrides;
mod paths;
mod validation;

#[cfg(test)]
mod tests_utils;
#[cfg(test)]
use tests_utils::ENV_MUTEX;

use crate::errors::Error;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use loader::ConfigFile;
pub use overrides::ENV_VARS;

/// Value of `vector_index` that forces lexical-only mode.
pub const VECTOR_INDEX_DISABLED: &str = "disabled";

/// Configuration values with priority: defaults < config file < env vars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Path to the SQLite database holding entries and the lexical index.
    pub database_path: PathBuf,

    /// Vector index target: a Qdrant URL, a SQLite path, or `disabled`.
    pub vector_index: String,

    /// Qdrant collection name.
    pub vector_collection: String,

    /// Base URL of the Ollama-compatible embedding service.
    pub embedding_url: String,

    pub embedding_model: String,
    pub fallback_model: String,
    pub embedding_dimension: usize,

    /// Chunk size and overlap, in characters.
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    /// Maximum cached embeddings.
    pub cache_size: usize,

    /// RRF k constant.
    pub rrf_k: f64,

    /// Candidates fetched from each index per recall.
    pub candidate_limit: usize,

    pub embedding_timeout_ms: u64,
    pub vector_timeout_ms: u64,

    /// Minimum seconds between reconnection attempts to a lost vector index.
    pub vector_retry_secs: u64,
}

/// Where chunk vectors live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorTarget {
    Disabled,
    Qdrant(String),
    Sqlite(PathBuf),
}

impl Default for Config {
    fn default() -> Self {
        // Use home directory with sensible fallback for systems without HOME
        let home = dirs::home_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        let mnemo_dir = home.join(".mnemo");

        Self {
            database_path: mnemo_dir.join("memory.db"),
            vector_index: mnemo_dir.join("vectors.db").display().to_string(),
            vector_collection: "memories".to_string(),
            embedding_url: "http://localhost:11434".to_string(),
            embedding_model: "mxbai-embed-large".to_string(),
            fallback_model: "mistral".to_string(),
            embedding_dimension: 1024,
            chunk_size: 500,
            chunk_overlap: 50,
            cache_size: crate::embedding::DEFAULT_CACHE_SIZE,
            rrf_k: crate::rrf::DEFAULT_RRF_K,
            candidate_limit: 20,
            embedding_timeout_ms: 30_000,
            vector_timeout_ms: 5_000,
            vector_retry_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration with defaults, file values, and environment overrides.
    ///
    /// `explicit` names a config file that must exist; without it the
    /// standard location is used if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Error> {
        let mut config = Config::default();

        if let Some(file) = loader::load_from_file(explicit)? {
            config.merge_from_file(file);
        }

        overrides::apply_env_overrides(&mut config)?;
        paths::expand_tilde(&mut config.database_path);

        config.validate()?;

        Ok(config)
    }

    /// Merge configuration from a file into this config.
    fn merge_from_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.database_path {
            self.database_path = v;
        }
        if let Some(v) = file.vector_index {
            self.vector_index = v;
        }
        if let Some(v) = file.vector_collection {
            self.vector_collection = v;
        }
        if let Some(v) = file.embedding_url {
            self.embedding_url = v;
        }
        if let Some(v) = file.embedding_model {
            self.embedding_model = v;
        }
        if let Some(v) = file.fallback_model {
            self.fallback_model = v;
        }
        if let Some(v) = file.embedding_dimension {
            self.embedding_dimension = v;
        }
        if let Some(v) = file.chunk_size {
            self.chunk_size = v;
        }
        if let Some(v) = file.chunk_overlap {
            self.chunk_overlap = v;
        }
        if let Some(v) = file.cache_size {
            self.cache_size = v;
        }
        if let Some(v) = file.rrf_k {
            self.rrf_k = v;
        }
        if let Some(v) = file.candidate_limit {
            self.candidate_limit = v;
        }
        if let Some(v) = file.embedding_timeout_ms {
            self.embedding_timeout_ms = v;
        }
        if let Some(v) = file.vector_timeout_ms {
            self.vector_timeout_ms = v;
        }
        if let Some(v) = file.vector_retry_secs {
            self.vector_retry_secs = v;
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        validation::ConfigValidator { config: self }.validate()
    }

    /// Interpret `vector_index`.
    pub fn vector_target(&self) -> VectorTarget {
        let target = self.vector_index.trim();
        if target.eq_ignore_ascii_case(VECTOR_INDEX_DISABLED) {
            VectorTarget::Disabled
        } else if target.starts_with("http://") || target.starts_with("https://") {
            VectorTarget::Qdrant(target.to_string())
        } else {
            VectorTarget::Sqlite(paths::expand_tilde_path(Path::new(target)))
        }
    }

    /// Ensure parent directories for the database and local vector index exist.
    pub fn ensure_directories(&self) -> Result<(), Error> {
        let mut files = vec![self.database_path.clone()];
        if let VectorTarget::Sqlite(path) = self.vector_target() {
            files.push(path);
        }

        for file in files {
            if let Some(parent) = file.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        Error::Config(format!(
                            "Failed to create directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.database_path.ends_with(".mnemo/memory.db"));
        assert!(config.vector_index.ends_with("vectors.db"));
        assert_eq!(config.embedding_url, "http://localhost:11434");
        assert_eq!(config.embedding_model, "mxbai-embed-large");
        assert_eq!(config.fallback_model, "mistral");
        assert_eq!(config.embedding_dimension, 1024);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.cache_size, 1000);
        assert_eq!(config.rrf_k, 60.0);
        assert_eq!(config.candidate_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_without_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        tests_utils::cleanup_env_vars(ENV_VARS);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.database_path.ends_with(".mnemo/memory.db"));
        assert_eq!(config.embedding_model, "mxbai-embed-large");
    }

    #[test]
    fn test_file_then_env_priority() {
        let _guard = ENV_MUTEX.lock().unwrap();
        tests_utils::cleanup_env_vars(ENV_VARS);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            embedding_model = "nomic-embed-text"
            chunk_size = 800
            rrf_k = 30.0
            "#,
        )
        .unwrap();
        tests_utils::set_env_var("MNEMO_CHUNK_SIZE", "1200");

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.rrf_k, 30.0);
        assert_eq!(config.fallback_model, "mistral");

        tests_utils::cleanup_env_vars(ENV_VARS);
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        tests_utils::cleanup_env_vars(ENV_VARS);

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "chunk_size = 50\nchunk_overlap = 50\n").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let result = Config::load(Some(Path::new("/nonexistent/mnemo/config.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_vector_target() {
        let mut config = Config::default();
        assert!(matches!(config.vector_target(), VectorTarget::Sqlite(_)));

        config.vector_index = "http://localhost:6333".to_string();
        assert_eq!(
            config.vector_target(),
            VectorTarget::Qdrant("http://localhost:6333".to_string())
        );

        config.vector_index = "Disabled".to_string();
        assert_eq!(config.vector_target(), VectorTarget::Disabled);
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            database_path: dir.path().join("a/memory.db"),
            vector_index: dir.path().join("b/vectors.db").display().to_string(),
            ..Config::default()
        };
        config.ensure_directories().unwrap();
        assert!(dir.path().join("a").is_dir());
        assert!(dir.path().join("b").is_dir());
    }
}
