//! Configuration file loading and parsing.

use crate::errors::Error;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML file. Missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub database_path: Option<PathBuf>,
    pub vector_index: Option<String>,
    pub vector_collection: Option<String>,
    pub embedding_url: Option<String>,
    pub embedding_model: Option<String>,
    pub fallback_model: Option<String>,
    pub embedding_dimension: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub cache_size: Option<usize>,
    pub rrf_k: Option<f64>,
    pub candidate_limit: Option<usize>,
    pub embedding_timeout_ms: Option<u64>,
    pub vector_timeout_ms: Option<u64>,
    pub vector_retry_secs: Option<u64>,
}

/// Standard config file location: `$XDG_CONFIG_HOME/mnemo/config.toml`.
pub fn default_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let config_dir = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
    config_dir.join("mnemo/config.toml")
}

/// Load configuration from TOML file.
///
/// An explicit path must exist. The default path is optional.
pub fn load_from_file(explicit: Option<&Path>) -> Result<Option<ConfigFile>, Error> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let path = default_config_path();
            if !path.exists() {
                return Ok(None);
            }
            path
        }
    };

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {e}",
            config_path.display()
        ))
    })?;

    let mut config: ConfigFile = toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file {}: {e}",
            config_path.display()
        ))
    })?;

    if let Some(path) = config.database_path.as_mut() {
        super::paths::expand_tilde(path);
    }

    tracing::debug!(path = %config_path.display(), "loaded config file");
    Ok(Some(config))
}
