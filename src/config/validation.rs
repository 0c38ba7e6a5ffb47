//! Configuration validation logic.

use crate::errors::Error;

use super::{Config, VectorTarget};

/// Validates configuration values.
pub struct ConfigValidator<'a> {
    pub config: &'a Config,
}

impl ConfigValidator<'_> {
    /// Validate all configuration values for correctness and constraints.
    ///
    /// Checks that:
    /// - Paths, URLs and model names are not empty
    /// - Chunk overlap is smaller than chunk size
    /// - Sizes, limits and timeouts are positive
    /// - RRF k is a positive finite number
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if any validation check fails.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_paths()?;
        self.validate_models()?;
        self.validate_chunking()?;
        self.validate_rrf_k()?;
        self.validate_positive()?;

        Ok(())
    }

    fn validate_paths(&self) -> Result<(), Error> {
        let c = self.config;
        if c.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }
        if c.vector_index.trim().is_empty() {
            return Err(Error::Config(
                "Vector index cannot be empty (use \"disabled\" to turn it off)".to_string(),
            ));
        }
        if matches!(c.vector_target(), VectorTarget::Qdrant(_))
            && c.vector_collection.trim().is_empty()
        {
            return Err(Error::Config("Vector collection cannot be empty".to_string()));
        }
        if c.embedding_url.trim().is_empty() {
            return Err(Error::Config("Embedding URL cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_models(&self) -> Result<(), Error> {
        if self.config.embedding_model.trim().is_empty() {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }
        if self.config.fallback_model.trim().is_empty() {
            return Err(Error::Config("Fallback model cannot be empty".to_string()));
        }

        Ok(())
    }

    fn validate_chunking(&self) -> Result<(), Error> {
        let c = self.config;
        if c.chunk_size == 0 {
            return Err(Error::Config("Chunk size must be greater than 0".to_string()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(Error::Config(format!(
                "Invalid chunk overlap: {} (must be smaller than chunk size {})",
                c.chunk_overlap, c.chunk_size
            )));
        }

        Ok(())
    }

    fn validate_rrf_k(&self) -> Result<(), Error> {
        let k = self.config.rrf_k;
        if k.is_nan() || k.is_infinite() {
            return Err(Error::Config(
                "Invalid RRF k: NaN and infinity are not allowed".into(),
            ));
        }

        if k <= 0.0 {
            return Err(Error::Config(format!(
                "Invalid RRF k: {k} (must be greater than 0)"
            )));
        }

        Ok(())
    }

    fn validate_positive(&self) -> Result<(), Error> {
        let c = self.config;
        let checks: [(&str, u64); 6] = [
            ("embedding_dimension", c.embedding_dimension as u64),
            ("cache_size", c.cache_size as u64),
            ("candidate_limit", c.candidate_limit as u64),
            ("embedding_timeout_ms", c.embedding_timeout_ms),
            ("vector_timeout_ms", c.vector_timeout_ms),
            ("vector_retry_secs", c.vector_retry_secs),
        ];

        for (name, value) in checks {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be greater than 0")));
            }
        }

        Ok(())
    }
}
