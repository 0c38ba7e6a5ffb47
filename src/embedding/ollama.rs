//! HTTP backend for an Ollama-compatible `/api/embeddings` endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::EmbeddingError;
use super::provider::EmbeddingBackend;

pub struct OllamaBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = base_url.trim_end_matches('/');
    if normalized.ends_with("/api/embeddings") {
        return normalized.to_string();
    }
    format!("{normalized}/api/embeddings")
}

impl OllamaBackend {
    /// Build a backend whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Transport {
                model: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: embeddings_endpoint(base_url),
        })
    }
}

impl EmbeddingBackend for OllamaBackend {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest {
                model,
                prompt: text,
            })
            .send()
            .map_err(|e| EmbeddingError::Transport {
                model: model.to_string(),
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status {
                model: model.to_string(),
                status: status.as_u16(),
            });
        }

        let body: EmbeddingResponse =
            response
                .json()
                .map_err(|e| EmbeddingError::InvalidResponse {
                    model: model.to_string(),
                    message: e.to_string(),
                })?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse {
                model: model.to_string(),
                message: "empty embedding returned".to_string(),
            });
        }
        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_host() {
        assert_eq!(
            embeddings_endpoint("http://localhost:11434"),
            "http://localhost:11434/api/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("http://localhost:11434/"),
            "http://localhost:11434/api/embeddings"
        );
    }

    #[test]
    fn test_endpoint_preserves_explicit_path() {
        assert_eq!(
            embeddings_endpoint("http://gpu-box:11434/api/embeddings"),
            "http://gpu-box:11434/api/embeddings"
        );
    }

    #[test]
    fn test_unreachable_service_is_transport_error() {
        let backend = OllamaBackend::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = backend.embed("mxbai-embed-large", "hello").unwrap_err();
        assert!(matches!(err, EmbeddingError::Transport { .. }));
    }
}
