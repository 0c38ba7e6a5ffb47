//! Qdrant collection accessed over its REST API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Result, VectorError, VectorHit, VectorIndex, VectorPayload};
use crate::memory_types::MemoryType;

pub struct QdrantVectorIndex {
    client: reqwest::blocking::Client,
    base_url: String,
    collection: String,
    dimension: usize,
}

#[derive(Serialize)]
struct Point<'a> {
    id: String,
    vector: &'a [f32],
    payload: &'a VectorPayload,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f64,
    payload: Option<VectorPayload>,
}

/// Qdrant point ids must be UUIDs or integers; derive a stable UUID per chunk.
pub fn point_id(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes())
}

fn request_error(e: reqwest::Error) -> VectorError {
    if e.is_connect() || e.is_timeout() {
        VectorError::Unreachable(e.to_string())
    } else {
        VectorError::Request(e.to_string())
    }
}

/// 4xx means Qdrant refused this payload; anything else is the service.
fn status_error(status: reqwest::StatusCode, body: String) -> VectorError {
    if status.is_client_error() {
        VectorError::Rejected(format!("status {status}: {body}"))
    } else {
        VectorError::Request(format!("status {status}: {body}"))
    }
}

fn type_filter(memory_type: Option<MemoryType>) -> Option<Value> {
    memory_type.map(|t| {
        json!({
            "must": [{ "key": "memory_type", "match": { "value": t.as_str() } }]
        })
    })
}

impl QdrantVectorIndex {
    pub fn new(base_url: &str, collection: &str, dimension: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VectorError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            dimension,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response> {
        let response = request.send().map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, body));
        }
        Ok(response)
    }
}

impl VectorIndex for QdrantVectorIndex {
    fn name(&self) -> &'static str {
        "qdrant"
    }

    fn ensure_ready(&self) -> Result<()> {
        let response = self
            .client
            .get(self.collection_url())
            .send()
            .map_err(request_error)?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(VectorError::Request(format!(
                "collection lookup returned status {}",
                response.status()
            )));
        }

        self.send(self.client.put(self.collection_url()).json(&json!({
            "vectors": { "size": self.dimension, "distance": "Cosine" }
        })))?;
        info!(collection = %self.collection, dim = self.dimension, "created qdrant collection");
        Ok(())
    }

    fn upsert(&self, payload: &VectorPayload, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorError::MismatchedDimensions {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(VectorError::InvalidVector(
                "Vector contains NaN or infinite values".to_string(),
            ));
        }

        let point = Point {
            id: point_id(&payload.chunk_id).to_string(),
            vector,
            payload,
        };
        self.send(
            self.client
                .put(format!("{}/points?wait=true", self.collection_url()))
                .json(&json!({ "points": [point] })),
        )?;
        Ok(())
    }

    fn search(
        &self,
        vector: &[f32],
        limit: usize,
        memory_type: Option<MemoryType>,
    ) -> Result<Vec<VectorHit>> {
        if vector.len() != self.dimension {
            debug!(
                expected = self.dimension,
                actual = vector.len(),
                "query vector width differs from collection, no semantic hits"
            );
            return Ok(Vec::new());
        }

        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = type_filter(memory_type) {
            body["filter"] = filter;
        }

        let response: SearchResponse = self
            .send(
                self.client
                    .post(format!("{}/points/search", self.collection_url()))
                    .json(&body),
            )?
            .json()
            .map_err(|e| VectorError::Request(format!("invalid search response: {e}")))?;

        let hits: Vec<VectorHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                point.payload.map(|payload| VectorHit {
                    chunk_id: payload.chunk_id,
                    parent_id: payload.parent_id,
                    score: point.score,
                })
            })
            .collect();
        debug!(hits = hits.len(), "qdrant vector search");
        Ok(hits)
    }

    fn delete(&self, chunk_ids: &[String]) -> Result<()> {
        if chunk_ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = chunk_ids.iter().map(|id| point_id(id).to_string()).collect();
        self.send(
            self.client
                .post(format!("{}/points/delete?wait=true", self.collection_url()))
                .json(&json!({ "points": ids })),
        )?;
        Ok(())
    }
}
