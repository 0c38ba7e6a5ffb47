//! JSON response types and formatting for CLI output.

use mnemo::{MemoryEntry, MemoryStats, RecallResult, RecallSource};
use serde::Serialize;

/// Response for a store command.
#[derive(Serialize)]
pub struct StoreResponse {
    pub status: String,
    pub id: String,
    pub content_hash: String,
}

/// Response for recall results.
#[derive(Serialize)]
pub struct RecallResponse {
    pub results: Vec<RecallItem>,
}

/// Individual recall result item.
#[derive(Serialize)]
pub struct RecallItem {
    pub id: String,
    pub content: String,
    pub memory_type: String,
    pub score: f64,
    pub source: RecallSource,
    pub updated_at: String,
}

impl From<RecallResult> for RecallItem {
    fn from(result: RecallResult) -> Self {
        Self {
            id: result.entry.id,
            content: result.entry.content,
            memory_type: result.entry.memory_type.to_string(),
            score: result.score,
            source: result.source,
            updated_at: result.entry.updated_at.to_rfc3339(),
        }
    }
}

/// Response for listing memories.
#[derive(Serialize)]
pub struct ListResponse {
    pub memories: Vec<MemoryEntry>,
}

/// Response for successful memory deletion.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: String,
    pub id: String,
}

/// Response for stats.
#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: MemoryStats,
    pub storage_size_human: String,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Render a byte count with a binary unit suffix.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Print a value as formatted JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_store_response() {
        let response = StoreResponse {
            status: "stored".to_string(),
            id: "mem_0123456789ab".to_string(),
            content_hash: "abc".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"stored\""));
        assert!(json.contains("\"id\":\"mem_0123456789ab\""));
    }

    #[test]
    fn test_serialize_recall_item_source_lowercase() {
        let item = RecallItem {
            id: "mem_1".to_string(),
            content: "text".to_string(),
            memory_type: "note".to_string(),
            score: 0.5,
            source: RecallSource::Hybrid,
            updated_at: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_string(&RecallResponse { results: vec![item] }).unwrap();
        assert!(json.contains("\"results\""));
        assert!(json.contains("\"source\":\"hybrid\""));
        assert!(json.contains("\"score\":0.5"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
