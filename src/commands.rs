//! Command handlers for the mnemo CLI.

use std::process::ExitCode;

use mnemo::{Error, MemoryEngine, MemoryType, Metadata};

use crate::output::*;

/// Commands supported by the mnemo CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a memory (identical content is deduplicated)
    Store {
        /// Memory text content
        text: String,

        /// Optional JSON object metadata
        #[arg(short = 'm', long)]
        metadata: Option<String>,

        /// Memory type
        #[arg(short = 't', long = "type", default_value = "note")]
        memory_type: MemoryType,
    },
    /// Recall memories with hybrid lexical and semantic search
    Recall {
        /// Query text
        query: String,

        /// Maximum number of results (default: 5)
        #[arg(short = 'k', long, default_value = "5")]
        k: usize,

        /// Only recall memories of this type
        #[arg(short = 't', long = "type")]
        memory_type: Option<MemoryType>,
    },
    Get {
        /// Memory ID
        id: String,
    },
    Delete {
        /// Memory ID
        id: String,
    },
    List {
        /// Maximum number of results (default: 10)
        #[arg(short = 'l', long, default_value = "10")]
        limit: usize,

        /// Only list memories of this type
        #[arg(short = 't', long = "type")]
        memory_type: Option<MemoryType>,
    },
    Stats,
    Version,
}

/// Execute a CLI command.
pub fn execute(command: &Commands, engine: &MemoryEngine, json: bool) -> Result<ExitCode, Error> {
    match command {
        Commands::Store {
            text,
            metadata,
            memory_type,
        } => handle_store(engine, text, metadata.as_deref(), *memory_type, json),
        Commands::Recall {
            query,
            k,
            memory_type,
        } => handle_recall(engine, query, *k, *memory_type, json),
        Commands::Get { id } => handle_get(engine, id, json),
        Commands::Delete { id } => handle_delete(engine, id, json),
        Commands::List { limit, memory_type } => handle_list(engine, *limit, *memory_type, json),
        Commands::Stats => handle_stats(engine, json),
        Commands::Version => handle_version(json),
    }
}

/// Parse `--metadata`, which must be a JSON object.
fn parse_metadata(raw: Option<&str>) -> Result<Metadata, Error> {
    let Some(raw) = raw else {
        return Ok(Metadata::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(Error::Query("metadata must be a JSON object".to_string())),
    }
}

fn handle_store(
    engine: &MemoryEngine,
    text: &str,
    metadata: Option<&str>,
    memory_type: MemoryType,
    json: bool,
) -> Result<ExitCode, Error> {
    let entry = engine.store(text, parse_metadata(metadata)?, memory_type)?;
    if json {
        print_json(&StoreResponse {
            status: "stored".to_string(),
            id: entry.id,
            content_hash: entry.content_hash,
        });
    } else {
        println!("Stored memory: {}", entry.id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_recall(
    engine: &MemoryEngine,
    query: &str,
    k: usize,
    memory_type: Option<MemoryType>,
    json: bool,
) -> Result<ExitCode, Error> {
    let results = engine.recall(query, k, memory_type)?;
    if json {
        print_json(&RecallResponse {
            results: results.into_iter().map(RecallItem::from).collect(),
        });
    } else {
        for result in results {
            println!(
                "{} [score: {:.4}, {}]\n  {}\n",
                result.entry.id, result.score, result.source, result.entry.content
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_get(engine: &MemoryEngine, id: &str, json: bool) -> Result<ExitCode, Error> {
    let Some(entry) = engine.get_by_id(id)? else {
        return Ok(not_found(id, json));
    };
    if json {
        print_json(&entry);
    } else {
        println!("ID: {}", entry.id);
        println!("Type: {}", entry.memory_type);
        println!("Content: {}", entry.content);
        if !entry.metadata.is_empty() {
            println!("Metadata: {}", serde_json::Value::Object(entry.metadata));
        }
        if let Some(model) = &entry.embedding_model {
            println!("Embedding model: {}", model);
        }
        println!("Created: {}", entry.created_at.to_rfc3339());
        println!("Updated: {}", entry.updated_at.to_rfc3339());
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_delete(engine: &MemoryEngine, id: &str, json: bool) -> Result<ExitCode, Error> {
    if !engine.delete(id)? {
        return Ok(not_found(id, json));
    }
    if json {
        print_json(&DeleteResponse {
            status: "deleted".to_string(),
            id: id.to_string(),
        });
    } else {
        println!("Deleted memory: {}", id);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_list(
    engine: &MemoryEngine,
    limit: usize,
    memory_type: Option<MemoryType>,
    json: bool,
) -> Result<ExitCode, Error> {
    let memories = engine.list(limit, memory_type)?;
    if json {
        print_json(&ListResponse { memories });
    } else {
        for memory in memories {
            println!("{} [{}]: {}", memory.id, memory.memory_type, memory.content);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_stats(engine: &MemoryEngine, json: bool) -> Result<ExitCode, Error> {
    let stats = engine.stats()?;
    if json {
        let storage_size_human = format_bytes(stats.storage_size);
        print_json(&StatsResponse {
            stats,
            storage_size_human,
        });
        return Ok(ExitCode::SUCCESS);
    }

    println!("Entries: {}", stats.total_entries);
    println!("Chunks: {}", stats.total_chunks);
    for (memory_type, count) in &stats.entries_by_type {
        println!("  {memory_type}: {count}");
    }
    println!("Storage: {}", format_bytes(stats.storage_size));
    if let (Some(oldest), Some(newest)) = (stats.oldest_memory, stats.newest_memory) {
        println!("Oldest: {}", oldest.to_rfc3339());
        println!("Newest: {}", newest.to_rfc3339());
    }
    println!(
        "Vector index: {}",
        if stats.vector_index_available {
            "available"
        } else {
            "unavailable (lexical-only)"
        }
    );
    println!("Embedding mode: {}", stats.embedding_mode);
    for (model, count) in &stats.embedding_models {
        println!("  {model}: {count}");
    }
    println!(
        "Embedding cache: {}/{} (hit rate {:.1}%)",
        stats.cache.size,
        stats.cache.max_size,
        stats.cache.hit_rate * 100.0
    );
    Ok(ExitCode::SUCCESS)
}

pub fn handle_version(json: bool) -> Result<ExitCode, Error> {
    if json {
        print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "name": env!("CARGO_PKG_NAME")
        }));
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(ExitCode::SUCCESS)
}

fn not_found(id: &str, json: bool) -> ExitCode {
    let message = format!("Memory not found: {id}");
    if json {
        print_json(&ErrorResponse { error: message });
    } else {
        eprintln!("{message}");
    }
    ExitCode::FAILURE
}
