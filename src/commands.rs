//! Command handlers for vectormem CLI.

use crate::output::*;
use std::process::ExitCode;
use vectormem::{BatchResults, Error, Memory, MetadataBatch};

/// Parse `--batch-results` (`flatten` or `diverse`).
fn parse_batch_results(value: &str) -> Result<BatchResults, String> {
    value.parse().map_err(|e: Error| e.to_string())
}

/// Commands supported by vectormem CLI.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Segment, embed and store one or more texts
    Save {
        /// Texts to store
        #[arg(required = true)]
        texts: Vec<String>,

        /// JSON metadata: an array with one object per text, or a single object
        /// for the first text (texts without a record get `{}`)
        #[arg(short = 'm', long)]
        metadata: Option<String>,
    },
    /// Find the stored fragments closest to the queries
    Search {
        /// Search query text (several queries are searched as one batch)
        #[arg(required = true)]
        queries: Vec<String>,

        /// Maximum number of results (default: 5)
        #[arg(short = 'n', long, default_value = "5")]
        top_n: usize,

        /// Keep only the best fragment of every stored text
        #[arg(short = 'u', long)]
        unique: bool,

        /// Merge strategy for several queries: `flatten` (closest fragments
        /// across all queries) or `diverse` (every query's best hit first)
        #[arg(long, default_value = "flatten", value_parser = parse_batch_results)]
        batch_results: BatchResults,
    },
    /// Print every stored fragment with its metadata
    Dump,
    /// Remove everything from the memory file
    Clear,
    Version,
}

/// Execute a CLI command.
pub fn execute(command: &Commands, memory: &mut Memory, json: bool) -> Result<ExitCode, Error> {
    match command {
        Commands::Save { texts, metadata } => {
            handle_save(memory, texts, metadata.as_deref(), json)
        }
        Commands::Search {
            queries,
            top_n,
            unique,
            batch_results,
        } => handle_search(memory, queries, *top_n, *unique, *batch_results, json),
        Commands::Dump => handle_dump(memory, json),
        Commands::Clear => handle_clear(memory, json),
        Commands::Version => handle_version(json),
    }
}

/// Parse `--metadata` into a batch; absent metadata yields empty records.
fn parse_metadata(metadata: Option<&str>) -> Result<MetadataBatch, Error> {
    match metadata {
        Some(raw) => Ok(MetadataBatch::from(serde_json::from_str::<serde_json::Value>(raw)?)),
        None => Ok(MetadataBatch::default()),
    }
}

fn handle_save(
    memory: &mut Memory,
    texts: &[String],
    metadata: Option<&str>,
    json: bool,
) -> Result<ExitCode, Error> {
    let batch = parse_metadata(metadata)?;
    let before = memory.len();
    memory.save(texts.to_vec(), batch)?;
    let fragments = memory.len() - before;

    if json {
        print_json(&SaveResponse {
            status: "saved".to_string(),
            texts: texts.len(),
            fragments,
            total_entries: memory.len(),
        });
    } else {
        println!("Saved {} text(s) as {} fragment(s)", texts.len(), fragments);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_search(
    memory: &mut Memory,
    queries: &[String],
    top_n: usize,
    unique: bool,
    batch_results: BatchResults,
    json: bool,
) -> Result<ExitCode, Error> {
    let results = memory.search_batch(queries.to_vec(), top_n, unique, batch_results)?;
    if json {
        let results: Vec<SearchResultItem> = results.into_iter().map(Into::into).collect();
        print_json(&SearchResponse { results });
    } else {
        for result in results {
            println!("[distance: {:.4}]\n  {}", result.distance, result.chunk);
            if !result.metadata.is_empty() {
                println!("  {}", serde_json::Value::Object(result.metadata));
            }
            println!();
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_dump(memory: &Memory, json: bool) -> Result<ExitCode, Error> {
    let dump = memory.dump();
    if json {
        print_json(&dump);
    } else {
        println!("{dump}");
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_clear(memory: &mut Memory, json: bool) -> Result<ExitCode, Error> {
    let removed_entries = memory.len();
    memory.clear()?;
    if json {
        print_json(&ClearResponse {
            status: "cleared".to_string(),
            removed_entries,
        });
    } else {
        println!("Cleared {removed_entries} fragment(s)");
    }
    Ok(ExitCode::SUCCESS)
}

pub fn handle_version(json: bool) -> Result<ExitCode, Error> {
    if json {
        print_json(&VersionResponse {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(ExitCode::SUCCESS)
}
