//! JSON response types and formatting for CLI output.

use serde::Serialize;
use vectormem::{Metadata, SearchResult};

/// Response for a successful save.
#[derive(Serialize)]
pub struct SaveResponse {
    pub status: String,
    pub texts: usize,
    pub fragments: usize,
    pub total_entries: usize,
}

/// Response for search results.
#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

/// Individual search result item.
#[derive(Serialize)]
pub struct SearchResultItem {
    pub chunk: String,
    pub distance: f32,
    pub metadata: Metadata,
}

impl From<SearchResult> for SearchResultItem {
    fn from(result: SearchResult) -> Self {
        SearchResultItem {
            chunk: result.chunk,
            distance: result.distance,
            metadata: result.metadata,
        }
    }
}

/// Response for a cleared store.
#[derive(Serialize)]
pub struct ClearResponse {
    pub status: String,
    pub removed_entries: usize,
}

/// Version response.
#[derive(Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
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
