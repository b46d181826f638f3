//! vectormem - a local similarity-search memory for text.
//!
//! Texts are segmented into fragments, embedded into vectors and kept in an
//! append-only table that is flushed to a single memory file. Queries return
//! the closest fragments together with the metadata saved alongside them.
//! All operations are synchronous (no async/await required).
//!
//! # Example
//!
//! ```no_run
//! use vectormem::{Config, Memory, OnnxEmbedder};
//!
//! let config = Config::load().expect("Failed to load config");
//! config.ensure_directories().expect("Failed to create directories");
//!
//! let embedder = OnnxEmbedder::new(&config.embedding_model).expect("Failed to load model");
//! let mut memory = Memory::new(config.memory_options().expect("Invalid config"), embedder)
//!     .expect("Failed to open memory");
//!
//! memory
//!     .save("Alice works at Microsoft", serde_json::json!({"source": "notes"}))
//!     .expect("Failed to save");
//!
//! for result in memory.search("where does alice work", 5, true).expect("Search failed") {
//!     println!("{:.3}: {}", result.distance, result.chunk);
//! }
//! ```
//!
//! # Mutability Requirements
//!
//! Methods that generate embeddings (`save`, `search`) require `&mut self`
//! because the embedder may mutate internal state for ONNX tensor allocations.

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod memory;
pub mod memory_types;
pub mod search;
pub mod storage;

// Re-export public API
pub use chunking::{Chunker, ChunkingStrategy, Segmenter};
pub use config::Config;
pub use embedding::Embedder;
#[cfg(feature = "onnx")]
pub use embedding::OnnxEmbedder;
pub use errors::Error;
pub use memory::{EmbeddingMode, Memory, MemoryOptions};
pub use memory_types::{Entry, Metadata, MetadataBatch, MemoryDump, SearchResult, Texts};
pub use search::{BatchResults, Matrix, Neighbor, Query, SearchEngine};
pub use storage::{Snapshot, Storage};
