//! Memory coordinator: segmentation, embedding, search and persistence.
//!
//! Texts go through the segmenter and embedder into an append-only entry
//! table; queries are embedded and ranked by the search engine, then resolved
//! back to fragments and their metadata.

mod crud;
mod search;

// pub(crate): module internals hidden; public items re-exported explicitly via lib.rs
pub(crate) mod store;

pub use store::{EmbeddingMode, Memory, MemoryOptions};

#[cfg(test)]
mod tests;
