//! Ingest, clear and dump operations for the memory store.

use tracing::info;

use crate::errors::Error;
use crate::memory_types::{DumpedEntry, Entry, Metadata, MetadataBatch, MemoryDump, Texts};

use super::store::{EmbeddingMode, Memory};

impl Memory {
    /// Segment, embed and append one or more texts.
    ///
    /// Each text gets its own source index and one metadata record shared by
    /// all of its fragments. A metadata batch shorter than `texts` is padded
    /// with empty records; extra records are ignored. The full table is
    /// flushed to the memory file afterwards.
    ///
    /// Nothing is appended if embedding fails.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Embedding fails or returns the wrong number of vectors
    /// - Writing the memory file fails (the in-memory table keeps the new entries)
    pub fn save(
        &mut self,
        texts: impl Into<Texts>,
        metadata: impl Into<MetadataBatch>,
    ) -> Result<(), Error> {
        let Texts(texts) = texts.into();
        let MetadataBatch(mut records) = metadata.into();
        if records.len() < texts.len() {
            records.resize(texts.len(), Metadata::new());
        }

        let first_metadata_index = self.table.metadata.len();
        let first_source_index = self.table.next_source_index;
        let mut new_entries = Vec::new();
        let mut new_records = Vec::with_capacity(texts.len());

        for (offset, (text, record)) in texts.iter().zip(records).enumerate() {
            let chunks = self.segmenter.segment(text);
            let embeddings: Vec<Option<Vec<f32>>> = match self.mode {
                EmbeddingMode::Eager => self.embed_checked(&chunks)?.into_iter().map(Some).collect(),
                EmbeddingMode::Lazy => vec![None; chunks.len()],
            };

            for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
                new_entries.push(Entry {
                    chunk,
                    embedding,
                    metadata_index: first_metadata_index + offset,
                    source_index: first_source_index + offset,
                });
            }
            new_records.push(record);
        }

        let fragment_count = new_entries.len();
        self.table.next_source_index += new_records.len();
        self.table.metadata.extend(new_records);
        self.table.entries.extend(new_entries);

        info!(
            texts = texts.len(),
            fragments = fragment_count,
            total = self.table.entries.len(),
            "Saved texts to memory"
        );
        self.persist()
    }

    /// Drop every entry and metadata record and reset the counters.
    ///
    /// The empty table is flushed immediately, so reopening the memory file
    /// after a clear yields an empty store.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.table.entries.clear();
        self.table.metadata.clear();
        self.table.next_source_index = 0;
        info!("Cleared memory");
        self.persist()
    }

    /// Describe every entry with its resolved metadata.
    pub fn dump(&self) -> MemoryDump {
        let entries = self
            .table
            .entries
            .iter()
            .map(|entry| DumpedEntry {
                chunk: entry.chunk.clone(),
                embedding_len: entry.embedding.as_ref().map_or(0, Vec::len),
                metadata: self
                    .table
                    .metadata
                    .get(entry.metadata_index)
                    .cloned()
                    .unwrap_or_default(),
                source_index: entry.source_index,
            })
            .collect();

        MemoryDump {
            entries,
            entry_count: self.table.entries.len(),
            metadata_count: self.table.metadata.len(),
        }
    }
}
