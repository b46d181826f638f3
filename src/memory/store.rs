//! Core memory store struct combining segmentation, embedding and persistence.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunking::{Chunker, ChunkingStrategy, Segmenter};
use crate::embedding::Embedder;
use crate::errors::Error;
use crate::memory_types::{Entry, Metadata};
use crate::search::SearchEngine;
use crate::storage::{Snapshot, Storage};

/// When fragments are turned into vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingMode {
    /// Embed fragments as they are saved; queries are embedded alone.
    #[default]
    Eager,
    /// Store bare fragments; every search embeds all fragments plus the query
    /// in one batch.
    Lazy,
}

impl fmt::Display for EmbeddingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingMode::Eager => write!(f, "eager"),
            EmbeddingMode::Lazy => write!(f, "lazy"),
        }
    }
}

/// Construction-time settings for a [`Memory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryOptions {
    /// Memory file to load from and flush to; `None` keeps the store in memory only.
    pub memory_file: Option<PathBuf>,
    pub chunking: ChunkingStrategy,
    pub embedding_mode: EmbeddingMode,
}

/// Similarity-search memory over segmented, embedded texts.
///
/// Owns the entry table, the metadata records and the source counter, plus
/// the segmenter and embedder it was built with.
///
/// # Mutability Requirements
///
/// `search` takes `&mut self` because embedders may mutate internal state.
/// It never modifies the stored entries or metadata. `Memory` is `Send` but
/// not `Sync`: to share one store between threads, wrap it in a `Mutex`.
/// Searches on a shared store are therefore serialized, like every other call.
pub struct Memory {
    pub(crate) table: Snapshot,
    pub(crate) storage: Option<Storage>,
    pub(crate) segmenter: Box<dyn Segmenter>,
    pub(crate) embedder: Box<dyn Embedder>,
    pub(crate) engine: SearchEngine,
    pub(crate) mode: EmbeddingMode,
}

impl Memory {
    /// Open a store, loading `options.memory_file` if it exists.
    ///
    /// In eager mode, entries loaded without embeddings are embedded once and
    /// the file is rewritten.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The chunking strategy is invalid
    /// - The memory file's parent directory is not accessible
    /// - An existing memory file cannot be read or decoded
    /// - Back-filling embeddings fails
    pub fn new(options: MemoryOptions, embedder: impl Embedder + 'static) -> Result<Self, Error> {
        let chunker = Chunker::new(options.chunking)?;
        debug!(strategy = %chunker.strategy(), "Segmenting with chunker");
        Self::with_segmenter(options, chunker, embedder)
    }

    /// Like [`Memory::new`], but segmenting with `segmenter` instead of
    /// `options.chunking`.
    pub fn with_segmenter(
        options: MemoryOptions,
        segmenter: impl Segmenter + 'static,
        embedder: impl Embedder + 'static,
    ) -> Result<Self, Error> {
        let storage = match options.memory_file {
            Some(path) => {
                validate_memory_path(&path)?;
                Some(Storage::new(path))
            }
            None => None,
        };

        let table = match &storage {
            Some(storage) => storage.load_from_disk()?,
            None => Snapshot::default(),
        };

        let mut memory = Memory {
            table,
            storage,
            segmenter: Box::new(segmenter),
            embedder: Box::new(embedder),
            engine: SearchEngine::new(),
            mode: options.embedding_mode,
        };

        if memory.mode == EmbeddingMode::Eager && memory.backfill_embeddings()? {
            memory.persist()?;
        }

        info!(
            entries = memory.table.entries.len(),
            mode = %memory.mode,
            "Opened memory store"
        );
        Ok(memory)
    }

    /// Replace the search engine (e.g. to force exact search).
    pub fn with_search_engine(mut self, engine: SearchEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn len(&self) -> usize {
        self.table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.table.entries
    }

    pub fn metadata_records(&self) -> &[Metadata] {
        &self.table.metadata
    }

    pub fn embedding_mode(&self) -> EmbeddingMode {
        self.mode
    }

    pub fn memory_file(&self) -> Option<&Path> {
        self.storage.as_ref().map(Storage::path)
    }

    /// Flush the full table to the memory file, if one is configured.
    pub(crate) fn persist(&self) -> Result<(), Error> {
        if let Some(storage) = &self.storage {
            storage.save_to_disk(&self.table)?;
        }
        Ok(())
    }

    /// Embed `fragments`, checking the embedder returned one vector each.
    pub(crate) fn embed_checked(&mut self, fragments: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embedder.embed(fragments)?;
        if vectors.len() != fragments.len() {
            return Err(Error::Embedding(format!(
                "Embedder returned {} vectors for {} fragments",
                vectors.len(),
                fragments.len()
            )));
        }
        Ok(vectors)
    }

    /// Fill in missing embeddings; returns whether anything changed.
    fn backfill_embeddings(&mut self) -> Result<bool, Error> {
        let missing: Vec<usize> = self
            .table
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.embedding.is_none())
            .map(|(position, _)| position)
            .collect();
        if missing.is_empty() {
            return Ok(false);
        }

        let chunks: Vec<String> = missing
            .iter()
            .map(|&position| self.table.entries[position].chunk.clone())
            .collect();
        let vectors = self.embed_checked(&chunks)?;
        for (position, vector) in missing.iter().zip(vectors) {
            self.table.entries[*position].embedding = Some(vector);
        }

        info!(count = missing.len(), "Back-filled missing embeddings");
        Ok(true)
    }
}

fn validate_memory_path(path: &Path) -> Result<(), Error> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config("Memory file path cannot be empty".to_string()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::canonicalize(parent).map_err(|e| {
                Error::Config(format!(
                    "Invalid memory file path: parent directory not accessible: {e}"
                ))
            })?;
        }
    }
    Ok(())
}
