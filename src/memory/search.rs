//! Query operations for the memory store.

use std::collections::HashSet;

use tracing::debug;

use crate::errors::Error;
use crate::memory_types::{SearchResult, Texts};
use crate::search::{BatchResults, Matrix, Neighbor, Query};

use super::store::{EmbeddingMode, Memory};

impl Memory {
    /// Find the `top_n` fragments closest to `query`.
    ///
    /// With `unique`, later hits from an already-returned source text are
    /// dropped. The filter runs after the ranking is cut to `top_n`, so fewer
    /// than `top_n` results may come back even if more distinct sources exist.
    ///
    /// # Returns
    ///
    /// Results ordered by ascending squared L2 distance.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Embedding fails
    /// - The query vector's dimensionality differs from the stored vectors
    #[must_use = "handle the error or results may be lost"]
    pub fn search(
        &mut self,
        query: &str,
        top_n: usize,
        unique: bool,
    ) -> Result<Vec<SearchResult>, Error> {
        self.search_batch(query, top_n, unique, BatchResults::Flatten)
    }

    /// Search several queries at once and merge their rankings.
    ///
    /// Each query contributes its own top `top_n`; `batch_results` decides how
    /// they are merged into a single list of at most `top_n` distinct
    /// fragments. A single query behaves exactly like [`Memory::search`].
    #[must_use = "handle the error or results may be lost"]
    pub fn search_batch(
        &mut self,
        queries: impl Into<Texts>,
        top_n: usize,
        unique: bool,
        batch_results: BatchResults,
    ) -> Result<Vec<SearchResult>, Error> {
        let Texts(queries) = queries.into();
        if queries.is_empty() || top_n == 0 || self.table.entries.is_empty() {
            return Ok(Vec::new());
        }

        let (query_vectors, candidates) = match self.mode {
            EmbeddingMode::Eager => self.embed_eager(&queries)?,
            EmbeddingMode::Lazy => self.embed_lazy(&queries)?,
        };

        let query = if query_vectors.rows() == 1 {
            Query::Single(query_vectors.row(0))
        } else {
            Query::Batch(&query_vectors)
        };
        let hits = self.engine.search(query, &candidates, top_n, batch_results)?;
        debug!(
            queries = queries.len(),
            batch_results = %batch_results,
            candidates = candidates.rows(),
            hits = hits.len(),
            "Ranked memory entries"
        );

        Ok(self.resolve(hits, unique))
    }

    /// Embed the queries alone and stack the stored embeddings as candidates.
    fn embed_eager(&mut self, queries: &[String]) -> Result<(Matrix, Matrix), Error> {
        let query_vectors = self.embed_checked(queries)?;

        let stored = self
            .table
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                entry.embedding.as_deref().ok_or_else(|| {
                    Error::Embedding(format!("Entry {position} has no stored embedding"))
                })
            })
            .collect::<Result<Vec<&[f32]>, Error>>()?;

        Ok((Matrix::from_rows(&query_vectors)?, Matrix::from_rows(&stored)?))
    }

    /// Embed every stored fragment followed by the queries in one call.
    ///
    /// The trailing vectors are the queries; the rest are candidates in
    /// entry-table order.
    fn embed_lazy(&mut self, queries: &[String]) -> Result<(Matrix, Matrix), Error> {
        let mut fragments: Vec<String> = self
            .table
            .entries
            .iter()
            .map(|entry| entry.chunk.clone())
            .collect();
        fragments.extend(queries.iter().cloned());

        let mut vectors = self.embed_checked(&fragments)?;
        let query_vectors = vectors.split_off(self.table.entries.len());

        Ok((Matrix::from_rows(&query_vectors)?, Matrix::from_rows(&vectors)?))
    }

    /// Map ranked hits back to fragments and metadata.
    fn resolve(&self, hits: Vec<Neighbor>, unique: bool) -> Vec<SearchResult> {
        let mut seen_sources = HashSet::new();
        hits.into_iter()
            .filter_map(|hit| {
                let entry = self.table.entries.get(hit.index)?;
                if unique && !seen_sources.insert(entry.source_index) {
                    return None;
                }
                Some(SearchResult {
                    chunk: entry.chunk.clone(),
                    metadata: self
                        .table
                        .metadata
                        .get(entry.metadata_index)
                        .cloned()
                        .unwrap_or_default(),
                    distance: hit.distance,
                })
            })
            .collect()
    }
}
