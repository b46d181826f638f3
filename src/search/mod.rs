//! Nearest-neighbour search over a stacked candidate matrix.
//!
//! This module provides:
//! - `Matrix`: contiguous row-major `f32` storage for candidate or query vectors
//! - `SearchBackend`: the capability both backends implement
//! - `exact`: brute-force squared-L2 search
//! - `forest`: random-projection forest for large candidate sets (`approximate` feature)
//! - `aggregate`: `flatten` / `diverse` merging of batched query results
//!
//! Backend choice is a pure function of candidate count and availability; see
//! [`select_backend`].

pub mod aggregate;
pub mod exact;
#[cfg(feature = "approximate")]
pub mod forest;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::errors::Error;

pub use self::exact::ExactIndex;

/// Candidate count at which the approximate backend takes over.
pub const APPROXIMATE_THRESHOLD: usize = 3000;

/// Row-major matrix of `f32` vectors.
///
/// Row positions are the ids returned by search: for the memory store they are
/// entry-table positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    dims: usize,
}

impl Matrix {
    /// Stack rows into one contiguous matrix.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if rows differ in length.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, Error> {
        let dims = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dims);
        for row in rows {
            let row = row.as_ref();
            if row.len() != dims {
                return Err(Error::DimensionMismatch {
                    expected: dims,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            data,
            rows: rows.len(),
            dims,
        })
    }

    /// Stack `f64` rows, narrowing every value to `f32`.
    pub fn from_f64_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, Error> {
        let narrowed: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| row.as_ref().iter().map(|&x| x as f32).collect())
            .collect();
        Self::from_rows(&narrowed)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.rows()`.
    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dims;
        &self.data[start..start + self.dims]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).map(move |index| self.row(index))
    }

    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// One search hit: a candidate row and its squared-L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// A single query vector or a batch of them.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Single(&'a [f32]),
    Batch(&'a Matrix),
}

impl Query<'_> {
    fn dims(&self) -> usize {
        match self {
            Query::Single(vector) => vector.len(),
            Query::Batch(matrix) => matrix.dims(),
        }
    }
}

/// How per-row results of a batched query are merged into one ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchResults {
    /// Pool every row's hits and rank them by distance.
    #[default]
    Flatten,
    /// Round-robin across rows, rank by rank.
    Diverse,
}

impl FromStr for BatchResults {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "flatten" => Ok(BatchResults::Flatten),
            "diverse" => Ok(BatchResults::Diverse),
            other => Err(Error::Config(format!(
                "Invalid batch results mode: {other} (expected 'flatten' or 'diverse')"
            ))),
        }
    }
}

impl fmt::Display for BatchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchResults::Flatten => write!(f, "flatten"),
            BatchResults::Diverse => write!(f, "diverse"),
        }
    }
}

/// Nearest-neighbour capability shared by the exact and approximate backends.
pub trait SearchBackend {
    /// Up to `k` nearest rows to `query`, ascending by distance.
    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor>;

    fn kind(&self) -> BackendKind;
}

/// Which backend serves a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Exact,
    Approximate,
}

/// Pick the backend for `candidate_count` rows.
///
/// Below [`APPROXIMATE_THRESHOLD`], or when no approximate backend is compiled
/// in, search is exact.
pub fn select_backend(candidate_count: usize, approximate_available: bool) -> BackendKind {
    if candidate_count < APPROXIMATE_THRESHOLD || !approximate_available {
        BackendKind::Exact
    } else {
        BackendKind::Approximate
    }
}

/// Tuning for the random-projection forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    /// Number of independent trees; more trees raise recall.
    pub n_trees: usize,
    /// Maximum number of rows in a leaf.
    pub leaf_size: usize,
    /// Seed for the projection directions, so identical input gives identical output.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 10,
            leaf_size: 64,
            seed: 0x5eed_cafe,
        }
    }
}

/// Search dispatcher: builds the right backend per call and merges batches.
///
/// Backends are built fresh over each candidate matrix; nothing is cached
/// between calls.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    approximate_available: bool,
    forest_params: ForestParams,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchEngine {
    /// Engine using the approximate backend whenever it is compiled in.
    pub fn new() -> Self {
        SearchEngine {
            approximate_available: cfg!(feature = "approximate"),
            forest_params: ForestParams::default(),
        }
    }

    /// Engine that always searches exactly.
    pub fn exact_only() -> Self {
        SearchEngine {
            approximate_available: false,
            forest_params: ForestParams::default(),
        }
    }

    pub fn with_forest_params(mut self, params: ForestParams) -> Self {
        self.forest_params = params;
        self
    }

    /// Backend a search over `candidate_count` rows would request.
    pub fn backend_for(&self, candidate_count: usize) -> BackendKind {
        select_backend(candidate_count, self.approximate_available)
    }

    /// Find the `top_n` candidates closest to `query`.
    ///
    /// Batched queries are merged according to `batch_results`; single
    /// queries ignore it. Returns an empty list for an empty candidate matrix
    /// and at most `candidates.rows()` hits.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if the query and candidate widths differ.
    pub fn search(
        &self,
        query: Query<'_>,
        candidates: &Matrix,
        top_n: usize,
        batch_results: BatchResults,
    ) -> Result<Vec<Neighbor>, Error> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        if let Query::Batch(batch) = query {
            if batch.is_empty() {
                return Ok(Vec::new());
            }
        }
        if query.dims() != candidates.dims() {
            return Err(Error::DimensionMismatch {
                expected: candidates.dims(),
                actual: query.dims(),
            });
        }

        let k = top_n.min(candidates.rows());
        let backend = self.build_backend(candidates);

        match query {
            Query::Single(vector) => Ok(backend.nearest(vector, k)),
            Query::Batch(batch) => {
                let per_row: Vec<Vec<Neighbor>> = batch
                    .iter_rows()
                    .map(|row| backend.nearest(row, k))
                    .collect();
                Ok(aggregate::combine(&per_row, top_n, batch_results))
            }
        }
    }

    fn build_backend<'a>(&self, candidates: &'a Matrix) -> Box<dyn SearchBackend + 'a> {
        let backend: Box<dyn SearchBackend + 'a> = match self.backend_for(candidates.rows()) {
            BackendKind::Exact => Box::new(ExactIndex::new(candidates)),
            BackendKind::Approximate => match self.build_forest(candidates) {
                Ok(forest) => forest,
                Err(e) => {
                    debug!(error = %e, "Approximate backend unavailable, searching exactly");
                    Box::new(ExactIndex::new(candidates))
                }
            },
        };
        debug!(rows = candidates.rows(), backend = ?backend.kind(), "Selected search backend");
        backend
    }

    #[cfg(feature = "approximate")]
    fn build_forest<'a>(
        &self,
        candidates: &'a Matrix,
    ) -> Result<Box<dyn SearchBackend + 'a>, Error> {
        let forest = forest::RpForest::build(candidates, &self.forest_params)?;
        Ok(Box::new(forest))
    }

    #[cfg(not(feature = "approximate"))]
    fn build_forest<'a>(
        &self,
        _candidates: &'a Matrix,
    ) -> Result<Box<dyn SearchBackend + 'a>, Error> {
        Err(Error::BackendUnavailable(
            "built without the 'approximate' feature".to_string(),
        ))
    }
}
