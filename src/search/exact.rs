//! Exact brute-force search.

use std::cmp::Ordering;

use super::{BackendKind, Matrix, Neighbor, SearchBackend, squared_l2};

/// Flat index scanning every candidate row.
pub struct ExactIndex<'a> {
    candidates: &'a Matrix,
}

impl<'a> ExactIndex<'a> {
    pub fn new(candidates: &'a Matrix) -> Self {
        ExactIndex { candidates }
    }
}

impl SearchBackend for ExactIndex<'_> {
    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let scored = self
            .candidates
            .iter_rows()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: squared_l2(query, row),
            })
            .collect();
        top_k(scored, k)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Exact
    }
}

/// Ascending by distance; equal distances keep the lower row first.
pub(crate) fn by_distance_then_index(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// The `k` best of `scored`, sorted.
pub(crate) fn top_k(mut scored: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, by_distance_then_index);
        scored.truncate(k);
    }
    scored.sort_by(by_distance_then_index);
    scored
}
