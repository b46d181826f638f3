//! Merging per-row results of a batched query into one ranking.

use std::collections::HashSet;

use super::{BatchResults, Neighbor};

/// Merge `per_row` hit lists into at most `top_n` hits with distinct indices.
pub fn combine(per_row: &[Vec<Neighbor>], top_n: usize, mode: BatchResults) -> Vec<Neighbor> {
    match mode {
        BatchResults::Flatten => flatten(per_row, top_n),
        BatchResults::Diverse => diverse(per_row, top_n),
    }
}

/// Pool every hit, rank by distance and keep the first occurrence of each index.
///
/// The sort is stable over row-major scan order, so equal distances resolve
/// to the earlier row and rank.
pub fn flatten(per_row: &[Vec<Neighbor>], top_n: usize) -> Vec<Neighbor> {
    let mut pooled: Vec<Neighbor> = per_row.iter().flatten().copied().collect();
    pooled.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(top_n.min(pooled.len()));
    for hit in pooled {
        if merged.len() >= top_n {
            break;
        }
        if seen.insert(hit.index) {
            merged.push(hit);
        }
    }
    merged
}

/// Column-major round robin: every row's rank-0 hit, then every rank-1 hit, and so on.
///
/// Hits of one rank column are visited by ascending distance (row order on
/// ties), skipping indices already taken.
pub fn diverse(per_row: &[Vec<Neighbor>], top_n: usize) -> Vec<Neighbor> {
    let depth = per_row.iter().map(Vec::len).max().unwrap_or(0);
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(top_n);

    for rank in 0..depth {
        let mut column: Vec<Neighbor> = per_row
            .iter()
            .filter_map(|row| row.get(rank).copied())
            .collect();
        column.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        for hit in column {
            if merged.len() >= top_n {
                return merged;
            }
            if seen.insert(hit.index) {
                merged.push(hit);
            }
        }
    }
    merged.truncate(top_n);
    merged
}
