//! Random-projection forest for approximate nearest-neighbour search.
//!
//! Each tree recursively splits the candidate rows at the median of their
//! projection onto a random direction until leaves hold at most `leaf_size`
//! rows. A query descends every tree to one leaf; the union of those leaves is
//! then ranked exactly. If the union holds fewer than `k` rows the remaining
//! rows are scanned too, so a search never returns fewer hits than the exact
//! backend would.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::exact::top_k;
use super::{BackendKind, ForestParams, Matrix, Neighbor, SearchBackend, squared_l2};
use crate::errors::Error;

/// Recursion guard; median splits halve the rows so this is never reached in practice.
const MAX_DEPTH: usize = 48;

enum Node {
    Split {
        direction: Vec<f32>,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf(Vec<usize>),
}

struct RpTree {
    nodes: Vec<Node>,
    root: usize,
}

impl RpTree {
    fn build(candidates: &Matrix, leaf_size: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        let rows: Vec<usize> = (0..candidates.rows()).collect();
        let root = grow(&mut nodes, candidates, rows, leaf_size, rng, 0);
        RpTree { nodes, root }
    }

    fn leaf_for(&self, query: &[f32]) -> &[usize] {
        let mut node = self.root;
        loop {
            match &self.nodes[node] {
                Node::Leaf(rows) => return rows,
                Node::Split {
                    direction,
                    threshold,
                    left,
                    right,
                } => {
                    node = if dot(query, direction) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

fn grow(
    nodes: &mut Vec<Node>,
    candidates: &Matrix,
    rows: Vec<usize>,
    leaf_size: usize,
    rng: &mut StdRng,
    depth: usize,
) -> usize {
    if rows.len() <= leaf_size || depth >= MAX_DEPTH {
        nodes.push(Node::Leaf(rows));
        return nodes.len() - 1;
    }

    let direction: Vec<f32> = (0..candidates.dims())
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect();

    let mut projected: Vec<(f32, usize)> = rows
        .iter()
        .map(|&row| (dot(candidates.row(row), &direction), row))
        .collect();
    projected.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mid = projected.len() / 2;
    // Everything at or below the largest left-half projection descends left.
    let threshold = projected[mid - 1].0;
    let left_rows: Vec<usize> = projected[..mid].iter().map(|&(_, row)| row).collect();
    let right_rows: Vec<usize> = projected[mid..].iter().map(|&(_, row)| row).collect();

    let left = grow(nodes, candidates, left_rows, leaf_size, rng, depth + 1);
    let right = grow(nodes, candidates, right_rows, leaf_size, rng, depth + 1);
    nodes.push(Node::Split {
        direction,
        threshold,
        left,
        right,
    });
    nodes.len() - 1
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Approximate backend over a borrowed candidate matrix.
pub struct RpForest<'a> {
    candidates: &'a Matrix,
    trees: Vec<RpTree>,
}

impl<'a> RpForest<'a> {
    /// Build a forest over `candidates`.
    ///
    /// Projection directions come from a generator seeded with `params.seed`,
    /// so the same candidates always produce the same forest.
    ///
    /// # Errors
    ///
    /// Returns `Error::BackendUnavailable` for parameters or data the forest
    /// cannot index (no trees, empty leaves, zero-width or non-finite vectors).
    pub fn build(candidates: &'a Matrix, params: &ForestParams) -> Result<Self, Error> {
        if params.n_trees == 0 || params.leaf_size == 0 {
            return Err(Error::BackendUnavailable(format!(
                "invalid forest parameters: {params:?}"
            )));
        }
        if candidates.dims() == 0 {
            return Err(Error::BackendUnavailable(
                "cannot project zero-dimensional vectors".to_string(),
            ));
        }
        if candidates.as_slice().iter().any(|x| !x.is_finite()) {
            return Err(Error::BackendUnavailable(
                "candidate matrix contains NaN or infinite values".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| RpTree::build(candidates, params.leaf_size, &mut rng))
            .collect();

        Ok(RpForest { candidates, trees })
    }
}

impl SearchBackend for RpForest<'_> {
    fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut seen = vec![false; self.candidates.rows()];
        let mut scored = Vec::new();

        for tree in &self.trees {
            for &row in tree.leaf_for(query) {
                if !seen[row] {
                    seen[row] = true;
                    scored.push(Neighbor {
                        index: row,
                        distance: squared_l2(query, self.candidates.row(row)),
                    });
                }
            }
        }

        if scored.len() < k {
            for (row, visited) in seen.iter().enumerate() {
                if !visited {
                    scored.push(Neighbor {
                        index: row,
                        distance: squared_l2(query, self.candidates.row(row)),
                    });
                }
            }
        }

        top_k(scored, k)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Approximate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{BatchResults, Query, SearchEngine};

    fn random_matrix(rows: usize, dims: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let vectors: Vec<Vec<f32>> = (0..rows)
            .map(|_| (0..dims).map(|_| rng.random_range(-1.0f32..1.0)).collect())
            .collect();
        Matrix::from_rows(&vectors).unwrap()
    }

    #[test]
    fn test_forest_returns_k_valid_distinct_rows() {
        let matrix = random_matrix(4000, 16, 7);
        let forest = RpForest::build(&matrix, &ForestParams::default()).unwrap();
        let query = matrix.row(123).to_vec();

        let hits = forest.nearest(&query, 10);
        assert_eq!(hits.len(), 10);
        let mut indices: Vec<usize> = hits.iter().map(|hit| hit.index).collect();
        assert!(indices.iter().all(|&i| i < 4000));
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), 10);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_forest_finds_stored_point() {
        let matrix = random_matrix(3500, 8, 11);
        let forest = RpForest::build(&matrix, &ForestParams::default()).unwrap();
        let hits = forest.nearest(matrix.row(42), 1);
        assert_eq!(hits[0].index, 42);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_forest_tops_up_small_unions() {
        let matrix = random_matrix(200, 4, 3);
        let params = ForestParams {
            n_trees: 1,
            leaf_size: 4,
            seed: 1,
        };
        let forest = RpForest::build(&matrix, &params).unwrap();
        assert_eq!(forest.nearest(matrix.row(0), 50).len(), 50);
    }

    #[test]
    fn test_forest_is_deterministic() {
        let matrix = random_matrix(3000, 8, 5);
        let query = vec![0.1f32; 8];
        let first = RpForest::build(&matrix, &ForestParams::default())
            .unwrap()
            .nearest(&query, 5);
        let second = RpForest::build(&matrix, &ForestParams::default())
            .unwrap()
            .nearest(&query, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_forest_rejects_non_finite() {
        let matrix = Matrix::from_rows(&[vec![f32::NAN, 1.0], vec![0.0, 1.0]]).unwrap();
        let result = RpForest::build(&matrix, &ForestParams::default());
        assert!(matches!(result, Err(Error::BackendUnavailable(_))));
    }

    #[test]
    fn test_engine_uses_forest_above_threshold() {
        let engine = SearchEngine::new();
        assert_eq!(engine.backend_for(3000), BackendKind::Approximate);

        let matrix = random_matrix(3200, 8, 9);
        let hits = engine
            .search(Query::Single(matrix.row(7)), &matrix, 5, BatchResults::Flatten)
            .unwrap();
        assert_eq!(hits.len(), 5);
        assert!(hits.iter().all(|hit| hit.index < 3200));
    }

    #[test]
    fn test_engine_falls_back_when_forest_cannot_build() {
        let engine = SearchEngine::new();
        let mut vectors: Vec<Vec<f32>> = (0..3000).map(|i| vec![i as f32, 0.0]).collect();
        vectors[2999] = vec![f32::INFINITY, 0.0];
        let matrix = Matrix::from_rows(&vectors).unwrap();

        let hits = engine
            .search(Query::Single(&[10.0, 0.0]), &matrix, 3, BatchResults::Flatten)
            .unwrap();
        let indices: Vec<usize> = hits.iter().map(|hit| hit.index).collect();
        assert_eq!(indices, vec![10, 9, 11]);
    }
}
