// THEORY:
// The `neighbor_graph` module answers one question: which cells are close enough
// to pass activity to each other? It is a stateless utility, like a blob detector
// that only looks at one frame. Adjacency is computed once from the coordinates
// and then consulted for every frame of the labeling pass.
//
// Two cells are neighbors when their Euclidean distance is strictly below the
// distance threshold. A cell is never its own neighbor. Because the metric is
// symmetric, so is the resulting graph.

use crate::core_modules::activity::Positions;
use ndarray::Array2;

/// Cell index → sorted indices of its spatial neighbors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NeighborSets {
    neighbors: Vec<Vec<usize>>,
}

impl NeighborSets {
    pub fn of(&self, cell: usize) -> &[usize] {
        &self.neighbors[cell]
    }

    pub fn cells(&self) -> usize {
        self.neighbors.len()
    }

    pub fn are_neighbors(&self, a: usize, b: usize) -> bool {
        self.neighbors[a].binary_search(&b).is_ok()
    }

    /// Mean number of neighbors per cell.
    pub fn average_degree(&self) -> f64 {
        if self.neighbors.is_empty() {
            return 0.0;
        }
        let total: usize = self.neighbors.iter().map(Vec::len).sum();
        total as f64 / self.neighbors.len() as f64
    }
}

/// Full N×N Euclidean distance matrix.
pub fn distance_matrix(positions: &Positions) -> Array2<f64> {
    let n = positions.len();
    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let (xi, yi) = positions.point(i);
        for j in (i + 1)..n {
            let (xj, yj) = positions.point(j);
            let d = ((xi - xj).powi(2) + (yi - yj).powi(2)).sqrt();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}

/// Builds the neighbor sets for a distance threshold.
pub fn neighbor_sets(positions: &Positions, distance_threshold: f64) -> NeighborSets {
    let distances = distance_matrix(positions);
    let n = positions.len();
    let neighbors = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| j != i && distances[[i, j]] < distance_threshold)
                .collect()
        })
        .collect();
    NeighborSets { neighbors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_exclude_self_and_far_cells() {
        let positions = Positions::from_points(&[(0.0, 0.0), (3.0, 4.0), (100.0, 0.0)]);
        let graph = neighbor_sets(&positions, 5.5);
        assert_eq!(graph.of(0), &[1]);
        assert_eq!(graph.of(1), &[0]);
        assert!(graph.of(2).is_empty());
    }

    #[test]
    fn threshold_is_strict() {
        let positions = Positions::from_points(&[(0.0, 0.0), (3.0, 4.0)]);
        assert!(neighbor_sets(&positions, 5.0).of(0).is_empty());
    }

    #[test]
    fn graph_is_symmetric() {
        let points: Vec<(f64, f64)> = (0..12)
            .map(|i| ((i % 4) as f64 * 7.0, (i / 4) as f64 * 9.0))
            .collect();
        let graph = neighbor_sets(&Positions::from_points(&points), 10.0);
        for a in 0..graph.cells() {
            for &b in graph.of(a) {
                assert!(graph.are_neighbors(b, a), "{a} -> {b} not mirrored");
            }
        }
    }

    #[test]
    fn single_cell_has_no_neighbors() {
        let graph = neighbor_sets(&Positions::from_points(&[(1.0, 1.0)]), 50.0);
        assert_eq!(graph.cells(), 1);
        assert!(graph.of(0).is_empty());
        assert_eq!(graph.average_degree(), 0.0);
    }
}
