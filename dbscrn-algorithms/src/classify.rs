//! Core-point classification from neighbor-set cardinalities.

use dbscrn_core::{EpsNeighborhoods, KnnNeighborhoods};

/// DBSCAN core test: `|eps-neighborhood(p)| >= minPts - 1`.
///
/// The point itself counts toward `minPts` but is not stored in its own
/// neighborhood, hence the `- 1`.
pub fn core_points_by_eps(neighborhoods: &EpsNeighborhoods, min_points: usize) -> Vec<bool> {
    let threshold = min_points.saturating_sub(1);
    neighborhoods
        .neighbors
        .iter()
        .map(|neighbors| neighbors.len() >= threshold)
        .collect()
}

/// DBSCANRN core test: `|rk+NN(p)| >= k`.
pub fn core_points_by_reverse_knn(neighborhoods: &KnnNeighborhoods, k: usize) -> Vec<bool> {
    neighborhoods
        .reverse
        .iter()
        .map(|reverse| reverse.len() >= k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbscrn_core::Neighbor;

    #[test]
    fn test_eps_threshold_excludes_self() {
        let eps = EpsNeighborhoods {
            neighbors: vec![vec![1, 2], vec![0], vec![0], vec![]],
        };
        assert_eq!(core_points_by_eps(&eps, 3), vec![true, false, false, false]);
        assert_eq!(core_points_by_eps(&eps, 2), vec![true, true, true, false]);
        // minPts = 1: every point is its own cluster seed.
        assert_eq!(core_points_by_eps(&eps, 1), vec![true; 4]);
    }

    #[test]
    fn test_reverse_knn_threshold() {
        let n = |index| Neighbor {
            index,
            distance: 1.0,
        };
        let knn = KnnNeighborhoods::from_forward(
            vec![vec![n(1), n(2)], vec![n(0), n(2)], vec![n(0), n(1)], vec![n(2), n(1)]],
            None,
        )
        .unwrap();
        // |rk+NN| = 2, 3, 3, 0
        assert_eq!(core_points_by_reverse_knn(&knn, 3), vec![false, true, true, false]);
        assert_eq!(core_points_by_reverse_knn(&knn, 2), vec![true, true, true, false]);
    }
}
