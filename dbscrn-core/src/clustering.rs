//! Clustering output types.
//!
//! Clusters have no storage of their own: a cluster is the set of points
//! whose [`Assignment`] carries its id.
#![allow(clippy::cast_precision_loss)]

use std::time::Duration;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Raw value written for noise points in flat label vectors.
pub const NOISE: i64 = -1;

/// Raw value written for points not yet assigned.
pub const UNASSIGNED: i64 = 0;

/// Cluster membership of a single point.
///
/// Transitions only `Unassigned -> Cluster | Noise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Assignment {
    /// Not yet visited by the expansion engine.
    #[default]
    Unassigned,
    /// Member of the cluster with this id (ids start at 1).
    Cluster(u32),
    /// Belongs to no cluster.
    Noise,
}

impl Assignment {
    /// Flat encoding: cluster id, [`NOISE`] or [`UNASSIGNED`].
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Unassigned => UNASSIGNED,
            Self::Cluster(id) => i64::from(id),
            Self::Noise => NOISE,
        }
    }

    /// Returns the cluster id, if any.
    pub fn cluster_id(self) -> Option<u32> {
        match self {
            Self::Cluster(id) => Some(id),
            _ => None,
        }
    }

    /// True once the point has reached a terminal state.
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Unassigned)
    }
}

/// Role of a point in the density model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointType {
    /// Not classified yet.
    #[default]
    Unclassified,
    /// Meets the density threshold.
    Core,
    /// Non-core point attached to a cluster.
    Border,
    /// Non-core point attached to no cluster.
    Noise,
}

impl PointType {
    /// Flat encoding used in reports: 1 core, 0 border, -1 noise.
    pub fn as_raw(self) -> Option<i8> {
        match self {
            Self::Core => Some(1),
            Self::Border => Some(0),
            Self::Noise => Some(-1),
            Self::Unclassified => None,
        }
    }
}

/// Eps-neighborhoods: for each point, the indices of all other points
/// strictly closer than `eps`, in ascending index order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpsNeighborhoods {
    /// Neighbor indices per point.
    pub neighbors: Vec<Vec<usize>>,
}

impl EpsNeighborhoods {
    /// Returns the neighbors of point `index`.
    #[inline]
    pub fn of(&self, index: usize) -> &[usize] {
        &self.neighbors[index]
    }

    /// Returns the number of points covered.
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Returns true if no points are covered.
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

/// Search bounds recorded by the triangle-inequality search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchBounds {
    /// Tightest confirmed (k-1)-th neighbor distance.
    pub min_eps: Option<f64>,
    /// Bound in use when k-1 candidates were first collected.
    pub max_eps: Option<f64>,
}

/// One entry of a k+NN list.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Neighbor {
    /// Index of the neighbor in the dataset.
    pub index: usize,
    /// Realized distance to the neighbor.
    pub distance: f64,
}

/// Forward k+NN and reverse rk+NN sets.
///
/// `k_plus_nn[p]` is ordered by ascending distance (index breaks ties) and
/// excludes `p` itself. `reverse[p]` lists every `q` with `p ∈ k+NN(q)`, in
/// ascending `q`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KnnNeighborhoods {
    /// Forward k+NN per point.
    pub k_plus_nn: Vec<Vec<Neighbor>>,
    /// Reverse k+NN per point.
    pub reverse: Vec<Vec<usize>>,
    /// Per-point search bounds; only filled by the triangle-inequality search.
    pub bounds: Option<Vec<SearchBounds>>,
}

impl KnnNeighborhoods {
    /// Builds reverse sets by inverting the forward sets over all points.
    ///
    /// # Errors
    /// [`Error::InvariantViolation`] if a forward set references an index
    /// outside the point range.
    pub fn from_forward(
        k_plus_nn: Vec<Vec<Neighbor>>,
        bounds: Option<Vec<SearchBounds>>,
    ) -> Result<Self> {
        let n = k_plus_nn.len();
        let mut reverse = vec![Vec::new(); n];
        for (owner, neighbors) in k_plus_nn.iter().enumerate() {
            for neighbor in neighbors {
                reverse
                    .get_mut(neighbor.index)
                    .ok_or_else(|| {
                        Error::InvariantViolation(format!(
                            "k+NN of point {owner} references index {} (n = {n})",
                            neighbor.index
                        ))
                    })?
                    .push(owner);
            }
        }
        Ok(Self {
            k_plus_nn,
            reverse,
            bounds,
        })
    }

    /// Indices of the forward k+NN of `index`.
    pub fn forward_indices(&self, index: usize) -> Vec<usize> {
        self.k_plus_nn[index].iter().map(|n| n.index).collect()
    }

    /// Reverse k+NN of `index`.
    #[inline]
    pub fn reverse_of(&self, index: usize) -> &[usize] {
        &self.reverse[index]
    }

    /// Returns the number of points covered.
    pub fn len(&self) -> usize {
        self.k_plus_nn.len()
    }

    /// Returns true if no points are covered.
    pub fn is_empty(&self) -> bool {
        self.k_plus_nn.is_empty()
    }
}

/// Neighbor sets produced by a run, kept for diagnostics and reports.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Neighborhoods {
    /// DBSCAN eps-neighborhoods.
    Eps(EpsNeighborhoods),
    /// DBSCANRN k+NN and rk+NN sets.
    Knn(KnnNeighborhoods),
}

/// Reported when the dataset is smaller than the density parameter.
///
/// The run still completes; it is just unable to satisfy the parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shortfall {
    /// Points the parameter asks for (`k` or `minPts`).
    pub required: usize,
    /// Points in the dataset.
    pub available: usize,
}

/// Wall-clock duration of each phase of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseTimings {
    phases: Vec<(String, Duration)>,
}

impl PhaseTimings {
    /// Records a phase.
    pub fn record(&mut self, phase: impl Into<String>, elapsed: Duration) {
        self.phases.push((phase.into(), elapsed));
    }

    /// Iterates over recorded phases.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.phases.iter().map(|(name, d)| (name.as_str(), *d))
    }

    /// Looks up a phase by name.
    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(name, _)| name == phase)
            .map(|(_, d)| *d)
    }

    /// Sum of all phases.
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, d)| *d).sum()
    }
}

/// Complete result of a clustering run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringOutcome {
    /// Final membership per point; never `Unassigned`.
    pub assignments: Vec<Assignment>,
    /// Final role per point; never `Unclassified`.
    pub point_types: Vec<PointType>,
    /// Distance evaluations recorded per point.
    pub distance_calculations: Vec<u64>,
    /// Neighbor sets the run was based on.
    pub neighborhoods: Neighborhoods,
    /// Number of clusters discovered; ids are `1..=cluster_count`.
    pub cluster_count: usize,
    /// Set when the dataset is smaller than `k`/`minPts`.
    pub shortfall: Option<Shortfall>,
    /// Phase durations.
    pub timings: PhaseTimings,
}

impl ClusteringOutcome {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// True if the outcome covers no points.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Flat labels: cluster id, or [`NOISE`].
    pub fn labels(&self) -> Vec<i64> {
        self.assignments.iter().map(|a| a.as_raw()).collect()
    }

    /// Search bounds, present for triangle-inequality runs only.
    pub fn search_bounds(&self) -> Option<&[SearchBounds]> {
        match &self.neighborhoods {
            Neighborhoods::Knn(knn) => knn.bounds.as_deref(),
            Neighborhoods::Eps(_) => None,
        }
    }

    /// Summary counts.
    pub fn statistics(&self) -> ClusteringStatistics {
        ClusteringStatistics::from_outcome(self)
    }
}

/// Summary counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusteringStatistics {
    /// Number of clusters.
    pub clusters: usize,
    /// Number of core points.
    pub core_points: usize,
    /// Number of border points.
    pub border_points: usize,
    /// Number of noise points.
    pub noise_points: usize,
    /// Mean distance evaluations per point.
    pub avg_distance_calculations: f64,
}

impl ClusteringStatistics {
    /// Computes statistics from a finished outcome.
    pub fn from_outcome(outcome: &ClusteringOutcome) -> Self {
        let count = |kind: PointType| outcome.point_types.iter().filter(|&&t| t == kind).count();
        let total: u64 = outcome.distance_calculations.iter().sum();
        let avg_distance_calculations = if outcome.is_empty() {
            0.0
        } else {
            total as f64 / outcome.len() as f64
        };
        Self {
            clusters: outcome.cluster_count,
            core_points: count(PointType::Core),
            border_points: count(PointType::Border),
            noise_points: count(PointType::Noise),
            avg_distance_calculations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbor(index: usize, distance: f64) -> Neighbor {
        Neighbor { index, distance }
    }

    #[test]
    fn test_assignment_encoding() {
        assert_eq!(Assignment::Cluster(3).as_raw(), 3);
        assert_eq!(Assignment::Noise.as_raw(), NOISE);
        assert_eq!(Assignment::Unassigned.as_raw(), UNASSIGNED);
        assert_eq!(Assignment::Cluster(2).cluster_id(), Some(2));
        assert!(!Assignment::Unassigned.is_resolved());
        assert!(Assignment::Noise.is_resolved());
    }

    #[test]
    fn test_reverse_is_inverted_not_mirrored() {
        // 0 -> {1}, 1 -> {0}, 2 -> {1}: 2 is nobody's neighbor.
        let forward = vec![
            vec![neighbor(1, 1.0)],
            vec![neighbor(0, 1.0)],
            vec![neighbor(1, 2.0)],
        ];
        let knn = KnnNeighborhoods::from_forward(forward, None).unwrap();
        assert_eq!(knn.reverse_of(0), &[1]);
        assert_eq!(knn.reverse_of(1), &[0, 2]);
        assert!(knn.reverse_of(2).is_empty());
        assert_eq!(knn.forward_indices(2), vec![1]);
    }

    #[test]
    fn test_reverse_out_of_range() {
        let forward = vec![vec![neighbor(5, 1.0)]];
        let err = KnnNeighborhoods::from_forward(forward, None).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_statistics() {
        let outcome = ClusteringOutcome {
            assignments: vec![
                Assignment::Cluster(1),
                Assignment::Cluster(1),
                Assignment::Noise,
            ],
            point_types: vec![PointType::Core, PointType::Border, PointType::Noise],
            distance_calculations: vec![2, 2, 2],
            neighborhoods: Neighborhoods::Eps(EpsNeighborhoods::default()),
            cluster_count: 1,
            shortfall: None,
            timings: PhaseTimings::default(),
        };
        let stats = outcome.statistics();
        assert_eq!(stats.clusters, 1);
        assert_eq!(stats.core_points, 1);
        assert_eq!(stats.border_points, 1);
        assert_eq!(stats.noise_points, 1);
        assert!((stats.avg_distance_calculations - 2.0).abs() < f64::EPSILON);
        assert_eq!(outcome.labels(), vec![1, 1, NOISE]);
        assert!(outcome.search_bounds().is_none());
    }

    #[test]
    fn test_phase_timings() {
        let mut timings = PhaseTimings::default();
        timings.record("neighborhoods", Duration::from_millis(3));
        timings.record("expansion", Duration::from_millis(2));
        assert_eq!(timings.get("expansion"), Some(Duration::from_millis(2)));
        assert_eq!(timings.total(), Duration::from_millis(5));
        assert_eq!(timings.iter().count(), 2);
    }
}
