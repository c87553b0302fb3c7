//! Exhaustive DBSCAN.
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::time::Instant;

use dbscrn_core::{
    ClusteringOutcome, CountingMetric, Dataset, Error, Minkowski, Neighborhoods, PhaseTimings,
    Result, Shortfall,
};
use log::{debug, info, warn};

use crate::classify::core_points_by_eps;
use crate::eps::eps_neighborhoods;
use crate::expansion::{expand_clusters, NeighborRelation};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// DBSCAN parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DbscanConfig {
    /// Neighborhood radius; neighbors lie strictly closer than this.
    pub epsilon: f64,
    /// Density threshold, counting the point itself.
    pub min_points: usize,
    /// Minkowski power `m`.
    pub minkowski_power: f64,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self {
            epsilon: 2.0,
            min_points: 4,
            minkowski_power: 2.0,
        }
    }
}

impl DbscanConfig {
    /// Sets the neighborhood radius.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the density threshold.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Sets the Minkowski power.
    pub fn with_minkowski_power(mut self, power: f64) -> Self {
        self.minkowski_power = power;
        self
    }

    /// Checks `eps > 0`, `minPts >= 1` and `m > 0`.
    pub fn validate(&self) -> Result<Minkowski> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::invalid_parameter(
                "epsilon",
                format!("must be finite and positive, got {}", self.epsilon),
            ));
        }
        if self.min_points == 0 {
            return Err(Error::invalid_parameter("min_points", "must be at least 1"));
        }
        Minkowski::new(self.minkowski_power)
    }
}

/// DBSCAN over exhaustive eps-neighborhoods.
pub struct DbscanClustering {
    config: DbscanConfig,
}

impl DbscanClustering {
    pub fn new(config: DbscanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DbscanConfig {
        &self.config
    }

    /// Clusters `dataset`.
    ///
    /// Parameters are validated before any distance is computed. A dataset
    /// smaller than `minPts` is still clustered (everything ends up noise)
    /// and the outcome carries a [`Shortfall`].
    pub fn cluster(&self, dataset: &Dataset) -> Result<ClusteringOutcome> {
        let minkowski = self.config.validate()?;
        let n = dataset.len();
        let min_points = self.config.min_points;

        let shortfall = (n < min_points).then(|| {
            warn!("dataset has {n} points, fewer than min_points = {min_points}");
            Shortfall {
                required: min_points,
                available: n,
            }
        });

        let metric = CountingMetric::new(dataset, minkowski);
        let mut timings = PhaseTimings::default();

        let start = Instant::now();
        let neighborhoods = eps_neighborhoods(&metric, self.config.epsilon)?;
        timings.record("neighborhoods", start.elapsed());

        let start = Instant::now();
        let core = core_points_by_eps(&neighborhoods, min_points);
        timings.record("classification", start.elapsed());

        let start = Instant::now();
        let expansion = expand_clusters(NeighborRelation::EpsNeighborhood(&neighborhoods), &core)?;
        timings.record("expansion", start.elapsed());

        info!(
            "dbscan: {} clusters over {n} points (eps = {}, min_points = {min_points})",
            expansion.cluster_count, self.config.epsilon
        );
        debug!("dbscan phases: {timings:?}");

        Ok(ClusteringOutcome {
            assignments: expansion.assignments,
            point_types: expansion.point_types,
            distance_calculations: metric.into_counts(),
            neighborhoods: Neighborhoods::Eps(neighborhoods),
            cluster_count: expansion.cluster_count,
            shortfall,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbscrn_core::{Assignment, PointType};

    #[test]
    fn test_validation_fails_fast() {
        let dataset = Dataset::from_rows(vec![vec![0.0]]).unwrap();
        for config in [
            DbscanConfig::default().with_epsilon(0.0),
            DbscanConfig::default().with_epsilon(f64::NAN),
            DbscanConfig::default().with_min_points(0),
            DbscanConfig::default().with_minkowski_power(0.0),
        ] {
            let err = DbscanClustering::new(config).cluster(&dataset).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_shortfall_is_degraded_result() {
        let dataset = Dataset::from_rows(vec![vec![0.0], vec![0.5]]).unwrap();
        let outcome = DbscanClustering::new(DbscanConfig::default().with_min_points(5))
            .cluster(&dataset)
            .unwrap();
        assert_eq!(
            outcome.shortfall,
            Some(Shortfall {
                required: 5,
                available: 2
            })
        );
        assert_eq!(outcome.cluster_count, 0);
        assert!(outcome.assignments.iter().all(|a| *a == Assignment::Noise));
    }

    #[test]
    fn test_border_point() {
        // Dense run 0, 0.5, 1.0 plus 2.2: only reaches 1.0 within eps.
        let dataset =
            Dataset::from_rows(vec![vec![0.0], vec![0.5], vec![1.0], vec![2.2]]).unwrap();
        let config = DbscanConfig::default()
            .with_epsilon(1.3)
            .with_min_points(3);
        let outcome = DbscanClustering::new(config).cluster(&dataset).unwrap();

        assert_eq!(outcome.cluster_count, 1);
        assert_eq!(
            outcome.point_types,
            vec![PointType::Core, PointType::Core, PointType::Core, PointType::Border]
        );
        assert_eq!(outcome.labels(), vec![1, 1, 1, 1]);
        assert!(outcome.timings.get("expansion").is_some());
        assert_eq!(outcome.distance_calculations, vec![3, 3, 3, 3]);
    }
}
