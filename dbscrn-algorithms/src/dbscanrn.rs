//! DBSCANRN: density clustering over reverse k+NN sets.
//!
//! A point is core when at least `k` points count it among their k+NN.
//! Clusters grow along rk+NN, so the relation being traversed is the
//! inverted one, never the forward sets.
#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::time::Instant;

use dbscrn_core::{
    ClusteringOutcome, CountingMetric, Dataset, Error, Minkowski, Neighborhoods, PhaseTimings,
    Result, Shortfall,
};
use log::{debug, info, warn};

use crate::classify::core_points_by_reverse_knn;
use crate::expansion::{expand_clusters, NeighborRelation};
use crate::knn::{k_plus_nn_exhaustive, validate_knn_params, DEFAULT_TIE_TOLERANCE};
use crate::ti::{k_plus_nn_with_ordering, ReferenceOrdering, ReferencePoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How k+NN sets are computed. Both strategies yield identical sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeighborSearch {
    /// Rank every other point.
    #[default]
    Exhaustive,
    /// Reference-distance ordering with triangle-inequality pruning.
    TriangleInequality,
}

/// DBSCANRN parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DbscanRnConfig {
    /// Neighborhood size, counting the point itself.
    pub k: usize,
    /// Minkowski power `m`.
    pub minkowski_power: f64,
    /// Neighbor search strategy.
    pub search: NeighborSearch,
    /// Reference point for [`NeighborSearch::TriangleInequality`].
    pub reference: ReferencePoint,
    /// Distances within this of the (k-1)-th are tied with it.
    pub tie_tolerance: f64,
}

impl Default for DbscanRnConfig {
    fn default() -> Self {
        Self {
            k: 3,
            minkowski_power: 2.0,
            search: NeighborSearch::Exhaustive,
            reference: ReferencePoint::CoordinateMinimum,
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
        }
    }
}

impl DbscanRnConfig {
    /// Sets `k`.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the Minkowski power.
    pub fn with_minkowski_power(mut self, power: f64) -> Self {
        self.minkowski_power = power;
        self
    }

    /// Sets the neighbor search strategy.
    pub fn with_search(mut self, search: NeighborSearch) -> Self {
        self.search = search;
        self
    }

    /// Sets the reference point used by the triangle-inequality search.
    pub fn with_reference(mut self, reference: ReferencePoint) -> Self {
        self.reference = reference;
        self
    }

    /// Sets the tie tolerance.
    pub fn with_tie_tolerance(mut self, tolerance: f64) -> Self {
        self.tie_tolerance = tolerance;
        self
    }

    /// Checks `k >= 2`, `m > 0` (`m >= 1` for the triangle-inequality
    /// search) and the tie tolerance.
    pub fn validate(&self) -> Result<Minkowski> {
        validate_knn_params(self.k, self.tie_tolerance)?;
        let metric = Minkowski::new(self.minkowski_power)?;
        if self.search == NeighborSearch::TriangleInequality && metric.power() < 1.0 {
            return Err(Error::invalid_parameter(
                "minkowski_power",
                format!(
                    "triangle-inequality search needs a power of at least 1, got {}",
                    metric.power()
                ),
            ));
        }
        Ok(metric)
    }
}

/// DBSCANRN, exhaustive or triangle-inequality accelerated.
pub struct DbscanRnClustering {
    config: DbscanRnConfig,
}

impl DbscanRnClustering {
    pub fn new(config: DbscanRnConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DbscanRnConfig {
        &self.config
    }

    /// Clusters `dataset`.
    ///
    /// With fewer than `k` points every k+NN set holds all other points; the
    /// run completes and the outcome carries a [`Shortfall`].
    pub fn cluster(&self, dataset: &Dataset) -> Result<ClusteringOutcome> {
        let minkowski = self.config.validate()?;
        let n = dataset.len();
        let k = self.config.k;
        let tolerance = self.config.tie_tolerance;

        let shortfall = (n < k).then(|| {
            warn!("dataset has {n} points, fewer than k = {k}");
            Shortfall {
                required: k,
                available: n,
            }
        });

        let metric = CountingMetric::new(dataset, minkowski);
        let mut timings = PhaseTimings::default();

        let neighborhoods = match self.config.search {
            NeighborSearch::Exhaustive => {
                let start = Instant::now();
                let knn = k_plus_nn_exhaustive(&metric, k, tolerance)?;
                timings.record("neighborhoods", start.elapsed());
                knn
            }
            NeighborSearch::TriangleInequality => {
                let start = Instant::now();
                let reference = self.config.reference.resolve(dataset)?;
                let ordering = ReferenceOrdering::build(&metric, reference)?;
                timings.record("reference_distances", start.elapsed());

                let start = Instant::now();
                let knn = k_plus_nn_with_ordering(&metric, &ordering, k, tolerance)?;
                timings.record("neighborhoods", start.elapsed());
                knn
            }
        };

        let start = Instant::now();
        let core = core_points_by_reverse_knn(&neighborhoods, k);
        timings.record("classification", start.elapsed());

        let start = Instant::now();
        let expansion = expand_clusters(NeighborRelation::ReciprocalKnn(&neighborhoods), &core)?;
        timings.record("expansion", start.elapsed());

        info!(
            "dbscanrn ({:?}): {} clusters over {n} points (k = {k})",
            self.config.search, expansion.cluster_count
        );
        debug!("dbscanrn phases: {timings:?}");

        Ok(ClusteringOutcome {
            assignments: expansion.assignments,
            point_types: expansion.point_types,
            distance_calculations: metric.into_counts(),
            neighborhoods: Neighborhoods::Knn(neighborhoods),
            cluster_count: expansion.cluster_count,
            shortfall,
            timings,
        })
    }
}
