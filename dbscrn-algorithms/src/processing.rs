//! High-level entry point selecting an algorithm by name.

use std::fmt;
use std::str::FromStr;

use dbscrn_core::{ClusteringOutcome, Dataset, Error, Result};

use crate::knn::DEFAULT_TIE_TOLERANCE;
use crate::{
    DbscanClustering, DbscanConfig, DbscanRnClustering, DbscanRnConfig, NeighborSearch,
    ReferencePoint,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clustering algorithm variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClusteringAlgorithm {
    /// Exhaustive DBSCAN.
    Dbscan,
    /// DBSCANRN with exhaustive k+NN.
    DbscanRn,
    /// DBSCANRN with triangle-inequality k+NN.
    DbscanRnTi,
}

impl ClusteringAlgorithm {
    /// All variants, in declaration order.
    pub const ALL: [Self; 3] = [Self::Dbscan, Self::DbscanRn, Self::DbscanRnTi];

    /// Name used on the command line and in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dbscan => "dbscan",
            Self::DbscanRn => "dbscanrn",
            Self::DbscanRnTi => "dbscanrn_ti",
        }
    }
}

impl fmt::Display for ClusteringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::invalid_parameter(
                    "algorithm",
                    format!("unknown algorithm '{s}' (expected dbscan, dbscanrn or dbscanrn_ti)"),
                )
            })
    }
}

/// Parameters for every algorithm; each variant reads only its own.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlgorithmParams {
    /// DBSCAN radius.
    pub epsilon: f64,
    /// DBSCAN density threshold.
    pub min_points: usize,
    /// DBSCANRN neighborhood size.
    pub k: usize,
    /// Minkowski power shared by all variants.
    pub minkowski_power: f64,
    /// DBSCANRN tie tolerance.
    pub tie_tolerance: f64,
    /// DBSCANRN-TI reference point.
    pub reference: ReferencePoint,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        let dbscan = DbscanConfig::default();
        let dbscanrn = DbscanRnConfig::default();
        Self {
            epsilon: dbscan.epsilon,
            min_points: dbscan.min_points,
            k: dbscanrn.k,
            minkowski_power: dbscan.minkowski_power,
            tie_tolerance: DEFAULT_TIE_TOLERANCE,
            reference: dbscanrn.reference,
        }
    }
}

impl AlgorithmParams {
    /// DBSCAN view of these parameters.
    pub fn dbscan_config(&self) -> DbscanConfig {
        DbscanConfig {
            epsilon: self.epsilon,
            min_points: self.min_points,
            minkowski_power: self.minkowski_power,
        }
    }

    /// DBSCANRN view of these parameters.
    pub fn dbscanrn_config(&self, search: NeighborSearch) -> DbscanRnConfig {
        DbscanRnConfig {
            k: self.k,
            minkowski_power: self.minkowski_power,
            search,
            reference: self.reference.clone(),
            tie_tolerance: self.tie_tolerance,
        }
    }
}

/// Clusters `dataset` with the chosen algorithm.
///
/// # Errors
/// Propagates parameter validation and internal errors from the algorithm.
pub fn run_clustering(
    dataset: &Dataset,
    algorithm: ClusteringAlgorithm,
    params: &AlgorithmParams,
) -> Result<ClusteringOutcome> {
    match algorithm {
        ClusteringAlgorithm::Dbscan => {
            DbscanClustering::new(params.dbscan_config()).cluster(dataset)
        }
        ClusteringAlgorithm::DbscanRn => {
            DbscanRnClustering::new(params.dbscanrn_config(NeighborSearch::Exhaustive))
                .cluster(dataset)
        }
        ClusteringAlgorithm::DbscanRnTi => {
            DbscanRnClustering::new(params.dbscanrn_config(NeighborSearch::TriangleInequality))
                .cluster(dataset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names() {
        for algorithm in ClusteringAlgorithm::ALL {
            assert_eq!(algorithm.as_str().parse::<ClusteringAlgorithm>().unwrap(), algorithm);
        }
        assert_eq!(
            "DBSCANRN_TI".parse::<ClusteringAlgorithm>().unwrap(),
            ClusteringAlgorithm::DbscanRnTi
        );
        assert!(matches!(
            "optics".parse::<ClusteringAlgorithm>(),
            Err(Error::InvalidParameter {
                name: "algorithm",
                ..
            })
        ));
    }

    #[test]
    fn test_default_params() {
        let params = AlgorithmParams::default();
        assert!((params.epsilon - 2.0).abs() < f64::EPSILON);
        assert_eq!(params.min_points, 4);
        assert_eq!(params.k, 3);
        assert_eq!(params.reference, ReferencePoint::CoordinateMinimum);
    }

    #[test]
    fn test_rn_variants_agree() {
        let dataset = Dataset::from_rows(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![8.0, 8.0],
            vec![8.0, 9.0],
            vec![9.0, 8.0],
        ])
        .unwrap();
        let params = AlgorithmParams::default();
        let exhaustive = run_clustering(&dataset, ClusteringAlgorithm::DbscanRn, &params).unwrap();
        let ti = run_clustering(&dataset, ClusteringAlgorithm::DbscanRnTi, &params).unwrap();
        assert_eq!(exhaustive.assignments, ti.assignments);
        assert_eq!(exhaustive.point_types, ti.point_types);
    }
}
