//! dbscrn-algorithms: Density-based clustering algorithms.
//!
//! This crate provides:
//! - **DBSCAN** - eps-neighborhoods from exhaustive pairwise distances
//! - **DBSCANRN** - core points from reverse k+NN, exhaustive search
//! - **DBSCANRN-TI** - the same k+NN sets via a reference-distance ordering
//!   and triangle-inequality pruning
//! - Quality metrics: purity, RAND, silhouette, Davies-Bouldin
//!
#![warn(missing_docs)]

mod classify;
mod dbscan;
mod dbscanrn;
mod eps;
mod expansion;
mod knn;
mod processing;
pub mod quality;
mod ti;

pub use classify::{core_points_by_eps, core_points_by_reverse_knn};
pub use dbscan::{DbscanClustering, DbscanConfig};
pub use dbscanrn::{DbscanRnClustering, DbscanRnConfig, NeighborSearch};
pub use eps::eps_neighborhoods;
pub use expansion::{expand_clusters, Expansion, NeighborRelation};
pub use knn::{k_plus_nn_exhaustive, DEFAULT_TIE_TOLERANCE};
pub use processing::{run_clustering, AlgorithmParams, ClusteringAlgorithm};
pub use quality::{evaluate_quality, QualityReport, RandIndex};
pub use ti::{k_plus_nn_triangle, k_plus_nn_with_ordering, ReferenceOrdering, ReferencePoint};

// Re-export core outcome types
pub use dbscrn_core::{ClusteringOutcome, ClusteringStatistics};
