//! dbscrn-core: Core types for density-based clustering.
//!
//! This crate provides the point/dataset model, the Minkowski metric with
//! evaluation counters, and the types describing a clustering outcome.
//!

pub mod clustering;
pub mod error;
pub mod metric;
pub mod point;

pub use clustering::{
    Assignment, ClusteringOutcome, ClusteringStatistics, EpsNeighborhoods, KnnNeighborhoods,
    Neighbor, Neighborhoods, PhaseTimings, PointType, SearchBounds, Shortfall, NOISE, UNASSIGNED,
};
pub use error::{Error, Result};
pub use metric::{CountingMetric, DistanceCounter, Minkowski};
pub use point::{Dataset, Identifier, Label, Point, PointId};
