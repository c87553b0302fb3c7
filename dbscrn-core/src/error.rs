//! Error types for dbscrn-core.

use thiserror::Error;

/// Result type alias for dbscrn operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for dbscrn operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Two coordinate vectors (or a point and the dataset) disagree on dimensionality.
    #[error("invalid dimension: expected {expected}, found {found}")]
    InvalidDimension { expected: usize, found: usize },

    /// A numeric parameter is outside its valid range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The dataset contains no points.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate {dimension} of point {id}")]
    NonFiniteCoordinate { id: String, dimension: usize },

    /// Two points share the same identifier.
    #[error("duplicate point id: {0}")]
    DuplicatePointId(String),

    /// Too few points for a computation that has no degraded answer.
    #[error("insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: usize, available: usize },

    /// Too few clusters for an internal quality metric.
    #[error("insufficient clusters: {required} required, {found} found")]
    InsufficientClusters { required: usize, found: usize },

    /// An external metric was requested but some point has no ground-truth label.
    #[error("ground-truth label missing for at least one point")]
    MissingGroundTruth,

    /// A neighbor relation references a point outside the dataset.
    ///
    /// This indicates a bug in neighbor-set construction, not bad input.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}
