//! Point and dataset types.
//!
//! A [`Dataset`] is the arena every algorithm works on: points are stored
//! contiguously and referenced by their input index everywhere else.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier or ground-truth label: either an integer or free text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Identifier {
    /// Integer identifier.
    Int(i64),
    /// Textual identifier.
    Text(String),
}

/// Unique identifier of a point within a dataset.
pub type PointId = Identifier;

/// Ground-truth class of a point.
pub type Label = Identifier;

impl Identifier {
    /// Parses a token, preferring the integer form when it round-trips.
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        match trimmed.parse::<i64>() {
            Ok(value) if value.to_string() == trimmed => Self::Int(value),
            _ => Self::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for Identifier {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A single input point with immutable coordinates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// Identifier, unique within the dataset.
    pub id: PointId,
    /// Coordinates in real vector space.
    pub coords: Vec<f64>,
    /// Optional ground-truth class, only read by quality metrics.
    pub label: Option<Label>,
}

impl Point {
    /// Creates a point without a ground-truth label.
    pub fn new(id: impl Into<PointId>, coords: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            coords,
            label: None,
        }
    }

    /// Attaches a ground-truth label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the number of coordinates.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.coords.len()
    }
}

/// An ordered collection of points with a fixed dimensionality.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dataset {
    points: Vec<Point>,
    dimensions: usize,
}

impl Dataset {
    /// Builds a dataset, checking dimensionality and id uniqueness once.
    ///
    /// # Errors
    /// - [`Error::EmptyDataset`] if `points` is empty.
    /// - [`Error::InvalidDimension`] if the first point has no coordinates or
    ///   any point disagrees with the first one.
    /// - [`Error::NonFiniteCoordinate`] if a coordinate is NaN or infinite.
    /// - [`Error::DuplicatePointId`] if two points share an id.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        let first = points.first().ok_or(Error::EmptyDataset)?;
        let dimensions = first.dimensions();
        if dimensions == 0 {
            return Err(Error::InvalidDimension {
                expected: 1,
                found: 0,
            });
        }

        let mut seen = HashSet::with_capacity(points.len());
        for point in &points {
            if point.dimensions() != dimensions {
                return Err(Error::InvalidDimension {
                    expected: dimensions,
                    found: point.dimensions(),
                });
            }
            if let Some(dimension) = point.coords.iter().position(|c| !c.is_finite()) {
                return Err(Error::NonFiniteCoordinate {
                    id: point.id.to_string(),
                    dimension,
                });
            }
            if !seen.insert(&point.id) {
                return Err(Error::DuplicatePointId(point.id.to_string()));
            }
        }

        Ok(Self { points, dimensions })
    }

    /// Builds a dataset from raw coordinate rows, using row indices as ids.
    ///
    /// # Errors
    /// Same as [`Dataset::new`].
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::new(
            rows.into_iter()
                .enumerate()
                .map(|(idx, coords)| Point::new(idx, coords))
                .collect(),
        )
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the dataset has no points.
    ///
    /// Always false for a dataset built through [`Dataset::new`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the shared dimensionality.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns all points in input order.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the point at `index`.
    #[inline]
    pub fn point(&self, index: usize) -> &Point {
        &self.points[index]
    }

    /// Returns the coordinates of the point at `index`.
    #[inline]
    pub fn coords(&self, index: usize) -> &[f64] {
        &self.points[index].coords
    }

    /// Returns an iterator over the points.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Returns true if every point carries a ground-truth label.
    pub fn has_ground_truth(&self) -> bool {
        self.points.iter().all(|p| p.label.is_some())
    }

    /// Returns the ground-truth labels, or an error if any is missing.
    ///
    /// # Errors
    /// [`Error::MissingGroundTruth`] if any point has no label.
    pub fn labels(&self) -> Result<Vec<&Label>> {
        self.points
            .iter()
            .map(|p| p.label.as_ref().ok_or(Error::MissingGroundTruth))
            .collect()
    }

    /// Coordinate-wise minimum over all points.
    pub fn coordinate_minimum(&self) -> Vec<f64> {
        let mut minimum = vec![f64::INFINITY; self.dimensions];
        for point in &self.points {
            for (lo, &value) in minimum.iter_mut().zip(&point.coords) {
                *lo = lo.min(value);
            }
        }
        minimum
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
