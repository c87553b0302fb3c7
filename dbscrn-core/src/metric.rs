//! Minkowski metric with per-point evaluation counters.
#![allow(clippy::float_cmp, clippy::cast_possible_truncation)]

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::point::Dataset;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Generalized Minkowski distance `(Σ|a_i - b_i|^m)^(1/m)`.
///
/// `m = 2` is Euclidean, `m = 1` is Manhattan. True distances are always
/// returned (never squared), since triangle-inequality pruning relies on them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Minkowski {
    power: f64,
}

impl Default for Minkowski {
    fn default() -> Self {
        Self { power: 2.0 }
    }
}

impl Minkowski {
    /// Creates a metric of the given power.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] unless `power` is finite and positive.
    pub fn new(power: f64) -> Result<Self> {
        if !(power.is_finite() && power > 0.0) {
            return Err(Error::invalid_parameter(
                "minkowski_power",
                format!("must be a positive finite number, got {power}"),
            ));
        }
        Ok(Self { power })
    }

    /// Euclidean metric.
    pub fn euclidean() -> Self {
        Self { power: 2.0 }
    }

    /// Manhattan metric.
    pub fn manhattan() -> Self {
        Self { power: 1.0 }
    }

    /// Returns the power `m`.
    #[inline]
    pub fn power(&self) -> f64 {
        self.power
    }

    /// Distance between two coordinate vectors.
    ///
    /// # Errors
    /// [`Error::InvalidDimension`] if the vectors differ in length.
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> Result<f64> {
        if a.len() != b.len() {
            return Err(Error::InvalidDimension {
                expected: a.len(),
                found: b.len(),
            });
        }
        Ok(self.distance_unchecked(a, b))
    }

    #[inline]
    fn distance_unchecked(&self, a: &[f64], b: &[f64]) -> f64 {
        let diffs = a.iter().zip(b).map(|(x, y)| (x - y).abs());
        if self.power == 2.0 {
            diffs.map(|d| d * d).sum::<f64>().sqrt()
        } else if self.power == 1.0 {
            diffs.sum()
        } else {
            diffs.map(|d| d.powf(self.power)).sum::<f64>().powf(self.power.recip())
        }
    }
}

/// Per-point distance-evaluation counters.
///
/// Slots are atomic so parallel neighbor searches can record evaluations
/// for both endpoints. The counts are diagnostics only.
#[derive(Debug, Default)]
pub struct DistanceCounter {
    counts: Vec<AtomicU64>,
}

impl DistanceCounter {
    /// Creates `len` zeroed counters.
    pub fn new(len: usize) -> Self {
        Self {
            counts: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Adds one evaluation to the point at `index`.
    #[inline]
    pub fn increment(&self, index: usize) {
        self.counts[index].fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the count for the point at `index`.
    pub fn get(&self, index: usize) -> u64 {
        self.counts[index].load(Ordering::Relaxed)
    }

    /// Sum over all points.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Consumes the counter and returns plain counts.
    pub fn into_counts(self) -> Vec<u64> {
        self.counts.into_iter().map(AtomicU64::into_inner).collect()
    }
}

/// A metric bound to a dataset that records every evaluation.
#[derive(Debug)]
pub struct CountingMetric<'a> {
    dataset: &'a Dataset,
    metric: Minkowski,
    counter: DistanceCounter,
}

impl<'a> CountingMetric<'a> {
    /// Binds `metric` to `dataset` with fresh counters.
    pub fn new(dataset: &'a Dataset, metric: Minkowski) -> Self {
        Self {
            dataset,
            metric,
            counter: DistanceCounter::new(dataset.len()),
        }
    }

    /// Returns the bound dataset.
    #[inline]
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Returns the underlying metric.
    #[inline]
    pub fn metric(&self) -> Minkowski {
        self.metric
    }

    /// Distance between points `i` and `j`; counts one evaluation for each.
    ///
    /// # Errors
    /// [`Error::InvalidDimension`] if the two points disagree on dimensionality.
    #[inline]
    pub fn between(&self, i: usize, j: usize) -> Result<f64> {
        let distance = self
            .metric
            .distance(self.dataset.coords(i), self.dataset.coords(j))?;
        self.counter.increment(i);
        self.counter.increment(j);
        Ok(distance)
    }

    /// Distance between point `i` and an external reference; counts for `i` only.
    ///
    /// # Errors
    /// [`Error::InvalidDimension`] if `reference` has the wrong length.
    #[inline]
    pub fn to_reference(&self, i: usize, reference: &[f64]) -> Result<f64> {
        let distance = self.metric.distance(self.dataset.coords(i), reference)?;
        self.counter.increment(i);
        Ok(distance)
    }

    /// Returns the live counters.
    pub fn counter(&self) -> &DistanceCounter {
        &self.counter
    }

    /// Consumes the metric and returns the per-point counts.
    pub fn into_counts(self) -> Vec<u64> {
        self.counter.into_counts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_and_manhattan() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_relative_eq!(Minkowski::euclidean().distance(&a, &b).unwrap(), 5.0);
        assert_relative_eq!(Minkowski::manhattan().distance(&a, &b).unwrap(), 7.0);
    }

    #[test]
    fn test_general_power_matches_definition() {
        let metric = Minkowski::new(3.0).unwrap();
        let a = [1.0, -2.0, 0.5];
        let b = [-1.0, 1.0, 0.5];
        let expected = (2.0_f64.powi(3) + 3.0_f64.powi(3)).powf(1.0 / 3.0);
        assert_relative_eq!(metric.distance(&a, &b).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Minkowski::default().distance(&[0.0], &[0.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidDimension {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_invalid_power() {
        assert!(Minkowski::new(0.0).is_err());
        assert!(Minkowski::new(-1.0).is_err());
        assert!(Minkowski::new(f64::NAN).is_err());
        assert!(Minkowski::new(0.5).is_ok());
    }

    #[test]
    fn test_counting_metric() {
        let dataset =
            Dataset::from_rows(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
        let metric = CountingMetric::new(&dataset, Minkowski::euclidean());

        assert_relative_eq!(metric.between(0, 1).unwrap(), 1.0);
        assert_relative_eq!(metric.between(0, 2).unwrap(), 2.0);
        assert_relative_eq!(metric.to_reference(2, &[0.0, 0.0]).unwrap(), 2.0);
        assert!(metric.to_reference(2, &[0.0]).is_err());

        assert_eq!(metric.counter().total(), 5);
        assert_eq!(metric.into_counts(), vec![2, 1, 2]);
    }
}
