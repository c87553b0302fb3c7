//! Triangle-inequality k+NN search for DBSCANRN-TI.
//!
//! Points are sorted by their distance to a single reference point `r`.
//! For any two points `a`, `b` the triangle inequality gives
//! `|d(r, a) - d(r, b)| <= d(a, b)`, so the gap between two positions in the
//! sorted order lower-bounds their real distance. Each point grows a window
//! outward from its own position and closes a side once its gap exceeds the
//! current (k-1)-th nearest distance. The triangle inequality only holds for
//! `m >= 1`, so smaller Minkowski powers are rejected.
//!
//! The search returns the same k+NN sets as [`crate::k_plus_nn_exhaustive`],
//! ties included; only the set of evaluated distances differs.

use dbscrn_core::{
    CountingMetric, Dataset, Error, KnnNeighborhoods, Neighbor, Result, SearchBounds,
};
use log::debug;
use rayon::prelude::*;

use crate::knn::{select_k_plus_nn, validate_knn_params};

/// Rounding allowance on the pruning bound, relative to the distances involved.
///
/// Computed distances carry an error proportional to their magnitude, so far
/// from the reference a fixed absolute tolerance can prune a tied candidate.
const RELATIVE_SLACK: f64 = 1e-12;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Choice of the reference point for the 1-D ordering.
///
/// Any fixed point gives correct results; the choice only affects how much
/// is pruned.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferencePoint {
    /// Coordinate-wise minimum over the dataset.
    #[default]
    CoordinateMinimum,
    /// The origin.
    Origin,
    /// An explicit point.
    Fixed(Vec<f64>),
}

impl ReferencePoint {
    /// Resolves the reference to concrete coordinates for `dataset`.
    ///
    /// # Errors
    /// [`Error::InvalidDimension`] if a fixed point has the wrong length.
    pub fn resolve(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        match self {
            Self::CoordinateMinimum => Ok(dataset.coordinate_minimum()),
            Self::Origin => Ok(vec![0.0; dataset.dimensions()]),
            Self::Fixed(coords) => {
                if coords.len() == dataset.dimensions() {
                    Ok(coords.clone())
                } else {
                    Err(Error::InvalidDimension {
                        expected: dataset.dimensions(),
                        found: coords.len(),
                    })
                }
            }
        }
    }
}

/// Points sorted by distance to the reference point.
///
/// Built completely before any per-point search starts and read-only after.
#[derive(Debug, Clone)]
pub struct ReferenceOrdering {
    reference: Vec<f64>,
    order: Vec<usize>,
    distances: Vec<f64>,
}

impl ReferenceOrdering {
    /// Computes the reference distance of every point and sorts by it.
    ///
    /// Equal reference distances are ordered by input index.
    ///
    /// # Errors
    /// [`Error::InvalidDimension`] if `reference` has the wrong length.
    pub fn build(metric: &CountingMetric<'_>, reference: Vec<f64>) -> Result<Self> {
        let n = metric.dataset().len();
        let mut pairs: Vec<(usize, f64)> = (0..n)
            .into_par_iter()
            .map(|i| -> Result<(usize, f64)> {
                Ok((i, metric.to_reference(i, &reference)?))
            })
            .collect::<Result<_>>()?;
        pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let (order, distances): (Vec<usize>, Vec<f64>) = pairs.into_iter().unzip();
        Ok(Self {
            reference,
            order,
            distances,
        })
    }

    /// The resolved reference point.
    pub fn reference(&self) -> &[f64] {
        &self.reference
    }

    /// Dataset indices in ascending reference distance.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Reference distances aligned with [`ReferenceOrdering::order`].
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Number of ordered points.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no points are ordered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Searches the k+NN of the point at sorted position `position`.
    fn search(
        &self,
        metric: &CountingMetric<'_>,
        position: usize,
        wanted: usize,
        tolerance: f64,
    ) -> Result<(Vec<Neighbor>, SearchBounds)> {
        let n = self.order.len();
        let point = self.order[position];
        let origin = self.distances[position];

        let mut left = position.checked_sub(1);
        let mut right = (position + 1 < n).then_some(position + 1);

        let mut candidates: Vec<Neighbor> = Vec::new();
        // Ascending; holds at most `wanted` distances.
        let mut nearest: Vec<f64> = Vec::with_capacity(wanted + 1);
        let mut bounds = SearchBounds::default();

        loop {
            // Next position: the side with the smaller gap, left on equal gaps.
            let (next, gap) = match (left, right) {
                (None, None) => break,
                (Some(l), None) => (l, origin - self.distances[l]),
                (None, Some(r)) => (r, self.distances[r] - origin),
                (Some(l), Some(r)) => {
                    let gap_left = origin - self.distances[l];
                    let gap_right = self.distances[r] - origin;
                    if gap_right < gap_left {
                        (r, gap_right)
                    } else {
                        (l, gap_left)
                    }
                }
            };

            let eps = (nearest.len() == wanted).then(|| nearest[wanted - 1]);
            if let Some(eps) = eps {
                let slack = RELATIVE_SLACK * (origin + self.distances[next] + eps);
                if gap > eps + tolerance + slack {
                    // Gaps only grow further out, so this side is done.
                    if next < position {
                        left = None;
                    } else {
                        right = None;
                    }
                    continue;
                }
            }

            let candidate = self.order[next];
            let distance = metric.between(point, candidate)?;
            if eps.is_none_or(|eps| distance <= eps + tolerance) {
                candidates.push(Neighbor {
                    index: candidate,
                    distance,
                });
                let at = nearest.partition_point(|&d| d <= distance);
                nearest.insert(at, distance);
                nearest.truncate(wanted);
                if nearest.len() == wanted && bounds.max_eps.is_none() {
                    bounds.max_eps = Some(nearest[wanted - 1]);
                }
            }

            if next < position {
                left = next.checked_sub(1);
            } else {
                right = (next + 1 < n).then_some(next + 1);
            }
        }

        if nearest.len() == wanted {
            bounds.min_eps = Some(nearest[wanted - 1]);
        }
        Ok((select_k_plus_nn(candidates, wanted, tolerance), bounds))
    }
}

/// Computes k+NN / rk+NN using the triangle-inequality pruned search.
///
/// The reference ordering is fully built first; per-point searches then run
/// in parallel, each reading only the ordering and the dataset.
///
/// # Errors
/// [`Error::InvalidParameter`] for `k < 2` or a bad tolerance,
/// [`Error::InvalidDimension`] for a reference of the wrong length.
pub fn k_plus_nn_triangle(
    metric: &CountingMetric<'_>,
    k: usize,
    tolerance: f64,
    reference: &ReferencePoint,
) -> Result<KnnNeighborhoods> {
    validate_knn_params(k, tolerance)?;
    let reference = reference.resolve(metric.dataset())?;
    let ordering = ReferenceOrdering::build(metric, reference)?;
    k_plus_nn_with_ordering(metric, &ordering, k, tolerance)
}

/// Same as [`k_plus_nn_triangle`], reusing an already built ordering.
///
/// # Errors
/// [`Error::InvalidParameter`] for `k < 2`, a bad tolerance or a Minkowski
/// power below 1, [`Error::InvariantViolation`] if the ordering does not
/// cover the dataset.
pub fn k_plus_nn_with_ordering(
    metric: &CountingMetric<'_>,
    ordering: &ReferenceOrdering,
    k: usize,
    tolerance: f64,
) -> Result<KnnNeighborhoods> {
    validate_knn_params(k, tolerance)?;
    let power = metric.metric().power();
    if power < 1.0 {
        return Err(Error::invalid_parameter(
            "minkowski_power",
            format!("triangle-inequality search needs a power of at least 1, got {power}"),
        ));
    }
    let n = metric.dataset().len();
    if ordering.len() != n {
        return Err(Error::InvariantViolation(format!(
            "reference ordering covers {} points, dataset has {n}",
            ordering.len()
        )));
    }
    let wanted = k - 1;
    let before = metric.counter().total();

    let searched: Vec<(Vec<Neighbor>, SearchBounds)> = (0..n)
        .into_par_iter()
        .map(|position| ordering.search(metric, position, wanted, tolerance))
        .collect::<Result<_>>()?;

    let mut forward = vec![Vec::new(); n];
    let mut bounds = vec![SearchBounds::default(); n];
    for (position, (neighbors, point_bounds)) in searched.into_iter().enumerate() {
        let point = ordering.order[position];
        forward[point] = neighbors;
        bounds[point] = point_bounds;
    }

    // Each evaluation bumps two counters.
    let evaluated = (metric.counter().total() - before) / 2;
    debug!(
        "triangle-inequality search evaluated {evaluated} of {} pairs",
        n * n.saturating_sub(1)
    );

    KnnNeighborhoods::from_forward(forward, Some(bounds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knn::{k_plus_nn_exhaustive, DEFAULT_TIE_TOLERANCE};
    use dbscrn_core::Minkowski;

    fn grid() -> Dataset {
        let mut rows = Vec::new();
        for x in 0..5 {
            for y in 0..4 {
                rows.push(vec![f64::from(x), f64::from(y)]);
            }
        }
        rows.push(vec![20.0, 20.0]);
        Dataset::from_rows(rows).unwrap()
    }

    #[test]
    fn test_reference_resolution() {
        let dataset = Dataset::from_rows(vec![vec![1.0, 5.0], vec![-3.0, 2.0]]).unwrap();
        assert_eq!(
            ReferencePoint::CoordinateMinimum.resolve(&dataset).unwrap(),
            vec![-3.0, 2.0]
        );
        assert_eq!(ReferencePoint::Origin.resolve(&dataset).unwrap(), vec![0.0, 0.0]);
        assert!(matches!(
            ReferencePoint::Fixed(vec![1.0]).resolve(&dataset),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_ordering_sorted() {
        let dataset = Dataset::from_rows(vec![vec![3.0], vec![1.0], vec![2.0], vec![1.0]]).unwrap();
        let metric = CountingMetric::new(&dataset, Minkowski::euclidean());
        let ordering = ReferenceOrdering::build(&metric, vec![0.0]).unwrap();
        assert_eq!(ordering.order(), &[1, 3, 2, 0]);
        assert_eq!(ordering.distances(), &[1.0, 1.0, 2.0, 3.0]);
        // One evaluation per point, charged to the point only.
        assert_eq!(metric.into_counts(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_matches_exhaustive_on_grid_with_ties() {
        let dataset = grid();
        for k in 2..7 {
            for reference in [
                ReferencePoint::CoordinateMinimum,
                ReferencePoint::Origin,
                ReferencePoint::Fixed(vec![2.5, -7.0]),
            ] {
                let exhaustive_metric = CountingMetric::new(&dataset, Minkowski::euclidean());
                let expected =
                    k_plus_nn_exhaustive(&exhaustive_metric, k, DEFAULT_TIE_TOLERANCE).unwrap();
                let ti_metric = CountingMetric::new(&dataset, Minkowski::euclidean());
                let actual =
                    k_plus_nn_triangle(&ti_metric, k, DEFAULT_TIE_TOLERANCE, &reference).unwrap();

                assert_eq!(actual.k_plus_nn, expected.k_plus_nn, "k = {k}, {reference:?}");
                assert_eq!(actual.reverse, expected.reverse, "k = {k}, {reference:?}");
            }
        }
    }

    #[test]
    fn test_prunes_distance_evaluations() {
        let rows: Vec<Vec<f64>> = (0..200).map(|i| vec![f64::from(i), 0.0]).collect();
        let dataset = Dataset::from_rows(rows).unwrap();

        let exhaustive = CountingMetric::new(&dataset, Minkowski::euclidean());
        k_plus_nn_exhaustive(&exhaustive, 4, DEFAULT_TIE_TOLERANCE).unwrap();
        let ti = CountingMetric::new(&dataset, Minkowski::euclidean());
        k_plus_nn_triangle(&ti, 4, DEFAULT_TIE_TOLERANCE, &ReferencePoint::CoordinateMinimum)
            .unwrap();

        assert!(ti.counter().total() * 10 < exhaustive.counter().total());
    }

    #[test]
    fn test_search_bounds() {
        let dataset = Dataset::from_rows(vec![vec![0.0], vec![1.0], vec![3.0], vec![6.0]]).unwrap();
        let metric = CountingMetric::new(&dataset, Minkowski::euclidean());
        let knn = k_plus_nn_triangle(&metric, 2, DEFAULT_TIE_TOLERANCE, &ReferencePoint::Origin)
            .unwrap();
        let bounds = knn.bounds.as_ref().unwrap();

        // Point 2 (x = 3): left neighbor at gap 2 is found first, then the
        // right one at gap 3 is pruned.
        assert_eq!(bounds[2].max_eps, Some(2.0));
        assert_eq!(bounds[2].min_eps, Some(2.0));
        assert_eq!(knn.forward_indices(2), vec![1]);
        for b in bounds {
            assert!(b.min_eps.unwrap() <= b.max_eps.unwrap());
        }
    }

    #[test]
    fn test_ties_far_from_reference() {
        // Both neighbors of point 1 lie at sqrt(0.02); the reference
        // distances around 7e6 carry more rounding error than the tolerance.
        let dataset = Dataset::from_rows(vec![
            vec![0.2, 0.3],
            vec![5_000_000.1, 5_000_000.0],
            vec![5_000_000.2, 5_000_000.1],
            vec![5_000_000.0, 5_000_000.1],
        ])
        .unwrap();
        for reference in [ReferencePoint::CoordinateMinimum, ReferencePoint::Origin] {
            let exhaustive_metric = CountingMetric::new(&dataset, Minkowski::euclidean());
            let expected =
                k_plus_nn_exhaustive(&exhaustive_metric, 2, DEFAULT_TIE_TOLERANCE).unwrap();
            let ti_metric = CountingMetric::new(&dataset, Minkowski::euclidean());
            let actual =
                k_plus_nn_triangle(&ti_metric, 2, DEFAULT_TIE_TOLERANCE, &reference).unwrap();

            assert_eq!(actual.k_plus_nn, expected.k_plus_nn, "{reference:?}");
            assert_eq!(actual.reverse, expected.reverse, "{reference:?}");
        }
    }

    #[test]
    fn test_rejects_power_below_one() {
        let dataset = grid();
        let metric = CountingMetric::new(&dataset, Minkowski::new(0.5).unwrap());
        let err = k_plus_nn_triangle(&metric, 3, DEFAULT_TIE_TOLERANCE, &ReferencePoint::Origin)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter {
                name: "minkowski_power",
                ..
            }
        ));
    }

    #[test]
    fn test_single_point() {
        let dataset = Dataset::from_rows(vec![vec![1.0, 1.0]]).unwrap();
        let metric = CountingMetric::new(&dataset, Minkowski::euclidean());
        let knn =
            k_plus_nn_triangle(&metric, 3, DEFAULT_TIE_TOLERANCE, &ReferencePoint::Origin).unwrap();
        assert!(knn.k_plus_nn[0].is_empty());
        assert_eq!(knn.bounds.unwrap()[0], SearchBounds::default());
    }
}
