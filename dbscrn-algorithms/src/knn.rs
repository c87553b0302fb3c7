//! Exhaustive k+NN / reverse k+NN search for DBSCANRN.

use dbscrn_core::{CountingMetric, Error, KnnNeighborhoods, Neighbor, Result};
use rayon::prelude::*;

/// Absolute tolerance under which two distances count as tied.
pub const DEFAULT_TIE_TOLERANCE: f64 = 1e-9;

/// Checks the `k` and tolerance parameters shared by both k+NN searches.
pub(crate) fn validate_knn_params(k: usize, tolerance: f64) -> Result<()> {
    if k < 2 {
        return Err(Error::invalid_parameter(
            "k",
            format!("must be at least 2, got {k}"),
        ));
    }
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        return Err(Error::invalid_parameter(
            "tie_tolerance",
            format!("must be finite and non-negative, got {tolerance}"),
        ));
    }
    Ok(())
}

/// Keeps the `wanted` nearest candidates plus every candidate tied with the
/// `wanted`-th one.
///
/// Candidates are ordered by distance, then index. A candidate is tied when
/// its distance exceeds the `wanted`-th distance by at most `tolerance`.
/// With fewer than `wanted` candidates, all of them are returned.
pub(crate) fn select_k_plus_nn(
    mut candidates: Vec<Neighbor>,
    wanted: usize,
    tolerance: f64,
) -> Vec<Neighbor> {
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.index.cmp(&b.index))
    });
    if wanted == 0 {
        candidates.clear();
        return candidates;
    }
    if candidates.len() <= wanted {
        return candidates;
    }

    let anchor = candidates[wanted - 1].distance;
    let ties = candidates[wanted..]
        .iter()
        .take_while(|c| c.distance - anchor <= tolerance)
        .count();
    candidates.truncate(wanted + ties);
    candidates
}

/// Computes k+NN for every point by ranking all other points, then inverts
/// the forward sets into rk+NN.
///
/// The point itself counts toward `k`, so `k - 1` neighbors are searched.
/// On datasets with fewer than `k` points every other point is returned.
///
/// # Errors
/// [`Error::InvalidParameter`] for `k < 2` or a bad tolerance; metric errors
/// are propagated.
pub fn k_plus_nn_exhaustive(
    metric: &CountingMetric<'_>,
    k: usize,
    tolerance: f64,
) -> Result<KnnNeighborhoods> {
    validate_knn_params(k, tolerance)?;
    let n = metric.dataset().len();
    let wanted = k - 1;

    let forward: Vec<Vec<Neighbor>> = (0..n)
        .into_par_iter()
        .map(|i| -> Result<Vec<Neighbor>> {
            let mut candidates = Vec::with_capacity(n.saturating_sub(1));
            for j in (0..n).filter(|&j| j != i) {
                candidates.push(Neighbor {
                    index: j,
                    distance: metric.between(i, j)?,
                });
            }
            Ok(select_k_plus_nn(candidates, wanted, tolerance))
        })
        .collect::<Result<_>>()?;

    KnnNeighborhoods::from_forward(forward, None)
}
