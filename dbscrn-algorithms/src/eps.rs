//! Exhaustive eps-neighborhood search for DBSCAN.

use dbscrn_core::{CountingMetric, EpsNeighborhoods, Result};
use rayon::prelude::*;

/// Computes, for every point, all other points strictly closer than `eps`.
///
/// Each unordered pair is evaluated once; rows are computed in parallel and
/// merged in ascending index order, so every neighbor list is sorted.
/// A point at distance exactly `eps` is not a neighbor.
///
/// # Errors
/// Propagates metric errors (dimension mismatch).
pub fn eps_neighborhoods(metric: &CountingMetric<'_>, eps: f64) -> Result<EpsNeighborhoods> {
    let n = metric.dataset().len();

    // rows[i] holds the neighbors j > i of point i.
    let rows: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| -> Result<Vec<usize>> {
            let mut row = Vec::new();
            for j in (i + 1)..n {
                if metric.between(i, j)? < eps {
                    row.push(j);
                }
            }
            Ok(row)
        })
        .collect::<Result<_>>()?;

    let mut neighbors = vec![Vec::new(); n];
    for (i, row) in rows.into_iter().enumerate() {
        for j in row {
            neighbors[i].push(j);
            neighbors[j].push(i);
        }
    }

    Ok(EpsNeighborhoods { neighbors })
}
