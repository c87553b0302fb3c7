//! Clustering quality metrics.
//!
//! Purity and RAND compare against ground-truth labels; silhouette and
//! Davies-Bouldin only look at the geometry. None of them touch the
//! distance counters of a run.
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, HashMap};

use dbscrn_core::{Assignment, ClusteringOutcome, Dataset, Error, Label, Minkowski, Result};
use log::warn;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// RAND index with its pair counts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandIndex {
    /// `(tp + tn) / pairs`.
    pub value: f64,
    /// Pairs in the same cluster and the same ground-truth group.
    pub true_positives: u64,
    /// Pairs in different clusters and different ground-truth groups.
    pub true_negatives: u64,
    /// Unordered point pairs, `n * (n - 1) / 2`.
    pub pairs: u64,
}

/// All metrics a run could be scored with.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QualityReport {
    /// Purity, if ground truth is available.
    pub purity: Option<f64>,
    /// RAND index, if ground truth is available.
    pub rand: Option<RandIndex>,
    /// Silhouette coefficient, if requested and defined.
    pub silhouette: Option<f64>,
    /// Davies-Bouldin index, if defined.
    pub davies_bouldin: Option<f64>,
}

fn check_resolved(dataset: &Dataset, assignments: &[Assignment]) -> Result<()> {
    if assignments.len() != dataset.len() {
        return Err(Error::InvariantViolation(format!(
            "{} assignments for {} points",
            assignments.len(),
            dataset.len()
        )));
    }
    match assignments.iter().position(|a| !a.is_resolved()) {
        Some(index) => Err(Error::InvariantViolation(format!(
            "point {index} is still unassigned"
        ))),
        None => Ok(()),
    }
}

/// Groups point indices by cluster. Noise is one group, or one group per
/// noise point when `noise_as_singletons` is set.
fn groups(assignments: &[Assignment], noise_as_singletons: bool) -> Vec<Vec<usize>> {
    let mut clusters: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    let mut singletons = Vec::new();
    for (index, assignment) in assignments.iter().enumerate() {
        if noise_as_singletons && *assignment == Assignment::Noise {
            singletons.push(vec![index]);
        } else {
            clusters.entry(assignment.as_raw()).or_default().push(index);
        }
    }
    clusters.into_values().chain(singletons).collect()
}

fn pairs(count: u64) -> u64 {
    count * count.saturating_sub(1) / 2
}

/// Purity: for each ground-truth group, the largest overlap with any
/// discovered cluster (noise counts as one), summed and divided by `n`.
///
/// # Errors
/// [`Error::MissingGroundTruth`] if any point lacks a label.
pub fn purity(dataset: &Dataset, assignments: &[Assignment]) -> Result<f64> {
    check_resolved(dataset, assignments)?;
    let labels = dataset.labels()?;

    let mut overlap: HashMap<&Label, HashMap<i64, usize>> = HashMap::new();
    for (label, assignment) in labels.iter().zip(assignments) {
        *overlap
            .entry(*label)
            .or_default()
            .entry(assignment.as_raw())
            .or_default() += 1;
    }
    let best: usize = overlap
        .values()
        .map(|clusters| clusters.values().copied().max().unwrap_or(0))
        .sum();
    Ok(best as f64 / dataset.len() as f64)
}

/// RAND index over all unordered pairs.
///
/// # Errors
/// [`Error::MissingGroundTruth`] if any point lacks a label,
/// [`Error::InsufficientPoints`] for fewer than two points.
pub fn rand_index(dataset: &Dataset, assignments: &[Assignment]) -> Result<RandIndex> {
    check_resolved(dataset, assignments)?;
    let labels = dataset.labels()?;
    let n = dataset.len();
    if n < 2 {
        return Err(Error::InsufficientPoints {
            required: 2,
            available: n,
        });
    }

    let mut by_cluster: HashMap<i64, u64> = HashMap::new();
    let mut by_label: HashMap<&Label, u64> = HashMap::new();
    let mut by_both: HashMap<(i64, &Label), u64> = HashMap::new();
    for (label, assignment) in labels.iter().zip(assignments) {
        let cluster = assignment.as_raw();
        *by_cluster.entry(cluster).or_default() += 1;
        *by_label.entry(*label).or_default() += 1;
        *by_both.entry((cluster, *label)).or_default() += 1;
    }

    let total = pairs(n as u64);
    let same_cluster: u64 = by_cluster.values().map(|&c| pairs(c)).sum();
    let same_label: u64 = by_label.values().map(|&c| pairs(c)).sum();
    let true_positives: u64 = by_both.values().map(|&c| pairs(c)).sum();
    let true_negatives = total + true_positives - same_cluster - same_label;

    Ok(RandIndex {
        value: (true_positives + true_negatives) as f64 / total as f64,
        true_positives,
        true_negatives,
        pairs: total,
    })
}

/// Mean silhouette coefficient; noise points are singleton clusters.
///
/// A singleton has intra-cluster distance 0. O(n²) distance evaluations.
///
/// # Errors
/// [`Error::InsufficientClusters`] with fewer than two clusters.
pub fn silhouette_coefficient(
    dataset: &Dataset,
    assignments: &[Assignment],
    metric: Minkowski,
) -> Result<f64> {
    check_resolved(dataset, assignments)?;
    let groups = groups(assignments, true);
    if groups.len() < 2 {
        return Err(Error::InsufficientClusters {
            required: 2,
            found: groups.len(),
        });
    }
    let mut group_of = vec![0; dataset.len()];
    for (group, members) in groups.iter().enumerate() {
        for &index in members {
            group_of[index] = group;
        }
    }

    let scores: Vec<f64> = (0..dataset.len())
        .into_par_iter()
        .map(|i| -> Result<f64> {
            let mut sums = vec![0.0; groups.len()];
            for j in (0..dataset.len()).filter(|&j| j != i) {
                sums[group_of[j]] += metric.distance(dataset.coords(i), dataset.coords(j))?;
            }
            let own = group_of[i];
            let a = match groups[own].len() {
                1 => 0.0,
                size => sums[own] / (size - 1) as f64,
            };
            let b = groups
                .iter()
                .enumerate()
                .filter(|&(group, _)| group != own)
                .map(|(group, members)| sums[group] / members.len() as f64)
                .fold(f64::INFINITY, f64::min);
            let scale = a.max(b);
            Ok(if scale > 0.0 { (b - a) / scale } else { 0.0 })
        })
        .collect::<Result<_>>()?;

    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Davies-Bouldin index; noise forms one group.
///
/// Two groups with coinciding centroids make the index infinite.
///
/// # Errors
/// [`Error::InsufficientClusters`] with fewer than two groups.
pub fn davies_bouldin(
    dataset: &Dataset,
    assignments: &[Assignment],
    metric: Minkowski,
) -> Result<f64> {
    check_resolved(dataset, assignments)?;
    let groups = groups(assignments, false);
    if groups.len() < 2 {
        return Err(Error::InsufficientClusters {
            required: 2,
            found: groups.len(),
        });
    }

    let dimensions = dataset.dimensions();
    let mut centroids = Vec::with_capacity(groups.len());
    let mut sigmas = Vec::with_capacity(groups.len());
    for members in &groups {
        let mut centroid = vec![0.0; dimensions];
        for &index in members {
            for (c, &v) in centroid.iter_mut().zip(dataset.coords(index)) {
                *c += v;
            }
        }
        for c in &mut centroid {
            *c /= members.len() as f64;
        }
        let mut spread = 0.0;
        for &index in members {
            spread += metric.distance(&centroid, dataset.coords(index))?;
        }
        sigmas.push(spread / members.len() as f64);
        centroids.push(centroid);
    }

    let mut total = 0.0;
    for i in 0..groups.len() {
        let mut worst = f64::NEG_INFINITY;
        for j in (0..groups.len()).filter(|&j| j != i) {
            let separation = metric.distance(&centroids[i], &centroids[j])?;
            let ratio = if separation > 0.0 {
                (sigmas[i] + sigmas[j]) / separation
            } else {
                f64::INFINITY
            };
            worst = worst.max(ratio);
        }
        total += worst;
    }
    Ok(total / groups.len() as f64)
}

/// Scores a finished run.
///
/// Purity and RAND are computed only when every point carries ground truth.
/// Metrics that are undefined for this outcome (too few clusters) are left
/// out with a warning instead of failing the whole report.
///
/// # Errors
/// Propagates metric errors other than [`Error::InsufficientClusters`] and
/// [`Error::InsufficientPoints`].
pub fn evaluate_quality(
    dataset: &Dataset,
    outcome: &ClusteringOutcome,
    metric: Minkowski,
    include_silhouette: bool,
) -> Result<QualityReport> {
    let assignments = &outcome.assignments;
    let mut report = QualityReport::default();

    if dataset.has_ground_truth() {
        report.purity = Some(purity(dataset, assignments)?);
        report.rand = optional("rand", rand_index(dataset, assignments))?;
    }
    report.davies_bouldin = optional(
        "davies_bouldin",
        davies_bouldin(dataset, assignments, metric),
    )?;
    if include_silhouette {
        report.silhouette = optional(
            "silhouette",
            silhouette_coefficient(dataset, assignments, metric),
        )?;
    }
    Ok(report)
}

fn optional<T>(name: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ (Error::InsufficientClusters { .. } | Error::InsufficientPoints { .. })) => {
            warn!("{name} skipped: {err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
