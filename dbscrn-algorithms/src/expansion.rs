//! Cluster-id propagation over the core-point graph.
#![allow(clippy::cast_possible_truncation)]

use dbscrn_core::{Assignment, EpsNeighborhoods, Error, KnnNeighborhoods, PointType, Result};

/// The neighbor relation clusters are propagated along, chosen once per run.
#[derive(Debug, Clone, Copy)]
pub enum NeighborRelation<'a> {
    /// DBSCAN: eps-neighborhoods.
    EpsNeighborhood(&'a EpsNeighborhoods),
    /// DBSCANRN: reverse k+NN sets.
    ReciprocalKnn(&'a KnnNeighborhoods),
}

impl NeighborRelation<'_> {
    /// Neighbors of `index` under this relation.
    #[inline]
    pub fn neighbors_of(&self, index: usize) -> &[usize] {
        match self {
            Self::EpsNeighborhood(eps) => eps.of(index),
            Self::ReciprocalKnn(knn) => knn.reverse_of(index),
        }
    }

    /// Number of points the relation covers.
    pub fn len(&self) -> usize {
        match self {
            Self::EpsNeighborhood(eps) => eps.len(),
            Self::ReciprocalKnn(knn) => knn.len(),
        }
    }

    /// True if the relation covers no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of the expansion phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Cluster id or noise per point.
    pub assignments: Vec<Assignment>,
    /// Core, border or noise per point.
    pub point_types: Vec<PointType>,
    /// Number of clusters opened.
    pub cluster_count: usize,
}

/// Propagates cluster ids from core points and labels the rest.
///
/// Core points are visited in ascending index. Each unassigned core point
/// opens the next cluster id, which then spreads breadth-first: unassigned
/// core neighbors join and are expanded further, unassigned non-core
/// neighbors join as border points without being expanded. Points still
/// unassigned afterwards take the cluster of their first core neighbor, or
/// become noise. A border point touching several clusters therefore stays
/// in the lowest-numbered one.
///
/// # Errors
/// [`Error::InvariantViolation`] if `core` and `relation` disagree in length
/// or a neighbor index is out of range.
pub fn expand_clusters(relation: NeighborRelation<'_>, core: &[bool]) -> Result<Expansion> {
    let n = core.len();
    if relation.len() != n {
        return Err(Error::InvariantViolation(format!(
            "neighbor relation covers {} points, classification covers {n}",
            relation.len()
        )));
    }

    let checked = |owner: usize| -> Result<&[usize]> {
        let neighbors = relation.neighbors_of(owner);
        match neighbors.iter().find(|&&q| q >= n) {
            Some(&bad) => Err(Error::InvariantViolation(format!(
                "point {owner} has neighbor {bad} outside 0..{n}"
            ))),
            None => Ok(neighbors),
        }
    };

    let mut assignments = vec![Assignment::Unassigned; n];
    let mut next_cluster: u32 = 1;
    let mut seeds: Vec<usize> = Vec::new();

    for start in 0..n {
        if !core[start] || assignments[start].is_resolved() {
            continue;
        }
        let cluster = Assignment::Cluster(next_cluster);
        next_cluster += 1;

        assignments[start] = cluster;
        seeds.clear();
        seeds.push(start);

        let mut i = 0;
        while i < seeds.len() {
            let current = seeds[i];
            i += 1;

            for &neighbor in checked(current)? {
                if assignments[neighbor].is_resolved() {
                    continue;
                }
                assignments[neighbor] = cluster;
                if core[neighbor] {
                    seeds.push(neighbor);
                }
            }
        }
    }

    // Leftovers are non-core: attach to the first core neighbor, if any.
    for p in 0..n {
        if assignments[p].is_resolved() {
            continue;
        }
        let attached = checked(p)?
            .iter()
            .find(|&&q| core[q])
            .map(|&q| assignments[q]);
        assignments[p] = match attached {
            Some(cluster @ Assignment::Cluster(_)) => cluster,
            _ => Assignment::Noise,
        };
    }

    let point_types = assignments
        .iter()
        .zip(core)
        .map(|(assignment, &is_core)| match (is_core, assignment) {
            (true, _) => PointType::Core,
            (false, Assignment::Cluster(_)) => PointType::Border,
            (false, _) => PointType::Noise,
        })
        .collect();

    Ok(Expansion {
        assignments,
        point_types,
        cluster_count: (next_cluster - 1) as usize,
    })
}
