//! Hierarchical (agglomerative) clustering.
//!
//! Start with one cluster per object and repeatedly merge the two closest
//! clusters, as measured by a [`ClusterDistance`], until the
//! [`TerminationCriterion`] says stop.
//!
//! Cluster distances live in a symmetric matrix over cluster *slots*. A
//! merge puts the union into the lower slot, retires the higher one and
//! recomputes the distances from the merged cluster to all survivors. Each
//! merge depends on the previous one, so merging is sequential.
//!
//! Ties between equally close pairs go to the lowest `(i, j)` slot pair.
//!
//! # Merge history
//!
//! Every merge is recorded SciPy-style: leaves are `0..n`, merge `m` creates
//! cluster `n + m`.

use super::linkage::ClusterDistance;
use super::result::{Cluster, ClusteringResult};
use super::termination::TerminationCriterion;
use super::traits::ClusterObject;
use crate::error::{Error, Result};
use ndarray::Array2;

/// One merge of the agglomeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// First cluster being merged (label).
    pub cluster_a: usize,
    /// Second cluster being merged (label).
    pub cluster_b: usize,
    /// Linkage distance at which the merge occurred.
    pub distance: f64,
    /// Size of the resulting cluster.
    pub size: usize,
}

/// Outcome of an agglomeration: the final clusters and how they came about.
#[derive(Debug, Clone)]
pub struct Agglomeration {
    result: ClusteringResult,
    merges: Vec<Merge>,
    n_items: usize,
}

impl Agglomeration {
    /// Final clusters, always hard.
    pub fn result(&self) -> &ClusteringResult {
        &self.result
    }

    /// Take the final clusters.
    pub fn into_result(self) -> ClusteringResult {
        self.result
    }

    /// Number of clustered objects.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges performed.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges, in order.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge distances (for plotting a dendrogram).
    pub fn distances(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}

/// Agglomerative clustering engine.
#[derive(Debug, Clone)]
pub struct Agglomerative {
    termination: TerminationCriterion,
}

impl Agglomerative {
    /// Engine stopping at `termination`.
    pub fn new(termination: TerminationCriterion) -> Self {
        Self { termination }
    }

    /// Cluster `objects` under `linkage`.
    pub fn fit<T, L>(&self, objects: &[T], linkage: &L) -> Result<Agglomeration>
    where
        T: ClusterObject,
        L: ClusterDistance<T> + ?Sized,
    {
        let n = objects.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let matrix = linkage.object_matrix();
        self.termination.validate(matrix)?;
        if let Some(m) = matrix {
            if m.nrows() != n {
                return Err(Error::Precondition(format!(
                    "cached linkage covers {} objects, got {n}",
                    m.nrows()
                )));
            }
        }

        let mut slots: Vec<Option<Cluster>> = (0..n).map(|i| Some(Cluster::singleton(i))).collect();
        let mut labels: Vec<usize> = (0..n).collect();
        let mut distances = Array2::from_elem((n, n), f64::INFINITY);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = linkage.cluster_distance(objects, &Cluster::singleton(i), &Cluster::singleton(j))?;
                distances[[i, j]] = d;
                distances[[j, i]] = d;
            }
        }

        let mut merges = Vec::new();
        let mut remaining = n;
        while remaining > 1 {
            let Some((i, j, d)) = closest_pair(&slots, &distances) else {
                break;
            };
            let (Some(a), Some(b)) = (&slots[i], &slots[j]) else {
                break;
            };
            if self.termination.should_stop(remaining, a, b, d, matrix)? {
                break;
            }
            let merged = a.union(b);
            log::debug!(
                "merge {} + {} at {d:.4} (size {})",
                labels[i],
                labels[j],
                merged.len()
            );
            merges.push(Merge {
                cluster_a: labels[i],
                cluster_b: labels[j],
                distance: d,
                size: merged.len(),
            });
            labels[i] = n + merges.len() - 1;
            slots[i] = Some(merged);
            slots[j] = None;
            remaining -= 1;

            for k in 0..n {
                distances[[j, k]] = f64::INFINITY;
                distances[[k, j]] = f64::INFINITY;
            }
            if let Some(merged) = &slots[i] {
                for k in 0..n {
                    if k == i {
                        continue;
                    }
                    if let Some(other) = &slots[k] {
                        let d = linkage.cluster_distance(objects, merged, other)?;
                        distances[[i, k]] = d;
                        distances[[k, i]] = d;
                    }
                }
            }
        }

        let clusters: Vec<Cluster> = slots.into_iter().flatten().collect();
        log::info!(
            "agglomerative clustering: {n} objects, {} merges, {} clusters",
            merges.len(),
            clusters.len()
        );
        Ok(Agglomeration {
            result: ClusteringResult::hard(clusters),
            merges,
            n_items: n,
        })
    }
}

/// Closest pair of live slots; ties keep the lowest `(i, j)`.
fn closest_pair(slots: &[Option<Cluster>], distances: &Array2<f64>) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..slots.len() {
        if slots[i].is_none() {
            continue;
        }
        for j in (i + 1)..slots.len() {
            if slots[j].is_none() {
                continue;
            }
            let d = distances[[i, j]];
            if best.map_or(true, |(_, _, b)| d < b) {
                best = Some((i, j, d));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{CachedLinkage, DirectLinkage, Linkage};
    use crate::parallel::WorkerPool;
    use proptest::prelude::*;

    struct Point([f64; 1]);

    impl ClusterObject for Point {
        fn coordinates(&self) -> Option<&[f64]> {
            Some(&self.0)
        }
    }

    fn points(xs: &[f64]) -> Vec<Point> {
        xs.iter().map(|&x| Point([x])).collect()
    }

    fn abs(a: &Point, b: &Point) -> Result<f64> {
        Ok((a.0[0] - b.0[0]).abs())
    }

    fn groups(result: &ClusteringResult) -> Vec<Vec<usize>> {
        let mut g: Vec<Vec<usize>> = result
            .clusters()
            .iter()
            .map(|c| c.objects().collect())
            .collect();
        g.sort();
        g
    }

    #[test]
    fn test_hierarchical_basic() {
        let objects = points(&[0.0, 1.0, 2.0, 10.0, 11.0]);
        let engine = Agglomerative::new(TerminationCriterion::NumberOfClusters(2));
        let out = engine
            .fit(&objects, &DirectLinkage::new(Linkage::Single, abs))
            .unwrap();
        assert_eq!(groups(out.result()), vec![vec![0, 1, 2], vec![3, 4]]);
        assert_eq!(out.n_merges(), 3);
        assert!(!out.result().is_fuzzy());
    }

    #[test]
    fn test_every_linkage_separates_groups() {
        let objects = points(&[0.0, 1.0, 2.0, 10.0, 11.0]);
        let pool = WorkerPool::sequential().unwrap();
        for linkage in [
            Linkage::Single,
            Linkage::Complete,
            Linkage::Average,
            Linkage::Centroid,
            Linkage::Ward,
        ] {
            let cached = CachedLinkage::new(linkage, &objects, &abs, &pool).unwrap();
            let out = Agglomerative::new(TerminationCriterion::NumberOfClusters(2))
                .fit(&objects, &cached)
                .unwrap();
            assert_eq!(
                groups(out.result()),
                vec![vec![0, 1, 2], vec![3, 4]],
                "{linkage:?}"
            );
        }
    }

    #[test]
    fn test_merge_history() {
        let objects = points(&[0.0, 1.0, 5.0]);
        let out = Agglomerative::new(TerminationCriterion::NumberOfClusters(1))
            .fit(&objects, &DirectLinkage::new(Linkage::Single, abs))
            .unwrap();
        let merges: Vec<Merge> = out.merges().copied().collect();
        assert_eq!(
            merges,
            vec![
                Merge {
                    cluster_a: 0,
                    cluster_b: 1,
                    distance: 1.0,
                    size: 2
                },
                Merge {
                    cluster_a: 3,
                    cluster_b: 2,
                    distance: 4.0,
                    size: 3
                },
            ]
        );
        assert_eq!(out.distances(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_ties_merge_lowest_pair_first() {
        let objects = points(&[0.0, 1.0, 2.0]);
        let out = Agglomerative::new(TerminationCriterion::NumberOfClusters(2))
            .fit(&objects, &DirectLinkage::new(Linkage::Single, abs))
            .unwrap();
        assert_eq!(groups(out.result()), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_variability_threshold_needs_cached_linkage() {
        let objects = points(&[0.0, 1.0]);
        let engine = Agglomerative::new(TerminationCriterion::DistanceVariabilityThreshold {
            k: 1.0,
            epsilon: 1e-9,
        });
        let err = engine
            .fit(&objects, &DirectLinkage::new(Linkage::Single, abs))
            .unwrap_err();
        assert_eq!(err, Error::RequiresCachedLinkage);
    }

    #[test]
    fn test_variability_threshold_stops_between_groups() {
        let objects = points(&[0.0, 1.0, 2.0, 10.0, 11.0]);
        let pool = WorkerPool::sequential().unwrap();
        let cached = CachedLinkage::new(Linkage::Single, &objects, &abs, &pool).unwrap();
        let out = Agglomerative::new(TerminationCriterion::DistanceVariabilityThreshold {
            k: 0.0,
            epsilon: 1e-9,
        })
        .fit(&objects, &cached)
        .unwrap();
        assert_eq!(groups(out.result()), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_empty_input() {
        let objects: Vec<Point> = Vec::new();
        let engine = Agglomerative::new(TerminationCriterion::NumberOfClusters(1));
        assert_eq!(
            engine
                .fit(&objects, &DirectLinkage::new(Linkage::Single, abs))
                .unwrap_err(),
            Error::EmptyInput
        );
    }

    proptest! {
        #[test]
        fn prop_number_of_clusters_partitions(
            xs in prop::collection::vec(-100.0f64..100.0, 1..20),
            k in 1usize..6,
        ) {
            let objects = points(&xs);
            let out = Agglomerative::new(TerminationCriterion::NumberOfClusters(k))
                .fit(&objects, &DirectLinkage::new(Linkage::Average, abs))
                .unwrap();
            let result = out.result();
            prop_assert_eq!(result.len(), k.min(xs.len()));
            let mut seen: Vec<usize> = result.clusters().iter().flat_map(|c| c.objects()).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..xs.len()).collect::<Vec<_>>());
            prop_assert!(out.distances().iter().all(|d| d.is_finite()));
        }
    }
}
