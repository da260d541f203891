//! Clusters and clustering results.
//!
//! A [`Cluster`] maps object indices to membership probabilities in
//! `(0, 1]`. Hard clusters only hold probability 1; a probability of zero
//! is never stored, the object is simply absent.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Objects with membership probabilities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    members: BTreeMap<usize, f64>,
}

impl Cluster {
    /// Empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard cluster holding one object.
    pub fn singleton(object: usize) -> Self {
        let mut members = BTreeMap::new();
        members.insert(object, 1.0);
        Self { members }
    }

    /// Hard cluster holding `objects`.
    pub fn hard<I: IntoIterator<Item = usize>>(objects: I) -> Self {
        Self {
            members: objects.into_iter().map(|o| (o, 1.0)).collect(),
        }
    }

    /// Set the membership of `object`; a probability `≤ 0` removes it.
    pub fn insert(&mut self, object: usize, probability: f64) -> Result<()> {
        if probability.is_nan() || probability > 1.0 {
            return Err(Error::InvalidParameter {
                name: "probability",
                message: format!("{probability} is not in [0, 1]"),
            });
        }
        if probability <= 0.0 {
            self.members.remove(&object);
        } else {
            self.members.insert(object, probability);
        }
        Ok(())
    }

    /// Membership probability, 0 for absent objects.
    pub fn probability(&self, object: usize) -> f64 {
        self.members.get(&object).copied().unwrap_or(0.0)
    }

    /// Whether `object` is a member.
    pub fn contains(&self, object: usize) -> bool {
        self.members.contains_key(&object)
    }

    /// Member objects, ascending.
    pub fn objects(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.keys().copied()
    }

    /// `(object, probability)` pairs, ascending by object.
    pub fn members(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.members.iter().map(|(&o, &p)| (o, p))
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Hard union of two clusters.
    pub fn union(&self, other: &Cluster) -> Cluster {
        Cluster::hard(self.objects().chain(other.objects()))
    }
}

/// Clusters produced by a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    clusters: Vec<Cluster>,
    fuzzy: bool,
}

impl ClusteringResult {
    /// Result of hard clusters.
    pub fn hard(clusters: Vec<Cluster>) -> Self {
        Self {
            clusters,
            fuzzy: false,
        }
    }

    /// Result of fuzzy clusters; an object may appear in several.
    pub fn fuzzy(clusters: Vec<Cluster>) -> Self {
        Self {
            clusters,
            fuzzy: true,
        }
    }

    /// The clusters.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Whether memberships are probabilities.
    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Every object goes to its most probable cluster with probability 1.
    ///
    /// Ties go to the lowest cluster index. Cluster indices are kept, so a
    /// cluster that loses all its objects stays as an empty cluster.
    pub fn hard_result(&self) -> ClusteringResult {
        if !self.fuzzy {
            return self.clone();
        }
        let mut best: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
        for (c, cluster) in self.clusters.iter().enumerate() {
            for (object, p) in cluster.members() {
                let entry = best.entry(object).or_insert((c, p));
                if p > entry.1 {
                    *entry = (c, p);
                }
            }
        }
        let mut clusters = vec![Cluster::new(); self.clusters.len()];
        for (object, (c, _)) in best {
            clusters[c].members.insert(object, 1.0);
        }
        ClusteringResult::hard(clusters)
    }

    /// Cluster index of every object, after hardening fuzzy results.
    pub fn assignment(&self) -> BTreeMap<usize, usize> {
        let hard = self.hard_result();
        let mut out = BTreeMap::new();
        for (c, cluster) in hard.clusters.iter().enumerate() {
            for object in cluster.objects() {
                out.insert(object, c);
            }
        }
        out
    }
}
