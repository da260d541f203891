//! When to stop merging.

use super::result::Cluster;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use ndarray::Array2;

/// Stopping rule of agglomerative clustering, checked before every merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationCriterion {
    /// Stop once `k` clusters remain.
    NumberOfClusters(usize),
    /// Stop when the two closest clusters are farther apart than the spread
    /// of their own objects allows.
    ///
    /// With `μ` and `σ` the mean and standard deviation of all pairwise
    /// object distances among the members of the two closest clusters,
    /// stop when their linkage distance exceeds `μ + k σ + epsilon`.
    /// Needs the object distance matrix of a cached linkage.
    DistanceVariabilityThreshold {
        /// Number of standard deviations.
        k: f64,
        /// Tolerance added to the threshold.
        epsilon: f64,
    },
}

impl TerminationCriterion {
    /// Variability threshold with the tolerance of `config`.
    pub fn variability(k: f64, config: &AnalysisConfig) -> Self {
        TerminationCriterion::DistanceVariabilityThreshold {
            k,
            epsilon: config.distance_epsilon,
        }
    }

    /// Check parameters and the availability of an object distance matrix.
    pub fn validate(&self, matrix: Option<&Array2<f64>>) -> Result<()> {
        match *self {
            TerminationCriterion::NumberOfClusters(0) => Err(Error::InvalidParameter {
                name: "k",
                message: "need at least one cluster".to_string(),
            }),
            TerminationCriterion::NumberOfClusters(_) => Ok(()),
            TerminationCriterion::DistanceVariabilityThreshold { k, epsilon } => {
                if !k.is_finite() || !epsilon.is_finite() || epsilon < 0.0 {
                    return Err(Error::InvalidParameter {
                        name: "k",
                        message: format!("invalid threshold k = {k}, epsilon = {epsilon}"),
                    });
                }
                if matrix.is_none() {
                    return Err(Error::RequiresCachedLinkage);
                }
                Ok(())
            }
        }
    }

    /// Whether to stop instead of merging `a` and `b` at `distance`.
    pub(crate) fn should_stop(
        &self,
        remaining: usize,
        a: &Cluster,
        b: &Cluster,
        distance: f64,
        matrix: Option<&Array2<f64>>,
    ) -> Result<bool> {
        match *self {
            TerminationCriterion::NumberOfClusters(k) => Ok(remaining <= k),
            TerminationCriterion::DistanceVariabilityThreshold { k, epsilon } => {
                let matrix = matrix.ok_or(Error::RequiresCachedLinkage)?;
                let members: Vec<usize> = a.objects().chain(b.objects()).collect();
                let mut values = Vec::new();
                for (x, &i) in members.iter().enumerate() {
                    for &j in &members[x + 1..] {
                        values.push(matrix[[i, j]]);
                    }
                }
                if values.is_empty() {
                    return Ok(false);
                }
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let threshold = mean + k * var.sqrt() + epsilon;
                log::trace!("variability threshold {threshold:.4}, closest distance {distance:.4}");
                Ok(distance > threshold)
            }
        }
    }
}
