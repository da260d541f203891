//! Least-squares cross-validation for Gaussian kernels on geographic distance.
//!
//! With the 2-D normal density `φ_σ(r) = exp(-r²/2σ²) / (2πσ²)`, weights
//! `wᵢ` of a variant and their total `W`, the integrated squared error
//! criterion has a closed form:
//!
//! ```text
//! LSCV(h) = 1/W² Σᵢ Σⱼ wᵢ wⱼ φ_{√2 h}(rᵢⱼ)
//!         - 2/W Σᵢ wᵢ Σ_{j≠i} wⱼ φ_h(rᵢⱼ) / (W - wᵢ)
//! ```
//!
//! The second term is the proper leave-one-out estimate. The bandwidth
//! minimizing the sum over variants wins.

use super::{search_candidates, Bandwidth, BandwidthEstimator, EstimatorKind, Objective};
use crate::config::AnalysisConfig;
use crate::distance::DistanceId;
use crate::error::{Error, Result};
use crate::kernel::{KernelFamily, KernelKind};
use crate::parallel::WorkerPool;
use crate::survey::VariantId;
use crate::weights::VariantWeights;
use core::f64::consts::PI;
use ndarray::Array2;
use std::sync::Arc;

/// Least-squares cross-validation bandwidth estimator.
#[derive(Debug, Clone)]
pub struct LeastSquaresCrossValidation {
    early_exit_window: usize,
}

/// Weights and pairwise distances of one variant's occurrences.
struct VariantSample {
    weights: Vec<f64>,
    total: f64,
    distances: Array2<f64>,
}

impl VariantSample {
    fn score(&self, h: f64) -> f64 {
        let n = self.weights.len();
        if n == 0 || self.total <= 0.0 {
            return 0.0;
        }
        let wide = 2.0 * h * h;
        let mut integral = 0.0;
        let mut leave_one_out = 0.0;
        for i in 0..n {
            let wi = self.weights[i];
            let mut neighbours = 0.0;
            for j in 0..n {
                let r2 = self.distances[[i, j]].powi(2);
                integral += wi * self.weights[j] * normal_2d(r2, wide);
                if i != j {
                    neighbours += self.weights[j] * normal_2d(r2, h * h);
                }
            }
            let rest = self.total - wi;
            if rest > 0.0 {
                leave_one_out += wi * neighbours / rest;
            }
        }
        integral / (self.total * self.total) - 2.0 * leave_one_out / self.total
    }
}

/// `φ_σ(r)` from `r²` and `σ²`.
#[inline]
fn normal_2d(r2: f64, sigma2: f64) -> f64 {
    (-r2 / (2.0 * sigma2)).exp() / (2.0 * PI * sigma2)
}

impl LeastSquaresCrossValidation {
    /// Estimator with the early-exit window of `config`.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            early_exit_window: config.early_exit_window,
        }
    }

    fn check_family(family: &KernelFamily) -> Result<()> {
        if family.kind() != KernelKind::Gaussian {
            return Err(Error::Precondition(format!(
                "least-squares cross-validation needs a gaussian kernel, got {}",
                family.kind()
            )));
        }
        let distance = family.distance().identification();
        if distance != DistanceId::Geographic {
            return Err(Error::Precondition(format!(
                "least-squares cross-validation needs geographic distances, got {distance}"
            )));
        }
        Ok(())
    }

    fn sample(weights: &VariantWeights, family: &KernelFamily, v: VariantId) -> Result<VariantSample> {
        let occurrences = weights.occurrences(v);
        let n = occurrences.len();
        let mut distances = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = family.distance().distance(occurrences[i].0, occurrences[j].0)?;
                distances[[i, j]] = d;
                distances[[j, i]] = d;
            }
        }
        let weights: Vec<f64> = occurrences.iter().map(|(_, w)| *w).collect();
        let total = weights.iter().sum();
        Ok(VariantSample {
            weights,
            total,
            distances,
        })
    }
}

impl BandwidthEstimator for LeastSquaresCrossValidation {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::LeastSquaresCrossValidation
    }

    fn find_bandwidth(
        &self,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        candidates: &[Bandwidth],
        pool: &WorkerPool,
    ) -> Result<Option<Bandwidth>> {
        Self::check_family(family)?;
        if candidates.is_empty() || weights.variants().is_empty() {
            return Ok(None);
        }
        // Distances do not depend on the bandwidth; compute them once.
        let samples = pool.try_map(weights.variants(), |&v| Self::sample(weights, family, v))?;
        search_candidates(
            candidates,
            self.early_exit_window,
            Objective::Minimize,
            |candidate| {
                let h = candidate.value();
                let per_variant = pool.try_map(&samples, |s| Ok(s.score(h)))?;
                Ok(per_variant.into_iter().sum())
            },
        )
    }
}
