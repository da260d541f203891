//! Normal-reference bandwidth for two-dimensional data.
//!
//! For `n` points drawn from an isotropic normal with spread `σ`, the
//! bandwidth minimizing the asymptotic integrated squared error is
//! `h = σ n^(-1/6)`. The spread is estimated from pairwise distances, which
//! works for any distance measure: for such data the mean squared distance
//! between two points is `4σ²`.
//!
//! The result is snapped to the nearest candidate so that it can be stored
//! and compared like any other selected bandwidth.

use super::{Bandwidth, BandwidthEstimator, EstimatorKind};
use crate::error::Result;
use crate::kernel::KernelFamily;
use crate::parallel::WorkerPool;
use crate::survey::Location;
use crate::weights::VariantWeights;
use std::sync::Arc;

/// Rule-of-thumb bandwidth estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleOfThumb;

impl RuleOfThumb {
    /// Estimator.
    pub fn new() -> Self {
        Self
    }

    /// Spread `σ` of the observed locations under `family`'s distance.
    pub fn spread(weights: &VariantWeights, family: &KernelFamily, pool: &WorkerPool) -> Result<f64> {
        let observed: Vec<Location> = weights
            .locations()
            .filter(|l| weights.total(l.id) > 0.0)
            .copied()
            .collect();
        let n = observed.len();
        if n < 2 {
            return Ok(0.0);
        }
        let distance = family.distance();
        let row_sums = pool.try_map_range(n, |i| {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += distance.distance(&observed[i], &observed[j])?.powi(2);
            }
            Ok(sum)
        })?;
        let pairs = (n * (n - 1) / 2) as f64;
        let mean_squared: f64 = row_sums.into_iter().sum::<f64>() / pairs;
        Ok((mean_squared / 4.0).sqrt())
    }

    /// Unsnapped bandwidth `σ n^(-1/6)`.
    pub fn raw_bandwidth(sigma: f64, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        sigma * (n as f64).powf(-1.0 / 6.0)
    }
}

/// Candidate closest to `h`; ties go to the smaller one.
fn nearest(candidates: &[Bandwidth], h: f64) -> Option<Bandwidth> {
    let mut best: Option<(Bandwidth, f64)> = None;
    for &c in candidates {
        let gap = (c.value() - h).abs();
        if best.map_or(true, |(_, g)| gap < g) {
            best = Some((c, gap));
        }
    }
    best.map(|(c, _)| c)
}

impl BandwidthEstimator for RuleOfThumb {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::RuleOfThumb
    }

    fn find_bandwidth(
        &self,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        candidates: &[Bandwidth],
        pool: &WorkerPool,
    ) -> Result<Option<Bandwidth>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let sigma = Self::spread(weights, family, pool)?;
        if !(sigma > 0.0) {
            return Ok(None);
        }
        let h = Self::raw_bandwidth(sigma, weights.observed_location_count());
        log::debug!("map {}: rule-of-thumb spread {sigma:.3}, bandwidth {h:.3}", weights.map());
        Ok(nearest(candidates, h))
    }
}
