//! Likelihood cross-validation.
//!
//! For each candidate bandwidth `h`, and each variant `v` occurring at
//! enough locations:
//!
//! ```text
//! L_v(h) = Σₗ weight(v, l) × ln f_h(v, l)
//! ```
//!
//! where `f_h` is the full estimate, *including* the location's own
//! observation (this is not leave-one-out). Persisted bandwidths were
//! computed this way, so the score is kept as is. The bandwidth maximizing
//! `Σ_v L_v(h)` wins.

use super::{search_candidates, Bandwidth, BandwidthEstimator, EstimatorKind, Objective};
use crate::config::AnalysisConfig;
use crate::density::KernelDensityEstimation;
use crate::error::Result;
use crate::kernel::KernelFamily;
use crate::parallel::WorkerPool;
use crate::survey::VariantId;
use crate::weights::VariantWeights;
use std::sync::Arc;

/// Likelihood cross-validation bandwidth estimator.
#[derive(Debug, Clone)]
pub struct LikelihoodCrossValidation {
    min_location_share: f64,
    early_exit_window: usize,
}

impl LikelihoodCrossValidation {
    /// Estimator with the thresholds of `config`.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_location_share: config.min_variant_location_share,
            early_exit_window: config.early_exit_window,
        }
    }

    /// Variants occurring at no less than the minimum share of locations.
    pub fn eligible_variants(&self, weights: &VariantWeights) -> Vec<VariantId> {
        weights
            .variants()
            .iter()
            .copied()
            .filter(|&v| {
                let share = weights.location_share(v);
                share > 0.0 && share >= self.min_location_share
            })
            .collect()
    }

    /// Total log-likelihood of `variants` under `estimation`.
    pub fn log_likelihood(
        estimation: &KernelDensityEstimation,
        variants: &[VariantId],
        pool: &WorkerPool,
    ) -> Result<f64> {
        let weights = estimation.weights();
        let per_variant = pool.try_map(variants, |&v| {
            let mut sum = 0.0;
            for (location, w) in weights.occurrences(v) {
                let f = estimation.density(v, location)?;
                sum += w * f.ln();
            }
            Ok(sum)
        })?;
        Ok(per_variant.into_iter().sum())
    }
}

impl BandwidthEstimator for LikelihoodCrossValidation {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::LikelihoodCrossValidation
    }

    fn find_bandwidth(
        &self,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        candidates: &[Bandwidth],
        pool: &WorkerPool,
    ) -> Result<Option<Bandwidth>> {
        let variants = self.eligible_variants(weights);
        if variants.is_empty() || candidates.is_empty() {
            return Ok(None);
        }
        search_candidates(
            candidates,
            self.early_exit_window,
            Objective::Maximize,
            |&candidate| {
                let kernel = family.with_bandwidth(candidate)?;
                let estimation = KernelDensityEstimation::new(Arc::clone(weights), kernel);
                Self::log_likelihood(&estimation, &variants, pool)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::GeographicDistance;
    use crate::kernel::KernelKind;
    use crate::survey::{Answer, Location, MapId};

    fn weights() -> Arc<VariantWeights> {
        // Two variant areas along the equator, ~11 km spacing.
        let locations: Vec<Location> = (0..12)
            .map(|i| Location::new(i, 0.0, f64::from(i) * 0.1))
            .collect();
        let answers: Vec<Answer> = (0..12)
            .map(|i| Answer::new(i, if i < 6 { 1 } else { 2 }, 1.0))
            .chain([Answer::new(11, 3, 0.2)])
            .collect();
        Arc::new(
            VariantWeights::from_answers(
                MapId(1),
                &locations,
                &[VariantId(1), VariantId(2), VariantId(3)],
                &answers,
            )
            .unwrap(),
        )
    }

    fn family() -> KernelFamily {
        KernelFamily::new(KernelKind::Gaussian, Arc::new(GeographicDistance::new()))
    }

    #[test]
    fn test_rare_variants_excluded() {
        let lcv = LikelihoodCrossValidation::new(&AnalysisConfig::default());
        let eligible = lcv.eligible_variants(&weights());
        assert_eq!(eligible, vec![VariantId(1), VariantId(2)]);
    }

    #[test]
    fn test_self_inclusion_favors_small_bandwidths() {
        // Without leaving the location out, a narrower kernel concentrates
        // more mass on each location's own observation.
        let w = weights();
        let pool = WorkerPool::sequential().unwrap();
        let lcv = LikelihoodCrossValidation::new(&AnalysisConfig::default());
        let variants = lcv.eligible_variants(&w);
        let score = |b: &str| {
            let kernel = family().with_bandwidth(b.parse().unwrap()).unwrap();
            let est = KernelDensityEstimation::new(Arc::clone(&w), kernel);
            LikelihoodCrossValidation::log_likelihood(&est, &variants, &pool).unwrap()
        };
        assert!(score("1") > score("10"));
        assert!(score("10") > score("100"));
    }

    #[test]
    fn test_finds_candidate() {
        let pool = WorkerPool::sequential().unwrap();
        let candidates: Vec<Bandwidth> = ["2", "5", "10", "20"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let lcv = LikelihoodCrossValidation::new(&AnalysisConfig::default());
        let found = lcv
            .find_bandwidth(&weights(), &family(), &candidates, &pool)
            .unwrap();
        assert_eq!(found, Some(candidates[0]));
    }

    #[test]
    fn test_no_candidates_no_bandwidth() {
        let pool = WorkerPool::sequential().unwrap();
        let lcv = LikelihoodCrossValidation::new(&AnalysisConfig::default());
        assert_eq!(
            lcv.find_bandwidth(&weights(), &family(), &[], &pool).unwrap(),
            None
        );
    }
}
