//! Bandwidth values, candidate generation and automatic selection.
//!
//! # Candidates
//!
//! Candidates are equidistant steps up to the largest pairwise distance
//! among the map's locations (times [`AnalysisConfig::max_distance_ratio`]),
//! rounded down to its leading significant digit:
//!
//! ```text
//! max distance 37.2 km  →  30  →  0.3, 0.6, …, 30
//! ```
//!
//! A map whose locations all coincide gets no candidates.
//!
//! # Estimators
//!
//! | Estimator | Objective | Early exit |
//! |-----------|-----------|------------|
//! | [`LikelihoodCrossValidation`] | maximize weighted log-likelihood | 20 consecutive decreases |
//! | [`LeastSquaresCrossValidation`] | minimize integrated squared error (Gaussian, geographic only) | 20 consecutive increases |
//! | [`MinComplexityMaxFidelity`] | trade border length against region compactness | none |
//! | [`RuleOfThumb`] | normal-reference bandwidth snapped to a candidate | none |
//!
//! Every estimator may return `None`; the caller substitutes a fallback.

mod complexity;
mod least_squares;
mod likelihood;
mod rule_of_thumb;
mod value;

pub use complexity::MinComplexityMaxFidelity;
pub use least_squares::LeastSquaresCrossValidation;
pub use likelihood::LikelihoodCrossValidation;
pub use rule_of_thumb::RuleOfThumb;
pub use value::Bandwidth;

use crate::config::AnalysisConfig;
use crate::distance::DistanceMeasure;
use crate::error::{Error, Result};
use crate::kernel::KernelFamily;
use crate::parallel::WorkerPool;
use crate::survey::Location;
use crate::weights::VariantWeights;
use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

/// Tagged identification of a bandwidth estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimatorKind {
    /// `likelihood_cross_validation`
    LikelihoodCrossValidation,
    /// `least_squares_cross_validation`
    LeastSquaresCrossValidation,
    /// `min_complexity_max_fidelity`
    MinComplexityMaxFidelity,
    /// `rule_of_thumb`
    RuleOfThumb,
}

impl EstimatorKind {
    /// Identification string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorKind::LikelihoodCrossValidation => "likelihood_cross_validation",
            EstimatorKind::LeastSquaresCrossValidation => "least_squares_cross_validation",
            EstimatorKind::MinComplexityMaxFidelity => "min_complexity_max_fidelity",
            EstimatorKind::RuleOfThumb => "rule_of_thumb",
        }
    }
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EstimatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [
            EstimatorKind::LikelihoodCrossValidation,
            EstimatorKind::LeastSquaresCrossValidation,
            EstimatorKind::MinComplexityMaxFidelity,
            EstimatorKind::RuleOfThumb,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
        .ok_or_else(|| Error::InvalidIdentification(s.to_string()))
    }
}

/// Selects a kernel bandwidth from a list of candidates.
pub trait BandwidthEstimator: Send + Sync {
    /// Which estimator this is.
    fn kind(&self) -> EstimatorKind;

    /// Pick a bandwidth for `weights` smoothed with kernels of `family`.
    ///
    /// `candidates` are ascending. `Ok(None)` means no bandwidth could be
    /// selected (no candidates, or no extremum).
    fn find_bandwidth(
        &self,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        candidates: &[Bandwidth],
        pool: &WorkerPool,
    ) -> Result<Option<Bandwidth>>;
}

/// Round `x` down to its leading significant digit (`37.2 → 30`, `0.046 → 0.04`).
pub fn round_down_to_leading_digit(x: f64) -> f64 {
    if !(x > 0.0) || !x.is_finite() {
        return 0.0;
    }
    let mut magnitude = 10f64.powi(x.log10().floor() as i32);
    // log10 can be off by one ulp around exact powers of ten.
    if magnitude > x {
        magnitude /= 10.0;
    } else if magnitude * 10.0 <= x {
        magnitude *= 10.0;
    }
    (x / magnitude).floor().clamp(1.0, 9.0) * magnitude
}

/// Equidistant candidates in `(0, max]` after leading-digit rounding.
pub fn candidates_up_to(max_distance: f64, config: &AnalysisConfig) -> Result<Vec<Bandwidth>> {
    let max = round_down_to_leading_digit(max_distance * config.max_distance_ratio);
    if max <= 0.0 {
        return Ok(Vec::new());
    }
    let count = config.candidate_count;
    let mut out: Vec<Bandwidth> = Vec::with_capacity(count);
    for i in 1..=count {
        let b = Bandwidth::from_f64(max * i as f64 / count as f64)?;
        if !b.is_zero() && out.last().map_or(true, |last| *last < b) {
            out.push(b);
        }
    }
    Ok(out)
}

/// Largest distance between any two locations of `weights`.
pub fn max_pairwise_distance(
    weights: &VariantWeights,
    distance: &dyn DistanceMeasure,
    pool: &WorkerPool,
) -> Result<f64> {
    let locations: Vec<Location> = weights.locations().copied().collect();
    let row_max = pool.try_map_range(locations.len(), |i| {
        let mut m = 0.0f64;
        for j in (i + 1)..locations.len() {
            m = m.max(distance.distance(&locations[i], &locations[j])?);
        }
        Ok(m)
    })?;
    Ok(row_max.into_iter().fold(0.0, f64::max))
}

/// Candidates for a map: leading-digit steps up to its maximum pairwise distance.
pub fn generate_candidates(
    weights: &VariantWeights,
    distance: &dyn DistanceMeasure,
    config: &AnalysisConfig,
    pool: &WorkerPool,
) -> Result<Vec<Bandwidth>> {
    let max = max_pairwise_distance(weights, distance, pool)?;
    let candidates = candidates_up_to(max, config)?;
    log::debug!(
        "map {}: max distance {max:.3}, {} candidates",
        weights.map(),
        candidates.len()
    );
    Ok(candidates)
}

/// Direction of a candidate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Objective {
    Maximize,
    Minimize,
}

impl Objective {
    fn better(self, a: f64, b: f64) -> bool {
        match self {
            Objective::Maximize => a > b,
            Objective::Minimize => a < b,
        }
    }
}

/// Walk ascending candidates, keeping the best score.
///
/// Stops after `window` consecutive evaluations that are each strictly
/// worse than the one before. This assumes a unimodal score curve; a
/// second optimum beyond a long decline is not found. Non-finite scores are
/// skipped and break the run of worsening evaluations.
pub(crate) fn search_candidates<F>(
    candidates: &[Bandwidth],
    window: usize,
    objective: Objective,
    mut score: F,
) -> Result<Option<Bandwidth>>
where
    F: FnMut(&Bandwidth) -> Result<f64>,
{
    let mut best: Option<(Bandwidth, f64)> = None;
    let mut previous: Option<f64> = None;
    let mut worsening = 0usize;

    for candidate in candidates {
        let s = score(candidate)?;
        log::trace!("bandwidth {candidate}: score {s}");
        if !s.is_finite() {
            previous = None;
            worsening = 0;
            continue;
        }
        if best.map_or(true, |(_, b)| objective.better(s, b)) {
            best = Some((*candidate, s));
        }
        match previous {
            Some(p) if objective.better(p, s) => worsening += 1,
            _ => worsening = 0,
        }
        previous = Some(s);
        if worsening >= window {
            log::debug!("early exit at bandwidth {candidate} after {worsening} worsening steps");
            break;
        }
    }
    Ok(best.map(|(b, _)| b))
}
