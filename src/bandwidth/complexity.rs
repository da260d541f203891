//! Minimum complexity, maximum fidelity.
//!
//! Every candidate bandwidth yields an area-class map. Small bandwidths give
//! ragged maps (long borders), large ones wash out regions. With `B(h)` the
//! border length and `C(h)` the region compactness:
//!
//! ```text
//! score(h) = (max B - B(h)) × √(C(h) - min C)
//! ```
//!
//! The highest score wins; a best score of zero (all maps alike, e.g. a
//! single-variant map) selects nothing.

use super::{Bandwidth, BandwidthEstimator, EstimatorKind};
use crate::areal::{AreaClassMap, MapCharacteristics, Tessellation};
use crate::density::KernelDensityEstimation;
use crate::error::Result;
use crate::kernel::KernelFamily;
use crate::parallel::WorkerPool;
use crate::weights::VariantWeights;
use std::sync::Arc;

/// Complexity/fidelity trade-off estimator.
#[derive(Debug, Clone)]
pub struct MinComplexityMaxFidelity {
    tessellation: Arc<Tessellation>,
}

impl MinComplexityMaxFidelity {
    /// Estimator measuring maps on `tessellation`.
    pub fn new(tessellation: Arc<Tessellation>) -> Self {
        Self { tessellation }
    }

    /// Characteristics of the map built with each candidate.
    pub fn characteristics(
        &self,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        candidates: &[Bandwidth],
        pool: &WorkerPool,
    ) -> Result<Vec<MapCharacteristics>> {
        pool.try_map(candidates, |&candidate| {
            let kernel = family.with_bandwidth(candidate)?;
            let map = AreaClassMap::new(KernelDensityEstimation::new(Arc::clone(weights), kernel));
            self.tessellation.characteristics(&map)
        })
    }
}

/// Index of the best trade-off, if any score is positive.
pub(crate) fn best_trade_off(characteristics: &[MapCharacteristics]) -> Option<usize> {
    let max_border = characteristics
        .iter()
        .map(|c| c.border_length)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_compactness = characteristics
        .iter()
        .map(|c| c.compactness)
        .fold(f64::INFINITY, f64::min);

    let mut best: Option<(usize, f64)> = None;
    for (i, c) in characteristics.iter().enumerate() {
        let score = (max_border - c.border_length) * (c.compactness - min_compactness).max(0.0).sqrt();
        log::trace!(
            "candidate {i}: border {:.3}, compactness {:.4}, score {score:.4}",
            c.border_length,
            c.compactness
        );
        if score > 0.0 && best.map_or(true, |(_, b)| score > b) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

impl BandwidthEstimator for MinComplexityMaxFidelity {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::MinComplexityMaxFidelity
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
        let characteristics = self.characteristics(weights, family, candidates, pool)?;
        Ok(best_trade_off(&characteristics).map(|i| candidates[i]))
    }
}
