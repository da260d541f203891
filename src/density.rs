//! Kernel density estimation over weighted categorical observations.
//!
//! For variant `v` at target `t`, with `N` observed locations:
//!
//! ```text
//! f(v, t) = 1/N × Σₗ weight(v, l) × K_h(d(l, t))
//! ```
//!
//! Locations farther than the kernel's maximum relevant distance are skipped.

use crate::error::Result;
use crate::kernel::Kernel;
use crate::survey::{Location, VariantId};
use crate::weights::VariantWeights;
use std::sync::Arc;

/// One observed location with `(variant index, weight)` pairs.
#[derive(Debug, Clone)]
struct Observation {
    location: Location,
    weights: Vec<(usize, f64)>,
}

/// Smoothed variant densities from weights and a kernel.
#[derive(Debug, Clone)]
pub struct KernelDensityEstimation {
    weights: Arc<VariantWeights>,
    kernel: Kernel,
    observations: Vec<Observation>,
}

impl KernelDensityEstimation {
    /// Prepare an estimation.
    pub fn new(weights: Arc<VariantWeights>, kernel: Kernel) -> Self {
        let variants = weights.variants();
        let observations = weights
            .locations()
            .filter_map(|location| {
                let at = weights.weights_at(location.id);
                if at.is_empty() {
                    return None;
                }
                let indexed = at
                    .into_iter()
                    .filter_map(|(v, w)| variants.binary_search(&v).ok().map(|i| (i, w)))
                    .collect();
                Some(Observation {
                    location: *location,
                    weights: indexed,
                })
            })
            .collect();
        Self {
            weights,
            kernel,
            observations,
        }
    }

    /// Underlying weights.
    pub fn weights(&self) -> &Arc<VariantWeights> {
        &self.weights
    }

    /// Kernel in use.
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Density of one variant at `target`.
    pub fn density(&self, variant: VariantId, target: &Location) -> Result<f64> {
        let Ok(index) = self.weights.variants().binary_search(&variant) else {
            return Ok(0.0);
        };
        if self.observations.is_empty() {
            return Ok(0.0);
        }
        let max = self.kernel.max_relevant_distance();
        let distance = self.kernel.distance_measure();
        let mut sum = 0.0;
        for obs in &self.observations {
            let Some(&(_, w)) = obs.weights.iter().find(|(i, _)| *i == index) else {
                continue;
            };
            let d = distance.distance(&obs.location, target)?;
            if d > max {
                continue;
            }
            sum += w * self.kernel.evaluate(d);
        }
        Ok(sum / self.observations.len() as f64)
    }

    /// Densities of all variants at `target`, in [`VariantWeights::variants`] order.
    pub fn densities(&self, target: &Location) -> Result<Vec<(VariantId, f64)>> {
        let variants = self.weights.variants();
        let mut sums = vec![0.0; variants.len()];
        if !self.observations.is_empty() {
            let max = self.kernel.max_relevant_distance();
            let distance = self.kernel.distance_measure();
            for obs in &self.observations {
                let d = distance.distance(&obs.location, target)?;
                if d > max {
                    continue;
                }
                let k = self.kernel.evaluate(d);
                for &(i, w) in &obs.weights {
                    sums[i] += w * k;
                }
            }
            let n = self.observations.len() as f64;
            for s in &mut sums {
                *s /= n;
            }
        }
        Ok(variants.iter().copied().zip(sums).collect())
    }
}
