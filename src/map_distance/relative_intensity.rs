//! Relative-intensity method.
//!
//! Within one map, the contrast of a location pair `(i, j)` with dominant
//! intensities `sᵢ`, `sⱼ` is
//!
//! | Dominants | Contrast |
//! |-----------|----------|
//! | none at either | 0 |
//! | only at one | that intensity |
//! | same variant | `|sᵢ - sⱼ|` |
//! | different variants | `sᵢ + sⱼ` |
//!
//! The distance between two maps sums the absolute contrast differences
//! over all unordered pairs.

use super::{check_same_locations, MapDistance, MapDistanceKind, PairCache};
use crate::areal::{ClassMap, Dominant};
use crate::error::Result;

/// Relative-intensity map distance.
#[derive(Debug, Default)]
pub struct RelativeIntensityMethod {
    cache: PairCache,
}

impl RelativeIntensityMethod {
    /// Method with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached distances.
    pub fn cache(&self) -> &PairCache {
        &self.cache
    }
}

/// Contrast of one location pair within one map.
pub(crate) fn contrast(a: Option<&Dominant>, b: Option<&Dominant>) -> f64 {
    match (a, b) {
        (None, None) => 0.0,
        (Some(x), None) | (None, Some(x)) => x.intensity,
        (Some(x), Some(y)) if x.variant == y.variant => (x.intensity - y.intensity).abs(),
        (Some(x), Some(y)) => x.intensity + y.intensity,
    }
}

fn compute(a: &dyn ClassMap, b: &dyn ClassMap) -> Result<f64> {
    let (da, db) = (a.dominants()?, b.dominants()?);
    let n = da.len();
    let mut sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let ca = contrast(da[i].as_ref(), da[j].as_ref());
            let cb = contrast(db[i].as_ref(), db[j].as_ref());
            sum += (ca - cb).abs();
        }
    }
    Ok(sum)
}

impl MapDistance for RelativeIntensityMethod {
    fn kind(&self) -> MapDistanceKind {
        MapDistanceKind::RelativeIntensityMethod
    }

    fn distance(&self, a: &dyn ClassMap, b: &dyn ClassMap) -> Result<f64> {
        check_same_locations(a, b)?;
        self.cache.get_or_try_insert_with(a.key(), b.key(), || compute(a, b))
    }
}
