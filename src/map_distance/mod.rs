//! Dissimilarity between two area-class maps.
//!
//! | Method | Compares | Cost per pair |
//! |--------|----------|---------------|
//! | [`RelativeIntensityMethod`] | intensity contrast of every location pair | O(n²) |
//! | [`SectorMethod`] | distance to the nearest variant boundary, per direction | O(n² / d) per sector |
//!
//! Both maps must cover the same locations; this is checked on every call,
//! cached or not, because a map key does not encode the location set.
//! Results are cached per instance, keyed by the unordered pair of map keys.

mod relative_intensity;
mod sector;

pub use relative_intensity::RelativeIntensityMethod;
pub use sector::SectorMethod;

use crate::areal::ClassMap;
use crate::error::{Error, Result};
use core::fmt;
use core::str::FromStr;
use dashmap::DashMap;

/// Tagged identification of a map distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapDistanceKind {
    /// `sector_method`
    SectorMethod,
    /// `relative_intensity_method`
    RelativeIntensityMethod,
}

impl MapDistanceKind {
    /// Identification string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MapDistanceKind::SectorMethod => "sector_method",
            MapDistanceKind::RelativeIntensityMethod => "relative_intensity_method",
        }
    }
}

impl fmt::Display for MapDistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapDistanceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sector_method" => Ok(MapDistanceKind::SectorMethod),
            "relative_intensity_method" => Ok(MapDistanceKind::RelativeIntensityMethod),
            _ => Err(Error::InvalidIdentification(s.to_string())),
        }
    }
}

/// Scalar dissimilarity between two classified maps.
pub trait MapDistance: Send + Sync {
    /// Which method this is.
    fn kind(&self) -> MapDistanceKind;

    /// Distance between `a` and `b`; symmetric, zero for equal maps.
    ///
    /// Fails with [`Error::LocationSetMismatch`] if the maps cover different
    /// locations.
    fn distance(&self, a: &dyn ClassMap, b: &dyn ClassMap) -> Result<f64>;
}

/// Symmetric cache of computed map distances.
#[derive(Debug, Default)]
pub struct PairCache {
    values: DashMap<(String, String), f64>,
}

impl PairCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cached value for `(a, b)`, or `compute` it and remember the result.
    ///
    /// Concurrent misses on the same pair may both compute; they store the
    /// same value.
    pub fn get_or_try_insert_with<F>(&self, a: &str, b: &str, compute: F) -> Result<f64>
    where
        F: FnOnce() -> Result<f64>,
    {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        if let Some(v) = self.values.get(&key) {
            return Ok(*v);
        }
        let v = compute()?;
        self.values.insert(key, v);
        Ok(v)
    }
}

/// Fail unless both maps cover the same locations, in the same order.
pub(crate) fn check_same_locations(a: &dyn ClassMap, b: &dyn ClassMap) -> Result<()> {
    let (la, lb) = (a.locations(), b.locations());
    if la.len() != lb.len() || la.iter().zip(lb).any(|(x, y)| x.id != y.id) {
        return Err(Error::LocationSetMismatch {
            left: la.len(),
            right: lb.len(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedMap;
    use super::*;

    #[test]
    fn test_kind_identifications() {
        for kind in [MapDistanceKind::SectorMethod, MapDistanceKind::RelativeIntensityMethod] {
            assert_eq!(kind.to_string().parse::<MapDistanceKind>().unwrap(), kind);
        }
        assert_eq!(MapDistanceKind::SectorMethod.to_string(), "sector_method");
        assert!("sector".parse::<MapDistanceKind>().is_err());
    }

    #[test]
    fn test_pair_cache_is_symmetric() {
        let cache = PairCache::new();
        let mut calls = 0;
        let v = cache
            .get_or_try_insert_with("a", "b", || {
                calls += 1;
                Ok(2.5)
            })
            .unwrap();
        let w = cache
            .get_or_try_insert_with("b", "a", || {
                calls += 1;
                Ok(99.0)
            })
            .unwrap();
        assert_eq!((v, w, calls), (2.5, 2.5, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_computation_is_not_cached() {
        let cache = PairCache::new();
        assert!(cache
            .get_or_try_insert_with("a", "b", || Err(Error::EmptyInput))
            .is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_location_sets_must_match() {
        let a = FixedMap::new("a", &[(1, 0.0, 0.0, None), (2, 0.0, 1.0, None)]);
        let b = FixedMap::new("b", &[(1, 0.0, 0.0, None), (3, 0.0, 1.0, None)]);
        let c = FixedMap::new("c", &[(1, 0.0, 0.0, None)]);
        assert!(check_same_locations(&a, &a).is_ok());
        assert!(matches!(
            check_same_locations(&a, &b),
            Err(Error::LocationSetMismatch { left: 2, right: 2 })
        ));
        assert!(matches!(
            check_same_locations(&a, &c),
            Err(Error::LocationSetMismatch { left: 2, right: 1 })
        ));
    }
}
