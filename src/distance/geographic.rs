//! Great-circle distance with an optional on-demand triangular cache.

use super::{triangular_index, DistanceId, DistanceMeasure};
use crate::error::Result;
use crate::survey::Location;
use geo::{Distance, Haversine, Point};
use std::sync::atomic::{AtomicU64, Ordering};

/// Mean Earth radius in kilometres, as used by [`geo::Haversine`].
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Bit pattern marking an empty cache cell.
const EMPTY: u64 = u64::MAX;

/// Great-circle (haversine) distance in kilometres.
///
/// With a cache, pairs of locations whose ids fall inside the cached range
/// are computed once and stored. Concurrent misses may compute the same
/// value twice; both writes store identical bits.
#[derive(Debug, Default)]
pub struct GeographicDistance {
    cache: Option<TriangularCache>,
}

#[derive(Debug)]
struct TriangularCache {
    min_id: u32,
    size: usize,
    cells: Vec<AtomicU64>,
}

impl TriangularCache {
    fn new(min_id: u32, max_id: u32) -> Self {
        let size = (max_id - min_id) as usize + 1;
        let len = size * (size - 1) / 2;
        Self {
            min_id,
            size,
            cells: (0..len).map(|_| AtomicU64::new(EMPTY)).collect(),
        }
    }

    fn slot(&self, a: &Location, b: &Location) -> Option<&AtomicU64> {
        let i = a.id.0.checked_sub(self.min_id)? as usize;
        let j = b.id.0.checked_sub(self.min_id)? as usize;
        if i >= self.size || j >= self.size || i == j {
            return None;
        }
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        self.cells.get(triangular_index(hi, lo))
    }
}

impl GeographicDistance {
    /// Uncached measure.
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Measure caching every pair among ids spanned by `locations`.
    pub fn with_cache(locations: &[Location]) -> Self {
        let min = locations.iter().map(|l| l.id.0).min();
        let max = locations.iter().map(|l| l.id.0).max();
        let cache = match (min, max) {
            (Some(min), Some(max)) => Some(TriangularCache::new(min, max)),
            _ => None,
        };
        Self { cache }
    }

    /// Whether a cache is attached.
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }
}

/// Haversine distance between `(latitude, longitude)` pairs in degrees.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let p = Point::new(a.1, a.0);
    let q = Point::new(b.1, b.0);
    Haversine::distance(p, q) / 1000.0
}

impl DistanceMeasure for GeographicDistance {
    fn identification(&self) -> DistanceId {
        DistanceId::Geographic
    }

    fn distance(&self, a: &Location, b: &Location) -> Result<f64> {
        if a.id == b.id {
            return Ok(0.0);
        }
        // Order the arguments so both directions hit the same float result.
        let (p, q) = if a.id < b.id { (a, b) } else { (b, a) };
        let compute = || haversine_km((p.latitude, p.longitude), (q.latitude, q.longitude));

        let Some(slot) = self.cache.as_ref().and_then(|c| c.slot(a, b)) else {
            return Ok(compute());
        };
        let bits = slot.load(Ordering::Relaxed);
        if bits != EMPTY {
            return Ok(f64::from_bits(bits));
        }
        let d = compute();
        slot.store(d.to_bits(), Ordering::Relaxed);
        Ok(d)
    }

    fn point_distance(&self, a: (f64, f64), b: (f64, f64)) -> Result<f64> {
        Ok(haversine_km(a, b))
    }
}
