//! Sector method.
//!
//! Around every location the plane is split into `d` angular sectors. For
//! each sector, the map's *boundary distance* is the distance to the nearest
//! location in that sector whose dominant variant differs from the centre's.
//! If the whole sector agrees with the centre, it is the distance to the
//! farthest location in the sector instead; an empty sector contributes 0.
//! The distance between two maps sums the absolute differences of boundary
//! distances over all (location, sector) pairs.
//!
//! Sectors:
//!
//! - `d = 1`: every other location.
//! - `d = 2`: east (`longitude ≥` the centre's) and west (`<`).
//! - `d ≥ 3`: equal bearing slices starting due east, counter-clockwise,
//!   using a local equirectangular projection around the centre.
//!
//! Sector membership and pairwise location distances depend only on the
//! location set. They are built on the first call and reused afterwards;
//! a call with a different location set fails with
//! [`Error::InconsistentSectorCache`].

use super::{check_same_locations, MapDistance, MapDistanceKind, PairCache};
use crate::areal::{ClassMap, Dominant};
use crate::distance::DistanceMeasure;
use crate::error::{Error, Result};
use crate::survey::{Location, LocationId, VariantId};
use core::f64::consts::TAU;
use ndarray::Array2;
use std::sync::{Arc, OnceLock};

/// Sector membership and distances for one location set.
#[derive(Debug)]
struct SectorGeometry {
    ids: Vec<LocationId>,
    /// `members[i][s]`: indices of the locations in sector `s` of location `i`.
    members: Vec<Vec<Vec<usize>>>,
    distances: Array2<f64>,
}

/// Sector-method map distance.
pub struct SectorMethod {
    sectors: usize,
    /// Lower bearing of every sector, radians in `[0, 2π)`.
    boundaries: Vec<f64>,
    distance: Arc<dyn DistanceMeasure>,
    geometry: OnceLock<SectorGeometry>,
    cache: PairCache,
}

impl SectorMethod {
    /// Method with `sectors` sectors per location, measuring with `distance`.
    pub fn new(sectors: usize, distance: Arc<dyn DistanceMeasure>) -> Result<Self> {
        if sectors == 0 {
            return Err(Error::InvalidParameter {
                name: "sectors",
                message: "need at least one sector".to_string(),
            });
        }
        let width = TAU / sectors as f64;
        let boundaries = (0..sectors).map(|s| s as f64 * width).collect();
        Ok(Self {
            sectors,
            boundaries,
            distance,
            geometry: OnceLock::new(),
            cache: PairCache::new(),
        })
    }

    /// Number of sectors per location.
    pub fn sectors(&self) -> usize {
        self.sectors
    }

    /// Cached distances.
    pub fn cache(&self) -> &PairCache {
        &self.cache
    }

    /// Members of each sector around `centre`, for the given location set.
    pub fn sectors_of(&self, locations: &[Location], centre: LocationId) -> Result<Vec<Vec<LocationId>>> {
        let geometry = self.geometry(locations)?;
        let i = geometry
            .ids
            .iter()
            .position(|&id| id == centre)
            .ok_or_else(|| Error::Precondition(format!("location {centre} is not in the location set")))?;
        Ok(geometry.members[i]
            .iter()
            .map(|sector| sector.iter().map(|&j| geometry.ids[j]).collect())
            .collect())
    }

    fn geometry(&self, locations: &[Location]) -> Result<&SectorGeometry> {
        let geometry = match self.geometry.get() {
            Some(g) => g,
            None => {
                let built = self.build_geometry(locations)?;
                self.geometry.get_or_init(|| built)
            }
        };
        let same = geometry.ids.len() == locations.len()
            && geometry.ids.iter().zip(locations).all(|(id, l)| *id == l.id);
        if !same {
            return Err(Error::InconsistentSectorCache);
        }
        Ok(geometry)
    }

    fn build_geometry(&self, locations: &[Location]) -> Result<SectorGeometry> {
        let n = locations.len();
        let mut distances = Array2::zeros((n, n));
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.distance.distance(&locations[i], &locations[j])?;
                distances[[i, j]] = d;
                distances[[j, i]] = d;
            }
        }
        let members = (0..n)
            .map(|i| {
                let mut sectors = vec![Vec::new(); self.sectors];
                for j in (0..n).filter(|&j| j != i) {
                    sectors[self.sector(&locations[i], &locations[j])].push(j);
                }
                sectors
            })
            .collect();
        log::debug!("sector geometry: {n} locations, {} sectors", self.sectors);
        Ok(SectorGeometry {
            ids: locations.iter().map(|l| l.id).collect(),
            members,
            distances,
        })
    }

    /// Sector of `other` as seen from `centre`.
    fn sector(&self, centre: &Location, other: &Location) -> usize {
        match self.sectors {
            1 => 0,
            2 => usize::from(other.longitude < centre.longitude),
            _ => {
                let dx = (other.longitude - centre.longitude) * centre.latitude.to_radians().cos();
                let dy = other.latitude - centre.latitude;
                let bearing = dy.atan2(dx).rem_euclid(TAU);
                self.boundaries
                    .partition_point(|&b| b <= bearing)
                    .saturating_sub(1)
            }
        }
    }

    /// Boundary distance of every (location, sector) pair of one map.
    fn boundary_distances(geometry: &SectorGeometry, dominants: &[Option<Dominant>]) -> Vec<f64> {
        let class = |i: usize| -> Option<VariantId> { dominants[i].map(|d| d.variant) };
        let mut out = Vec::new();
        for (i, sectors) in geometry.members.iter().enumerate() {
            let own = class(i);
            for members in sectors {
                let mut nearest_other = f64::INFINITY;
                let mut farthest_same = 0.0f64;
                for &j in members {
                    let d = geometry.distances[[i, j]];
                    if class(j) != own {
                        nearest_other = nearest_other.min(d);
                    } else {
                        farthest_same = farthest_same.max(d);
                    }
                }
                out.push(if nearest_other.is_finite() {
                    nearest_other
                } else {
                    farthest_same
                });
            }
        }
        out
    }
}

impl MapDistance for SectorMethod {
    fn kind(&self) -> MapDistanceKind {
        MapDistanceKind::SectorMethod
    }

    fn distance(&self, a: &dyn ClassMap, b: &dyn ClassMap) -> Result<f64> {
        check_same_locations(a, b)?;
        let geometry = self.geometry(a.locations())?;
        self.cache.get_or_try_insert_with(a.key(), b.key(), || {
            let ba = Self::boundary_distances(geometry, a.dominants()?);
            let bb = Self::boundary_distances(geometry, b.dominants()?);
            Ok(ba.iter().zip(&bb).map(|(x, y)| (x - y).abs()).sum())
        })
    }
}

impl core::fmt::Debug for SectorMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectorMethod")
            .field("sectors", &self.sectors)
            .field("distance", &self.distance.identification())
            .field("cached_pairs", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::GeographicDistance;
    use crate::map_distance::test_support::FixedMap;
    use std::collections::BTreeSet;

    fn method(d: usize) -> SectorMethod {
        SectorMethod::new(d, Arc::new(GeographicDistance::new())).unwrap()
    }

    /// Centre plus eight neighbours on a compass rose.
    fn rose() -> Vec<Location> {
        let mut out = vec![Location::new(0, 0.0, 0.0)];
        let offsets = [
            (0.0, 1.0),
            (1.0, 1.0),
            (1.0, 0.0),
            (1.0, -1.0),
            (0.0, -1.0),
            (-1.0, -1.0),
            (-1.0, 0.0),
            (-1.0, 1.0),
        ];
        for (k, (lat, lon)) in offsets.into_iter().enumerate() {
            out.push(Location::new(k as u32 + 1, lat, lon));
        }
        out
    }

    #[test]
    fn test_zero_sectors_rejected() {
        assert!(SectorMethod::new(0, Arc::new(GeographicDistance::new())).is_err());
    }

    #[test]
    fn test_one_sector_holds_everyone_else() {
        let locations = rose();
        let m = method(1);
        for l in &locations {
            let sectors = m.sectors_of(&locations, l.id).unwrap();
            assert_eq!(sectors.len(), 1);
            let expected: Vec<LocationId> = locations
                .iter()
                .map(|x| x.id)
                .filter(|&id| id != l.id)
                .collect();
            assert_eq!(sectors[0], expected);
        }
    }

    #[test]
    fn test_two_sectors_partition() {
        let locations = rose();
        let m = method(2);
        for l in &locations {
            let sectors = m.sectors_of(&locations, l.id).unwrap();
            assert_eq!(sectors.len(), 2);
            let east: BTreeSet<_> = sectors[0].iter().copied().collect();
            let west: BTreeSet<_> = sectors[1].iter().copied().collect();
            assert!(east.is_disjoint(&west));
            assert_eq!(east.len() + west.len(), locations.len() - 1);
            assert!(!east.contains(&l.id) && !west.contains(&l.id));
        }
        // Due north shares the centre's longitude and counts as east.
        let centre = m.sectors_of(&locations, LocationId(0)).unwrap();
        assert!(centre[0].contains(&LocationId(3)));
        assert!(centre[1].contains(&LocationId(5)));
    }

    #[test]
    fn test_four_sectors_follow_bearing() {
        let locations = rose();
        let m = method(4);
        let centre = m.sectors_of(&locations, LocationId(0)).unwrap();
        // East, north-east, north, ... counter-clockwise from due east.
        assert_eq!(centre[0], vec![LocationId(1), LocationId(2)]);
        assert_eq!(centre[1], vec![LocationId(3), LocationId(4)]);
        assert_eq!(centre[2], vec![LocationId(5), LocationId(6)]);
        assert_eq!(centre[3], vec![LocationId(7), LocationId(8)]);
    }

    #[test]
    fn test_boundary_distance_counts_variant_changes() {
        let line = |v3: u32, key: &str| {
            FixedMap::new(
                key,
                &[
                    (1, 0.0, 0.0, Some((1, 1.0))),
                    (2, 0.0, 0.1, Some((1, 1.0))),
                    (3, 0.0, 0.2, Some((v3, 1.0))),
                ],
            )
        };
        let same = line(1, "same");
        let split = line(2, "split");
        let m = method(1);
        let d12 = crate::distance::haversine_km((0.0, 0.0), (0.0, 0.1));
        let d13 = crate::distance::haversine_km((0.0, 0.0), (0.0, 0.2));
        // Location 1: farthest same (d13) vs nearest other (d13). Location 2:
        // d12 in both. Location 3: d13 vs d12.
        let expected = (d13 - d12).abs();
        let got = m.distance(&same, &split).unwrap();
        assert!((got - expected).abs() < 1e-9, "{got} vs {expected}");
        assert_eq!(m.distance(&same, &same).unwrap(), 0.0);
    }

    #[test]
    fn test_other_location_set_is_rejected() {
        let m = method(2);
        let locations = rose();
        m.sectors_of(&locations, LocationId(0)).unwrap();
        let fewer = &locations[..5];
        assert_eq!(
            m.sectors_of(fewer, LocationId(0)).unwrap_err(),
            Error::InconsistentSectorCache
        );
    }

    #[test]
    fn test_cached_pair_skips_classification() {
        let a = FixedMap::new("a", &[(1, 0.0, 0.0, Some((1, 1.0))), (2, 0.0, 0.1, Some((2, 1.0)))]);
        let b = FixedMap::new("b", &[(1, 0.0, 0.0, Some((1, 1.0))), (2, 0.0, 0.1, Some((1, 1.0)))]);
        let m = method(2);
        let first = m.distance(&a, &b).unwrap();
        let reads = a.reads() + b.reads();
        assert_eq!(m.distance(&a, &b).unwrap().to_bits(), first.to_bits());
        assert_eq!(a.reads() + b.reads(), reads);
    }

    #[test]
    fn test_cached_pair_still_checks_locations() {
        use crate::map_distance::test_support::padded_map;

        let m = method(2);
        let first = padded_map(1, None);
        let second = padded_map(2, None);
        m.distance(&first, &second).unwrap();

        let extra = Location::new(3, 0.0, 0.2);
        let padded_first = padded_map(1, Some(extra));
        let padded_second = padded_map(2, Some(extra));
        assert_eq!(
            m.distance(&padded_first, &second).unwrap_err(),
            Error::LocationSetMismatch { left: 3, right: 2 }
        );
        assert_eq!(
            m.distance(&padded_first, &padded_second).unwrap_err(),
            Error::InconsistentSectorCache
        );
    }
}
