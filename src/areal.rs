//! Area-class maps: the locally dominant variant at every location.
//!
//! An [`AreaClassMap`] evaluates a [`KernelDensityEstimation`] at each
//! location of its weights and keeps the variant with the highest density,
//! together with that density and its share of the total density
//! (the *intensity*). Results are computed once, on first use, and never
//! change: a different kernel or bandwidth means a different map.
//!
//! Cell geometry (Voronoi construction and clipping) is done elsewhere; a
//! [`Tessellation`] carries its results, from which border length
//! (complexity) and region compactness (fidelity) are derived.

use crate::density::KernelDensityEstimation;
use crate::error::{Error, Result};
use crate::parallel::WorkerPool;
use crate::survey::{Location, LocationId, VariantId};
use core::f64::consts::PI;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Dominant variant at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dominant {
    /// Variant with the highest density.
    pub variant: VariantId,
    /// Its density.
    pub density: f64,
    /// Its share of the summed densities, in `(0, 1]`.
    pub intensity: f64,
}

/// Read access to a classified map, as needed by map distances.
pub trait ClassMap: Send + Sync {
    /// Identity of the map; equal keys mean equal classifications.
    fn key(&self) -> &str;

    /// Locations, ascending by id.
    fn locations(&self) -> &[Location];

    /// Dominant variant per location, aligned with [`ClassMap::locations`].
    ///
    /// `None` where no variant has positive density.
    fn dominants(&self) -> Result<&[Option<Dominant>]>;
}

/// Dominant-variant classification of one map under one kernel.
#[derive(Debug)]
pub struct AreaClassMap {
    key: String,
    estimation: KernelDensityEstimation,
    locations: Vec<Location>,
    dominants: OnceLock<Vec<Option<Dominant>>>,
}

impl AreaClassMap {
    /// Wrap an estimation; nothing is computed yet.
    pub fn new(estimation: KernelDensityEstimation) -> Self {
        let weights = estimation.weights();
        let key = format!(
            "map_id={}:{}:{}",
            weights.map(),
            weights.identification(),
            estimation.kernel().identification()
        );
        let locations = weights.locations().copied().collect();
        Self {
            key,
            estimation,
            locations,
            dominants: OnceLock::new(),
        }
    }

    /// Classify every location in parallel now instead of on first use.
    pub fn evaluate(&self, pool: &WorkerPool) -> Result<()> {
        if self.dominants.get().is_some() {
            return Ok(());
        }
        let computed = pool.try_map(&self.locations, |l| self.dominant_at(l))?;
        let _ = self.dominants.set(computed);
        Ok(())
    }

    /// Estimation behind this map.
    pub fn estimation(&self) -> &KernelDensityEstimation {
        &self.estimation
    }

    /// Dominant variant at a location id, if the location belongs to the map.
    pub fn dominant(&self, id: LocationId) -> Result<Option<Dominant>> {
        let idx = self
            .locations
            .binary_search_by_key(&id, |l| l.id)
            .map_err(|_| Error::Precondition(format!("location {id} is not on map {}", self.key)))?;
        Ok(self.dominants()?[idx])
    }

    fn dominant_at(&self, location: &Location) -> Result<Option<Dominant>> {
        let densities = self.estimation.densities(location)?;
        let total: f64 = densities.iter().map(|(_, d)| d).sum();
        let mut best: Option<(VariantId, f64)> = None;
        // Ascending variant order: ties keep the lowest id.
        for (v, d) in densities {
            if d > 0.0 && best.map_or(true, |(_, b)| d > b) {
                best = Some((v, d));
            }
        }
        Ok(best.map(|(variant, density)| Dominant {
            variant,
            density,
            intensity: density / total,
        }))
    }
}

impl ClassMap for AreaClassMap {
    fn key(&self) -> &str {
        &self.key
    }

    fn locations(&self) -> &[Location] {
        &self.locations
    }

    fn dominants(&self) -> Result<&[Option<Dominant>]> {
        if let Some(d) = self.dominants.get() {
            return Ok(d);
        }
        let computed = self
            .locations
            .iter()
            .map(|l| self.dominant_at(l))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.dominants.get_or_init(|| computed))
    }
}

/// Geometry of one location's cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Cell area.
    pub area: f64,
    /// Cell perimeter.
    pub perimeter: f64,
}

/// Complexity and fidelity of a classified map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCharacteristics {
    /// Total length of borders between cells of different dominant variants.
    pub border_length: f64,
    /// Area-weighted isoperimetric quotient `4πA/P²` of the variant regions.
    pub compactness: f64,
}

/// Precomputed cells and shared borders of the survey locations.
#[derive(Debug, Clone, Default)]
pub struct Tessellation {
    cells: BTreeMap<LocationId, Cell>,
    borders: Vec<(LocationId, LocationId, f64)>,
}

impl Tessellation {
    /// Empty tessellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell.
    pub fn with_cell(mut self, id: LocationId, area: f64, perimeter: f64) -> Self {
        self.cells.insert(id, Cell { area, perimeter });
        self
    }

    /// Add a border of `length` shared by the cells of `a` and `b`.
    pub fn with_border(mut self, a: LocationId, b: LocationId, length: f64) -> Self {
        self.borders.push((a, b, length));
        self
    }

    /// Cell of a location.
    pub fn cell(&self, id: LocationId) -> Option<&Cell> {
        self.cells.get(&id)
    }

    /// Border length and compactness of `map`.
    pub fn characteristics(&self, map: &dyn ClassMap) -> Result<MapCharacteristics> {
        let locations = map.locations();
        let dominants = map.dominants()?;
        let index: BTreeMap<LocationId, usize> =
            locations.iter().enumerate().map(|(i, l)| (l.id, i)).collect();
        let class = |i: usize| dominants[i].map(|d| d.variant);

        let mut parent: Vec<usize> = (0..locations.len()).collect();
        let mut border_length = 0.0;
        let mut internal: Vec<(usize, f64)> = Vec::new();
        for &(a, b, length) in &self.borders {
            let (Some(&i), Some(&j)) = (index.get(&a), index.get(&b)) else {
                continue;
            };
            if class(i) == class(j) {
                union(&mut parent, i, j);
                internal.push((i, length));
            } else {
                border_length += length;
            }
        }

        let mut regions: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
        for (i, l) in locations.iter().enumerate() {
            if let Some(cell) = self.cells.get(&l.id) {
                let r = regions.entry(find(&mut parent, i)).or_insert((0.0, 0.0));
                r.0 += cell.area;
                r.1 += cell.perimeter;
            }
        }
        for (i, length) in internal {
            if let Some(r) = regions.get_mut(&find(&mut parent, i)) {
                r.1 -= 2.0 * length;
            }
        }

        let mut weighted = 0.0;
        let mut area = 0.0;
        for (a, p) in regions.into_values() {
            if a > 0.0 && p > 0.0 {
                weighted += a * (4.0 * PI * a / (p * p));
                area += a;
            }
        }
        let compactness = if area > 0.0 { weighted / area } else { 0.0 };
        Ok(MapCharacteristics {
            border_length,
            compactness,
        })
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::GeographicDistance;
    use crate::kernel::{Kernel, KernelKind};
    use crate::survey::{Answer, MapId};
    use crate::weights::VariantWeights;
    use std::sync::Arc;

    /// Four locations in a row; the two western ones say 1, the eastern ones 2.
    fn row_map(bandwidth: &str) -> AreaClassMap {
        let locations: Vec<Location> = (0..4)
            .map(|i| Location::new(i, 0.0, f64::from(i) * 0.1))
            .collect();
        let answers: Vec<Answer> = (0..4)
            .map(|i| Answer::new(i, if i < 2 { 1 } else { 2 }, 1.0))
            .collect();
        let weights = VariantWeights::from_answers(
            MapId(1),
            &locations,
            &[VariantId(1), VariantId(2)],
            &answers,
        )
        .unwrap();
        let kernel = Kernel::new(
            KernelKind::Gaussian,
            Arc::new(GeographicDistance::new()),
            bandwidth.parse().unwrap(),
        )
        .unwrap();
        AreaClassMap::new(KernelDensityEstimation::new(Arc::new(weights), kernel))
    }

    fn row_tessellation() -> Tessellation {
        (0..4u32)
            .fold(Tessellation::new(), |t, i| t.with_cell(LocationId(i), 1.0, 4.0))
            .with_border(LocationId(0), LocationId(1), 1.0)
            .with_border(LocationId(1), LocationId(2), 1.0)
            .with_border(LocationId(2), LocationId(3), 1.0)
    }

    #[test]
    fn test_dominants_follow_answers() {
        let map = row_map("5");
        let d = map.dominants().unwrap();
        let variants: Vec<_> = d.iter().map(|x| x.unwrap().variant).collect();
        assert_eq!(
            variants,
            vec![VariantId(1), VariantId(1), VariantId(2), VariantId(2)]
        );
        assert!(d.iter().all(|x| {
            let x = x.unwrap();
            x.intensity > 0.5 && x.intensity <= 1.0
        }));
        assert_eq!(map.key(), "map_id=1:relative_frequency:gaussian:distances=geographic:bandwidth=5");
    }

    #[test]
    fn test_evaluate_matches_lazy() {
        let a = row_map("8");
        let b = row_map("8");
        a.evaluate(&WorkerPool::sequential().unwrap()).unwrap();
        assert_eq!(a.dominants().unwrap(), b.dominants().unwrap());
        assert_eq!(
            a.dominant(LocationId(3)).unwrap().map(|d| d.variant),
            Some(VariantId(2))
        );
        assert!(a.dominant(LocationId(99)).is_err());
    }

    #[test]
    fn test_characteristics_two_regions() {
        let map = row_map("5");
        let c = row_tessellation().characteristics(&map).unwrap();
        assert_eq!(c.border_length, 1.0);
        // Each region: two unit squares, area 2, perimeter 6.
        let expected = 4.0 * PI * 2.0 / 36.0;
        assert!((c.compactness - expected).abs() < 1e-12);
    }

    #[test]
    fn test_single_region_has_no_border() {
        let locations: Vec<Location> = (0..4)
            .map(|i| Location::new(i, 0.0, f64::from(i) * 0.1))
            .collect();
        let answers: Vec<Answer> = (0..4).map(|i| Answer::new(i, 1, 1.0)).collect();
        let weights =
            VariantWeights::from_answers(MapId(1), &locations, &[VariantId(1)], &answers).unwrap();
        let kernel = Kernel::new(
            KernelKind::Gaussian,
            Arc::new(GeographicDistance::new()),
            "5".parse().unwrap(),
        )
        .unwrap();
        let map = AreaClassMap::new(KernelDensityEstimation::new(Arc::new(weights), kernel));
        let c = row_tessellation().characteristics(&map).unwrap();
        assert_eq!(c.border_length, 0.0);
        let expected = 4.0 * PI * 4.0 / 100.0;
        assert!((c.compactness - expected).abs() < 1e-12);
    }
}
