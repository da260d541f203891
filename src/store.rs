//! In-memory [`SurveyStore`].
//!
//! Backs tests and small embedded analyses. Concurrent readers and writers
//! share the maps through `dashmap`; a read-only switch makes
//! [`SurveyStore::save_bandwidth`] fail the way a read-only database would.

use crate::bandwidth::Bandwidth;
use crate::distance::DistanceId;
use crate::error::{Error, Result};
use crate::survey::{
    Answer, BandwidthKey, LevelId, Location, LocationId, MapId, SurveyStore, VariantId,
};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Survey data held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    locations: DashMap<LocationId, Location>,
    variants: DashMap<MapId, BTreeSet<VariantId>>,
    answers: DashMap<MapId, Vec<Answer>>,
    level_mappings: DashMap<(VariantId, LevelId), Option<VariantId>>,
    distances: DashMap<(String, LocationId, LocationId), f64>,
    bandwidths: DashMap<BandwidthKey, Bandwidth>,
    read_only: AtomicBool,
    bandwidth_saves: AtomicUsize,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a location.
    pub fn insert_location(&self, location: Location) {
        self.locations.insert(location.id, location);
    }

    /// Declare a variant of `map`.
    pub fn insert_variant(&self, map: MapId, variant: VariantId) {
        self.variants.entry(map).or_default().insert(variant);
    }

    /// Record an answer; its variant is declared as well.
    pub fn insert_answer(&self, map: MapId, answer: Answer) {
        self.insert_variant(map, answer.variant);
        self.answers.entry(map).or_default().push(answer);
    }

    /// Map `from` to `to` at `level`; `None` discards.
    pub fn insert_level_mapping(&self, from: VariantId, level: LevelId, to: Option<VariantId>) {
        self.level_mappings.insert((from, level), to);
    }

    /// Store a precomputed distance row. Requires `a < b`.
    pub fn insert_distance(
        &self,
        distance: &DistanceId,
        a: LocationId,
        b: LocationId,
        value: f64,
    ) -> Result<()> {
        if a >= b {
            return Err(Error::InvalidDistanceTable { id1: a, id2: b });
        }
        self.distances.insert((distance.to_string(), a, b), value);
        Ok(())
    }

    /// Reject all bandwidth saves from now on.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of successful bandwidth saves.
    pub fn bandwidth_saves(&self) -> usize {
        self.bandwidth_saves.load(Ordering::SeqCst)
    }
}

impl SurveyStore for MemoryStore {
    fn locations(&self) -> Result<Vec<Location>> {
        let mut out: Vec<Location> = self.locations.iter().map(|e| *e.value()).collect();
        out.sort_by_key(|l| l.id);
        Ok(out)
    }

    fn variants(&self, map: MapId) -> Result<Vec<VariantId>> {
        Ok(self
            .variants
            .get(&map)
            .map(|v| v.iter().copied().collect())
            .unwrap_or_default())
    }

    fn answers(&self, map: MapId) -> Result<Vec<Answer>> {
        Ok(self.answers.get(&map).map(|a| a.clone()).unwrap_or_default())
    }

    fn level_mapping(&self, variant: VariantId, level: LevelId) -> Result<Option<VariantId>> {
        self.level_mappings
            .get(&(variant, level))
            .map(|e| *e.value())
            .ok_or_else(|| Error::Store(format!("no mapping for variant {variant} at level {level}")))
    }

    fn find_precomputed_distance(
        &self,
        distance: &DistanceId,
        a: LocationId,
        b: LocationId,
    ) -> Result<Option<f64>> {
        if a >= b {
            return Err(Error::InvalidDistanceTable { id1: a, id2: b });
        }
        Ok(self
            .distances
            .get(&(distance.to_string(), a, b))
            .map(|e| *e.value()))
    }

    fn precomputed_distances(
        &self,
        distance: &DistanceId,
    ) -> Result<Vec<(LocationId, LocationId, f64)>> {
        let id = distance.to_string();
        let mut rows: Vec<_> = self
            .distances
            .iter()
            .filter(|e| e.key().0 == id)
            .map(|e| (e.key().1, e.key().2, *e.value()))
            .collect();
        rows.sort_by_key(|&(a, b, _)| (a, b));
        Ok(rows)
    }

    fn find_bandwidth(&self, key: &BandwidthKey) -> Result<Option<Bandwidth>> {
        Ok(self.bandwidths.get(key).map(|e| *e.value()))
    }

    fn save_bandwidth(&self, key: &BandwidthKey, bandwidth: &Bandwidth) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::Store("store is read-only".into()));
        }
        self.bandwidths.insert(key.clone(), *bandwidth);
        self.bandwidth_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> BandwidthKey {
        BandwidthKey {
            map: MapId(1),
            weights: "relative_frequency".into(),
            kernel: "gaussian".into(),
            distance: "geographic".into(),
            estimator: "least_squares_cross_validation".into(),
        }
    }

    #[test]
    fn test_bandwidth_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.find_bandwidth(&key()).unwrap(), None);
        let b: Bandwidth = "12.5".parse().unwrap();
        store.save_bandwidth(&key(), &b).unwrap();
        assert_eq!(store.find_bandwidth(&key()).unwrap(), Some(b));
        assert_eq!(store.bandwidth_saves(), 1);
    }

    #[test]
    fn test_read_only_rejects_save() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        assert!(matches!(
            store.save_bandwidth(&key(), &Bandwidth::ONE),
            Err(Error::Store(_))
        ));
        assert_eq!(store.bandwidth_saves(), 0);
    }

    #[test]
    fn test_answers_declare_variants() {
        let store = MemoryStore::new();
        store.insert_variant(MapId(1), VariantId(3));
        store.insert_answer(MapId(1), Answer::new(1, 2, 1.0));
        assert_eq!(
            store.variants(MapId(1)).unwrap(),
            vec![VariantId(2), VariantId(3)]
        );
        assert_eq!(store.answers(MapId(1)).unwrap().len(), 1);
        assert!(store.answers(MapId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_distance_rows_ordered() {
        let store = MemoryStore::new();
        let id = DistanceId::Precomputed("x".into());
        assert!(store
            .insert_distance(&id, LocationId(2), LocationId(2), 0.0)
            .is_err());
        store
            .insert_distance(&id, LocationId(1), LocationId(2), 0.5)
            .unwrap();
        assert_eq!(
            store
                .find_precomputed_distance(&id, LocationId(1), LocationId(2))
                .unwrap(),
            Some(0.5)
        );
        assert_eq!(store.precomputed_distances(&id).unwrap().len(), 1);
    }
}
