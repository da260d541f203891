//! Relative-frequency weights of variants per location.
//!
//! Two stages:
//!
//! 1. [`VariantWeights::from_answers`] / [`VariantWeights::extract`] turn raw
//!    `(location, variant, count)` triples into counts per location.
//! 2. [`VariantWeights::aggregate`] re-maps variants through a
//!    [`LevelMapping`] into coarser categories, dropping discarded answers.
//!
//! ```text
//! weight(v, loc) = count(v, loc) / total(loc)      (0 when absent)
//! ```
//!
//! A variant entry exists at a location only when its count is positive.
//! Locations with `total == 0` are placeholders added by
//! [`VariantWeights::enforce_location`] so that several weight sets share one
//! location set.

use crate::error::{Error, Result};
use crate::survey::{Answer, LevelId, Location, LocationId, MapId, SurveyStore, VariantId};
use std::collections::{BTreeMap, BTreeSet};

/// Identification of weights built directly from answers.
pub const RELATIVE_FREQUENCY: &str = "relative_frequency";

#[derive(Debug, Clone)]
struct LocationCounts {
    location: Location,
    counts: BTreeMap<VariantId, f64>,
    total: f64,
}

/// Per-location variant counts of one map at one aggregation level.
#[derive(Debug, Clone)]
pub struct VariantWeights {
    map: MapId,
    identification: String,
    variants: Vec<VariantId>,
    entries: BTreeMap<LocationId, LocationCounts>,
}

impl VariantWeights {
    /// Build weights from answer triples.
    ///
    /// `variants` lists the variants of the map (answered or not). Answers
    /// with non-positive counts are ignored; answers at unknown locations are
    /// an error.
    pub fn from_answers(
        map: MapId,
        locations: &[Location],
        variants: &[VariantId],
        answers: &[Answer],
    ) -> Result<Self> {
        let by_id: BTreeMap<LocationId, &Location> =
            locations.iter().map(|l| (l.id, l)).collect();
        let mut variant_set: BTreeSet<VariantId> = variants.iter().copied().collect();
        let mut entries: BTreeMap<LocationId, LocationCounts> = BTreeMap::new();

        for answer in answers {
            if !(answer.count > 0.0) {
                continue;
            }
            let location = by_id.get(&answer.location).ok_or_else(|| {
                Error::Precondition(format!(
                    "answer for map {map} at unknown location {}",
                    answer.location
                ))
            })?;
            variant_set.insert(answer.variant);
            let entry = entries
                .entry(answer.location)
                .or_insert_with(|| LocationCounts {
                    location: **location,
                    counts: BTreeMap::new(),
                    total: 0.0,
                });
            *entry.counts.entry(answer.variant).or_insert(0.0) += answer.count;
            entry.total += answer.count;
        }

        Ok(Self {
            map,
            identification: RELATIVE_FREQUENCY.to_string(),
            variants: variant_set.into_iter().collect(),
            entries,
        })
    }

    /// Load the answers of `map` from the store.
    pub fn extract(store: &dyn SurveyStore, map: MapId) -> Result<Self> {
        let locations = store.locations()?;
        let variants = store.variants(map)?;
        let answers = store.answers(map)?;
        log::debug!(
            "map {map}: {} answers over {} variants",
            answers.len(),
            variants.len()
        );
        Self::from_answers(map, &locations, &variants, &answers)
    }

    /// Re-map variants through `mapping`.
    ///
    /// Counts of variants mapped to the same target are summed; answers whose
    /// variant maps to nothing are removed from counts and totals. Every
    /// location of `self` is kept, becoming a placeholder if all its answers
    /// were discarded.
    pub fn aggregate(&self, mapping: &LevelMapping) -> Result<Self> {
        let mut variants = BTreeSet::new();
        for &v in &self.variants {
            if let Some(target) = mapping.target(v)? {
                variants.insert(target);
            }
        }

        let mut entries = BTreeMap::new();
        for (&id, entry) in &self.entries {
            let mut counts: BTreeMap<VariantId, f64> = BTreeMap::new();
            let mut total = 0.0;
            for (&v, &c) in &entry.counts {
                if let Some(target) = mapping.target(v)? {
                    *counts.entry(target).or_insert(0.0) += c;
                    total += c;
                }
            }
            entries.insert(
                id,
                LocationCounts {
                    location: entry.location,
                    counts,
                    total,
                },
            );
        }

        Ok(Self {
            map: self.map,
            identification: format!("level_id={}:{}", mapping.level, self.identification),
            variants: variants.into_iter().collect(),
            entries,
        })
    }

    /// Map these weights belong to.
    pub fn map(&self) -> MapId {
        self.map
    }

    /// Identification string used in bandwidth keys.
    pub fn identification(&self) -> &str {
        &self.identification
    }

    /// Variants, ascending.
    pub fn variants(&self) -> &[VariantId] {
        &self.variants
    }

    /// All locations, placeholders included, ascending by id.
    pub fn locations(&self) -> impl Iterator<Item = &Location> + '_ {
        self.entries.values().map(|e| &e.location)
    }

    /// Location ids, ascending.
    pub fn location_ids(&self) -> Vec<LocationId> {
        self.entries.keys().copied().collect()
    }

    /// Number of locations, placeholders included.
    pub fn location_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of locations with at least one answer.
    pub fn observed_location_count(&self) -> usize {
        self.entries.values().filter(|e| e.total > 0.0).count()
    }

    /// Whether the location is present (observed or placeholder).
    pub fn contains_location(&self, id: LocationId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Raw count of `variant` at `location`.
    pub fn count(&self, variant: VariantId, location: LocationId) -> f64 {
        self.entries
            .get(&location)
            .and_then(|e| e.counts.get(&variant))
            .copied()
            .unwrap_or(0.0)
    }

    /// Total count at `location`.
    pub fn total(&self, location: LocationId) -> f64 {
        self.entries.get(&location).map_or(0.0, |e| e.total)
    }

    /// Relative frequency of `variant` at `location`.
    pub fn weight(&self, variant: VariantId, location: LocationId) -> f64 {
        match self.entries.get(&location) {
            Some(e) if e.total > 0.0 => e.counts.get(&variant).map_or(0.0, |c| c / e.total),
            _ => 0.0,
        }
    }

    /// `(variant, weight)` pairs present at `location`.
    pub fn weights_at(&self, location: LocationId) -> Vec<(VariantId, f64)> {
        match self.entries.get(&location) {
            Some(e) if e.total > 0.0 => e.counts.iter().map(|(&v, &c)| (v, c / e.total)).collect(),
            _ => Vec::new(),
        }
    }

    /// `(location, weight)` pairs where `variant` occurs.
    pub fn occurrences(&self, variant: VariantId) -> Vec<(&Location, f64)> {
        self.entries
            .values()
            .filter_map(|e| {
                let c = *e.counts.get(&variant)?;
                Some((&e.location, c / e.total))
            })
            .collect()
    }

    /// Fraction of observed locations where `variant` occurs.
    pub fn location_share(&self, variant: VariantId) -> f64 {
        let observed = self.observed_location_count();
        if observed == 0 {
            return 0.0;
        }
        let with_variant = self
            .entries
            .values()
            .filter(|e| e.counts.contains_key(&variant))
            .count();
        with_variant as f64 / observed as f64
    }

    /// Add `location` as a zero-weight placeholder if absent.
    pub fn enforce_location(&mut self, location: Location) {
        self.entries
            .entry(location.id)
            .or_insert_with(|| LocationCounts {
                location,
                counts: BTreeMap::new(),
                total: 0.0,
            });
    }

    /// Give every weight set the union of all their locations.
    pub fn enforce_locations(all: &mut [VariantWeights]) {
        let mut union: BTreeMap<LocationId, Location> = BTreeMap::new();
        for w in all.iter() {
            for l in w.locations() {
                union.entry(l.id).or_insert(*l);
            }
        }
        for w in all.iter_mut() {
            for l in union.values() {
                w.enforce_location(*l);
            }
        }
    }
}

/// Variant mapping table of one aggregation level.
#[derive(Debug, Clone)]
pub struct LevelMapping {
    level: LevelId,
    table: BTreeMap<VariantId, Option<VariantId>>,
}

impl LevelMapping {
    /// Empty mapping for `level`.
    pub fn new(level: LevelId) -> Self {
        Self {
            level,
            table: BTreeMap::new(),
        }
    }

    /// Map `from` to `to`; `None` discards answers with `from`.
    pub fn with(mut self, from: VariantId, to: Option<VariantId>) -> Self {
        self.table.insert(from, to);
        self
    }

    /// Load the mapping of every variant of `weights` from the store.
    pub fn load(store: &dyn SurveyStore, level: LevelId, weights: &VariantWeights) -> Result<Self> {
        let mut mapping = Self::new(level);
        for &v in weights.variants() {
            mapping.table.insert(v, store.level_mapping(v, level)?);
        }
        Ok(mapping)
    }

    /// Aggregation level.
    pub fn level(&self) -> LevelId {
        self.level
    }

    /// Target of `variant`; unmapped variants are an error.
    pub fn target(&self, variant: VariantId) -> Result<Option<VariantId>> {
        self.table.get(&variant).copied().ok_or_else(|| {
            Error::Precondition(format!(
                "level {} has no mapping for variant {variant}",
                self.level
            ))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn locations() -> Vec<Location> {
        vec![
            Location::new(1, 48.0, 11.0),
            Location::new(2, 48.1, 11.1),
            Location::new(3, 48.2, 11.2),
        ]
    }

    fn variants() -> Vec<VariantId> {
        vec![VariantId(10), VariantId(11), VariantId(12)]
    }

    fn sample() -> VariantWeights {
        let answers = vec![
            Answer::new(1, 10, 3.0),
            Answer::new(1, 11, 1.0),
            Answer::new(2, 11, 2.0),
            Answer::new(2, 12, 0.0),
        ];
        VariantWeights::from_answers(MapId(7), &locations(), &variants(), &answers).unwrap()
    }

    #[test]
    fn test_relative_frequencies() {
        let w = sample();
        assert_eq!(w.identification(), "relative_frequency");
        assert!((w.weight(VariantId(10), LocationId(1)) - 0.75).abs() < 1e-12);
        assert!((w.weight(VariantId(11), LocationId(1)) - 0.25).abs() < 1e-12);
        assert_eq!(w.weight(VariantId(11), LocationId(2)), 1.0);
        assert_eq!(w.weight(VariantId(12), LocationId(2)), 0.0);
        assert_eq!(w.location_count(), 2);
        assert_eq!(w.variants(), &variants()[..]);
    }

    #[test]
    fn test_zero_counts_create_no_entry() {
        let w = sample();
        assert!(w.weights_at(LocationId(2)).iter().all(|&(v, _)| v != VariantId(12)));
    }

    #[test]
    fn test_unknown_location_rejected() {
        let answers = vec![Answer::new(99, 10, 1.0)];
        let err = VariantWeights::from_answers(MapId(1), &locations(), &variants(), &answers)
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn test_aggregate_merges_and_discards() {
        let mapping = LevelMapping::new(LevelId(3))
            .with(VariantId(10), Some(VariantId(100)))
            .with(VariantId(11), Some(VariantId(100)))
            .with(VariantId(12), None);
        let w = sample().aggregate(&mapping).unwrap();
        assert_eq!(w.identification(), "level_id=3:relative_frequency");
        assert_eq!(w.variants(), &[VariantId(100)]);
        assert_eq!(w.weight(VariantId(100), LocationId(1)), 1.0);
        assert_eq!(w.total(LocationId(1)), 4.0);
    }

    #[test]
    fn test_aggregate_discarding_everything_leaves_placeholder() {
        let mapping = LevelMapping::new(LevelId(1))
            .with(VariantId(10), Some(VariantId(10)))
            .with(VariantId(11), None)
            .with(VariantId(12), None);
        let w = sample().aggregate(&mapping).unwrap();
        assert!(w.contains_location(LocationId(2)));
        assert_eq!(w.total(LocationId(2)), 0.0);
        assert_eq!(w.observed_location_count(), 1);
    }

    #[test]
    fn test_aggregate_requires_complete_mapping() {
        let mapping = LevelMapping::new(LevelId(1)).with(VariantId(10), None);
        assert!(sample().aggregate(&mapping).is_err());
    }

    #[test]
    fn test_enforce_locations_synchronizes() {
        let a = sample();
        let b = VariantWeights::from_answers(
            MapId(8),
            &locations(),
            &variants(),
            &[Answer::new(3, 10, 1.0)],
        )
        .unwrap();
        let mut all = vec![a, b];
        VariantWeights::enforce_locations(&mut all);
        assert_eq!(all[0].location_ids(), all[1].location_ids());
        assert_eq!(all[0].location_count(), 3);
        assert_eq!(all[0].total(LocationId(3)), 0.0);
        assert_eq!(all[0].weights_at(LocationId(3)), vec![]);
    }

    #[test]
    fn test_location_share() {
        let w = sample();
        assert_eq!(w.location_share(VariantId(11)), 1.0);
        assert_eq!(w.location_share(VariantId(10)), 0.5);
        assert_eq!(w.location_share(VariantId(12)), 0.0);
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_one(
            raw in prop::collection::vec((1u32..=3, 10u32..=12, 0.0f64..20.0), 1..40)
        ) {
            let answers: Vec<Answer> = raw.iter().map(|&(l, v, c)| Answer::new(l, v, c)).collect();
            let w = VariantWeights::from_answers(MapId(1), &locations(), &variants(), &answers).unwrap();
            for loc in w.location_ids() {
                if w.total(loc) > 0.0 {
                    let sum: f64 = w.variants().iter().map(|&v| w.weight(v, loc)).sum();
                    prop_assert!((sum - 1.0).abs() < 1e-9);
                }
            }
        }

        #[test]
        fn prop_aggregated_weights_sum_to_one(
            raw in prop::collection::vec((1u32..=3, 10u32..=12, 0.0f64..20.0), 1..40),
            targets in prop::collection::vec(prop::option::of(20u32..=21), 3),
        ) {
            let answers: Vec<Answer> = raw.iter().map(|&(l, v, c)| Answer::new(l, v, c)).collect();
            let base = VariantWeights::from_answers(MapId(1), &locations(), &variants(), &answers).unwrap();
            let mapping = variants()
                .into_iter()
                .zip(&targets)
                .fold(LevelMapping::new(LevelId(1)), |m, (v, t)| m.with(v, t.map(VariantId)));
            let w = base.aggregate(&mapping).unwrap();
            prop_assert_eq!(w.location_count(), base.location_count());
            for loc in w.location_ids() {
                prop_assert!(w.total(loc) <= base.total(loc));
                if w.total(loc) > 0.0 {
                    let sum: f64 = w.variants().iter().map(|&v| w.weight(v, loc)).sum();
                    prop_assert!((sum - 1.0).abs() < 1e-9);
                } else {
                    prop_assert!(w.variants().iter().all(|&v| w.weight(v, loc) == 0.0));
                }
            }
        }
    }
}
