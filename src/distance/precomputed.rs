//! Distances loaded from an external table rather than coordinates.

use super::{triangular_index, DistanceId, DistanceMeasure};
use crate::error::{Error, Result};
use crate::survey::{Location, LocationId, SurveyStore};
use std::sync::Arc;

/// Precomputed distance (e.g. linguistic distances of one level and group).
///
/// Uncached instances ask the store per pair. Cached instances load the
/// whole table into a dense triangular matrix at construction; afterwards
/// the matrix is read-only and the store is not consulted.
pub struct PrecomputedDistance {
    id: DistanceId,
    source: Source,
}

enum Source {
    Store(Arc<dyn SurveyStore>),
    Table(DenseTable),
}

struct DenseTable {
    min_id: u32,
    size: usize,
    values: Vec<f64>,
}

impl DenseTable {
    fn index(&self, a: LocationId, b: LocationId) -> Option<usize> {
        let i = a.0.checked_sub(self.min_id)? as usize;
        let j = b.0.checked_sub(self.min_id)? as usize;
        if i >= self.size || j >= self.size || i == j {
            return None;
        }
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        Some(triangular_index(hi, lo))
    }
}

impl PrecomputedDistance {
    /// Query the store for each pair.
    pub fn uncached(id: DistanceId, store: Arc<dyn SurveyStore>) -> Self {
        Self {
            id,
            source: Source::Store(store),
        }
    }

    /// Load the table for `locations` from the store.
    pub fn cached(id: DistanceId, store: &dyn SurveyStore, locations: &[Location]) -> Result<Self> {
        let rows = store.precomputed_distances(&id)?;
        Self::from_rows(id, locations, rows)
    }

    /// Build a cached instance from `(id1, id2, value)` rows with `id1 < id2`.
    ///
    /// Rows outside the id range of `locations` are skipped; rows violating
    /// the ordering are rejected.
    pub fn from_rows(
        id: DistanceId,
        locations: &[Location],
        rows: impl IntoIterator<Item = (LocationId, LocationId, f64)>,
    ) -> Result<Self> {
        let min_id = locations.iter().map(|l| l.id.0).min().ok_or(Error::EmptyInput)?;
        let max_id = locations.iter().map(|l| l.id.0).max().ok_or(Error::EmptyInput)?;
        let size = (max_id - min_id) as usize + 1;
        let mut table = DenseTable {
            min_id,
            size,
            values: vec![f64::NAN; size * (size - 1) / 2],
        };
        let mut loaded = 0usize;
        for (id1, id2, value) in rows {
            if id1 >= id2 {
                return Err(Error::InvalidDistanceTable { id1, id2 });
            }
            if let Some(idx) = table.index(id1, id2) {
                table.values[idx] = value;
                loaded += 1;
            }
        }
        log::debug!("distance {id}: loaded {loaded} precomputed values");
        Ok(Self {
            id,
            source: Source::Table(table),
        })
    }

    fn missing(&self, a: LocationId, b: LocationId) -> Error {
        Error::MissingDistance {
            distance: self.id.to_string(),
            a,
            b,
        }
    }
}

impl DistanceMeasure for PrecomputedDistance {
    fn identification(&self) -> DistanceId {
        self.id.clone()
    }

    fn distance(&self, a: &Location, b: &Location) -> Result<f64> {
        if a.id == b.id {
            return Ok(0.0);
        }
        let (lo, hi) = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
        match &self.source {
            Source::Store(store) => store
                .find_precomputed_distance(&self.id, lo, hi)?
                .ok_or_else(|| self.missing(lo, hi)),
            Source::Table(table) => table
                .index(lo, hi)
                .map(|idx| table.values[idx])
                .filter(|v| !v.is_nan())
                .ok_or_else(|| self.missing(lo, hi)),
        }
    }

    fn point_distance(&self, _a: (f64, f64), _b: (f64, f64)) -> Result<f64> {
        Err(Error::UnsupportedQuery(
            "precomputed distances exist only between known locations",
        ))
    }
}

impl core::fmt::Debug for PrecomputedDistance {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cached = matches!(self.source, Source::Table(_));
        f.debug_struct("PrecomputedDistance")
            .field("id", &self.id)
            .field("cached", &cached)
            .finish()
    }
}
