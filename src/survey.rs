//! Survey data model and the record-store collaborator.
//!
//! Everything the core needs from persistence goes through [`SurveyStore`]:
//! enumerating locations and answers, level mapping tables, precomputed
//! distances, and persisted bandwidths. Keys are plain values and
//! identification strings; the store never sees kernels or estimators.

use crate::bandwidth::Bandwidth;
use crate::distance::DistanceId;
use crate::error::Result;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Identity of a survey location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub u32);

/// Identity of a variant (one linguistic form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantId(pub u32);

/// Identity of a map (one linguistic feature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MapId(pub u32);

/// Identity of an aggregation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelId(pub u32);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A survey location. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Identity.
    pub id: LocationId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Location {
    /// Create a location.
    pub fn new(id: u32, latitude: f64, longitude: f64) -> Self {
        Self {
            id: LocationId(id),
            latitude,
            longitude,
        }
    }
}

/// One observation: `count` informants at `location` gave `variant`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Where the answer was recorded.
    pub location: LocationId,
    /// The variant given.
    pub variant: VariantId,
    /// Number of informants (may be fractional when answers are split).
    pub count: f64,
}

impl Answer {
    /// Create an answer triple.
    pub fn new(location: u32, variant: u32, count: f64) -> Self {
        Self {
            location: LocationId(location),
            variant: VariantId(variant),
            count,
        }
    }
}

/// Lookup key of a persisted bandwidth.
///
/// Callers must build the identification parts the same way on read and
/// write; they are compared as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandwidthKey {
    /// Map the bandwidth was computed for.
    pub map: MapId,
    /// Identification of the weights (e.g. `level_id=3:relative_frequency`).
    pub weights: String,
    /// Kernel type identification (e.g. `gaussian`).
    pub kernel: String,
    /// Distance identification (e.g. `geographic`).
    pub distance: String,
    /// Estimator identification (e.g. `least_squares_cross_validation`).
    pub estimator: String,
}

impl fmt::Display for BandwidthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map={} weights={} kernel={} distance={} estimator={}",
            self.map, self.weights, self.kernel, self.distance, self.estimator
        )
    }
}

/// Narrow interface to the record store holding survey data.
pub trait SurveyStore: Send + Sync {
    /// All survey locations.
    fn locations(&self) -> Result<Vec<Location>>;

    /// Variants defined for a map, including those nobody answered.
    fn variants(&self, map: MapId) -> Result<Vec<VariantId>>;

    /// `(location, variant, count)` triples of a map.
    fn answers(&self, map: MapId) -> Result<Vec<Answer>>;

    /// Target of `variant` at aggregation `level`.
    ///
    /// `None` means answers with this variant are discarded at that level.
    fn level_mapping(&self, variant: VariantId, level: LevelId) -> Result<Option<VariantId>>;

    /// Precomputed distance between two locations, with `a < b`.
    fn find_precomputed_distance(
        &self,
        distance: &DistanceId,
        a: LocationId,
        b: LocationId,
    ) -> Result<Option<f64>>;

    /// All rows `(id1, id2, value)` of a precomputed distance table.
    fn precomputed_distances(&self, distance: &DistanceId)
        -> Result<Vec<(LocationId, LocationId, f64)>>;

    /// Persisted bandwidth. A stored zero means "not found".
    fn find_bandwidth(&self, key: &BandwidthKey) -> Result<Option<Bandwidth>>;

    /// Persist a bandwidth.
    fn save_bandwidth(&self, key: &BandwidthKey, bandwidth: &Bandwidth) -> Result<()>;
}
