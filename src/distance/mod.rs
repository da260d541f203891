//! Distances between survey locations.
//!
//! | Measure | Source | Cache |
//! |---------|--------|-------|
//! | [`GeographicDistance`] | great-circle distance (km) from lat/long | optional, filled on demand |
//! | [`PrecomputedDistance`] | external table (e.g. linguistic distances) | optional, filled at construction |
//!
//! Every measure is symmetric with `distance(x, x) == 0`. A missing
//! precomputed value is [`Error::MissingDistance`](crate::Error::MissingDistance),
//! never zero.

mod geographic;
mod precomputed;

pub use geographic::{haversine_km, GeographicDistance, EARTH_RADIUS_KM};
pub use precomputed::PrecomputedDistance;

use crate::error::{Error, Result};
use crate::survey::{LevelId, Location};
use core::fmt;
use core::str::FromStr;

/// Distance between two locations.
pub trait DistanceMeasure: Send + Sync {
    /// Identification used in kernel and bandwidth keys.
    fn identification(&self) -> DistanceId;

    /// Distance between two known locations.
    fn distance(&self, a: &Location, b: &Location) -> Result<f64>;

    /// Distance between two arbitrary coordinates `(latitude, longitude)`.
    fn point_distance(&self, a: (f64, f64), b: (f64, f64)) -> Result<f64>;
}

/// Tagged identification of a distance measure.
///
/// ```text
/// geographic
/// linguistic:level_id=3:group_id=7
/// precomputed:name=phonetic_2019
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DistanceId {
    /// Great-circle distance.
    Geographic,
    /// Linguistic distances of one aggregation level and map group.
    Linguistic {
        /// Aggregation level.
        level: LevelId,
        /// Map group.
        group: u32,
    },
    /// Any other precomputed table, by name.
    Precomputed(String),
}

impl fmt::Display for DistanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceId::Geographic => write!(f, "geographic"),
            DistanceId::Linguistic { level, group } => {
                write!(f, "linguistic:level_id={level}:group_id={group}")
            }
            DistanceId::Precomputed(name) => write!(f, "precomputed:name={name}"),
        }
    }
}

impl FromStr for DistanceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidIdentification(s.to_string());
        if s == "geographic" {
            return Ok(DistanceId::Geographic);
        }
        if let Some(rest) = s.strip_prefix("linguistic:") {
            let (level, group) = rest.split_once(':').ok_or_else(invalid)?;
            let level = level
                .strip_prefix("level_id=")
                .and_then(|v| v.parse().ok())
                .ok_or_else(invalid)?;
            let group = group
                .strip_prefix("group_id=")
                .and_then(|v| v.parse().ok())
                .ok_or_else(invalid)?;
            return Ok(DistanceId::Linguistic {
                level: LevelId(level),
                group,
            });
        }
        if let Some(name) = s.strip_prefix("precomputed:name=") {
            if !name.is_empty() && !name.contains(':') {
                return Ok(DistanceId::Precomputed(name.to_string()));
            }
        }
        Err(invalid())
    }
}

/// Index into a strictly lower-triangular matrix without diagonal, `i > j`.
#[inline]
pub(crate) fn triangular_index(i: usize, j: usize) -> usize {
    debug_assert!(i > j);
    i * (i - 1) / 2 + j
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identification_golden_strings() {
        assert_eq!(DistanceId::Geographic.to_string(), "geographic");
        let ling = DistanceId::Linguistic {
            level: LevelId(3),
            group: 7,
        };
        assert_eq!(ling.to_string(), "linguistic:level_id=3:group_id=7");
        assert_eq!(
            DistanceId::Precomputed("phonetic".into()).to_string(),
            "precomputed:name=phonetic"
        );
    }

    #[test]
    fn test_identification_parses_back() {
        for s in [
            "geographic",
            "linguistic:level_id=3:group_id=7",
            "precomputed:name=phonetic",
        ] {
            assert_eq!(s.parse::<DistanceId>().unwrap().to_string(), s);
        }
        for s in ["", "linguistic:level_id=3", "linguistic:group_id=7:level_id=3", "euclid"] {
            assert!(s.parse::<DistanceId>().is_err(), "{s}");
        }
    }

    #[test]
    fn test_triangular_index_is_dense() {
        let mut seen = Vec::new();
        for i in 1..5 {
            for j in 0..i {
                seen.push(triangular_index(i, j));
            }
        }
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}
