use crate::survey::LocationId;

/// Result alias for `areal`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by density estimation, map distances and clustering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// A precomputed distance has no entry for the requested pair.
    ///
    /// Never collapsed into a zero distance: a missing linguistic distance
    /// is a data-setup bug, not a claim that two locations are identical.
    #[error("no distance '{distance}' between locations {a} and {b}")]
    MissingDistance {
        /// Identification of the distance table.
        distance: String,
        /// First location.
        a: LocationId,
        /// Second location.
        b: LocationId,
    },

    /// The distance measure cannot answer this kind of query.
    #[error("unsupported distance query: {0}")]
    UnsupportedQuery(&'static str),

    /// A distance table row violates the `id1 < id2` ordering.
    #[error("distance table row ({id1}, {id2}) violates id1 < id2")]
    InvalidDistanceTable {
        /// First id of the offending row.
        id1: LocationId,
        /// Second id of the offending row.
        id2: LocationId,
    },

    /// Two maps (or a map and a cached geometry) cover different locations.
    #[error("location sets differ: {left} vs {right} locations")]
    LocationSetMismatch {
        /// Location count on the left side.
        left: usize,
        /// Location count on the right side.
        right: usize,
    },

    /// Sector geometry was cached for a different location set.
    #[error("sector geometry was built for another location set")]
    InconsistentSectorCache,

    /// A component was configured with inputs it cannot handle.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A bandwidth string could not be parsed, or is not positive where required.
    #[error("invalid bandwidth '{0}'")]
    InvalidBandwidth(String),

    /// An identification string does not follow the key grammar.
    #[error("invalid identification '{0}'")]
    InvalidIdentification(String),

    /// The termination criterion needs the object distance matrix of a cached linkage.
    #[error("termination criterion requires a cached linkage")]
    RequiresCachedLinkage,

    /// Centroid-based linkage on objects without coordinates.
    #[error("linkage requires coordinates for object {0}")]
    MissingCoordinates(usize),

    /// The record store failed.
    #[error("store error: {0}")]
    Store(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
