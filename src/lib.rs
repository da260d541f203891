//! # areal
//!
//! Area-class maps for geolinguistic survey data: kernel density estimation
//! over per-location answer counts, automatic bandwidth selection, distances
//! between the resulting maps and hierarchical clustering of maps.
//!
//! Persistence, map geometry and plotting are external; they are reached
//! through [`SurveyStore`] and [`Tessellation`].
//!
//! **Default build** evaluates candidates and maps in parallel with `rayon`.
//! Disable the `parallel` feature for a single-threaded build.

pub mod analysis;
pub mod areal;
pub mod bandwidth;
pub mod cluster;
pub mod config;
pub mod density;
pub mod distance;
/// Error types used across `areal`.
pub mod error;
pub mod kernel;
pub mod map_distance;
pub mod parallel;
pub mod store;
pub mod survey;
pub mod weights;


pub use crate::analysis::Analysis;
pub use crate::areal::{AreaClassMap, ClassMap, Dominant, MapCharacteristics, Tessellation};
pub use crate::bandwidth::{
    Bandwidth, BandwidthEstimator, EstimatorKind, LeastSquaresCrossValidation,
    LikelihoodCrossValidation, MinComplexityMaxFidelity, RuleOfThumb,
};
pub use crate::cluster::{
    Agglomerative, CachedLinkage, Cluster, ClusteringResult, DirectLinkage, Linkage,
    TerminationCriterion,
};
pub use crate::config::AnalysisConfig;
pub use crate::density::KernelDensityEstimation;
pub use crate::distance::{DistanceId, DistanceMeasure, GeographicDistance, PrecomputedDistance};
pub use crate::kernel::{Kernel, KernelFamily, KernelKind};
pub use crate::map_distance::{MapDistance, MapDistanceKind, RelativeIntensityMethod, SectorMethod};
pub use crate::parallel::WorkerPool;
pub use crate::store::MemoryStore;
pub use crate::survey::{Answer, Location, LocationId, MapId, SurveyStore, VariantId};
pub use crate::weights::{LevelMapping, VariantWeights};
pub use error::{Error, Result};
