//! Hierarchical clustering of arbitrary objects.
//!
//! Bottom-up: start with each object as its own cluster, repeatedly merge
//! the two closest clusters until a [`TerminationCriterion`] holds. The
//! merge history forms a **dendrogram**.
//!
//! ## Hard vs Fuzzy Clusters
//!
//! A [`Cluster`] maps objects to membership probabilities. Agglomeration
//! only produces hard clusters (probability 1). Fuzzy results from elsewhere
//! can be hardened with [`ClusteringResult::hard_result`]: every object
//! goes to its most probable cluster.
//!
//! ## Linkage
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact clusters |
//! | Average | weighted mean(pairwise) | Balanced compromise |
//! | Centroid | centroid distance | Needs coordinates |
//! | Ward | centroid distance × harmonic mean weight | Favors merging small clusters |
//!
//! ## Usage
//!
//! ```rust
//! use areal::cluster::{Agglomerative, ClusterObject, DirectLinkage, Linkage, TerminationCriterion};
//!
//! struct Point(f64);
//! impl ClusterObject for Point {}
//!
//! let points: Vec<Point> = [0.0, 1.0, 2.0, 10.0, 11.0].into_iter().map(Point).collect();
//! let linkage = DirectLinkage::new(Linkage::Single, |a: &Point, b: &Point| -> areal::Result<f64> {
//!     Ok((a.0 - b.0).abs())
//! });
//! let out = Agglomerative::new(TerminationCriterion::NumberOfClusters(2))
//!     .fit(&points, &linkage)
//!     .unwrap();
//! assert_eq!(out.result().len(), 2);
//! ```

mod hierarchical;
mod linkage;
mod result;
mod termination;
mod traits;

pub use hierarchical::{Agglomeration, Agglomerative, Merge};
pub use linkage::{CachedLinkage, ClusterDistance, DirectLinkage, Linkage};
pub use result::{Cluster, ClusteringResult};
pub use termination::TerminationCriterion;
pub use traits::{ClusterObject, ObjectDistance};
