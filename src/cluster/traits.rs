//! Clustering traits.

use crate::error::Result;

/// Anything that can be clustered.
pub trait ClusterObject: Send + Sync {
    /// Weight of the object in average, centroid and Ward linkage.
    fn weight(&self) -> f64 {
        1.0
    }

    /// Coordinates for centroid-based linkage, if the object has any.
    fn coordinates(&self) -> Option<&[f64]> {
        None
    }
}

/// Distance between two clustered objects.
///
/// Implemented for closures `Fn(&T, &T) -> Result<f64>`.
pub trait ObjectDistance<T: ?Sized>: Send + Sync {
    /// Symmetric, non-negative distance.
    fn distance(&self, a: &T, b: &T) -> Result<f64>;
}

impl<T: ?Sized, F> ObjectDistance<T> for F
where
    F: Fn(&T, &T) -> Result<f64> + Send + Sync,
{
    fn distance(&self, a: &T, b: &T) -> Result<f64> {
        self(a, b)
    }
}
