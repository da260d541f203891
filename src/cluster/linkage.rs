//! Distance between clusters.
//!
//! | Linkage | Distance between `A` and `B` |
//! |---------|------------------------------|
//! | Single | `min d(a, b)` |
//! | Complete | `max d(a, b)` |
//! | Average | `Σ wₐ w_b d(a, b) / Σ wₐ w_b` |
//! | Centroid | `‖μ_A - μ_B‖` of the weighted centroids |
//! | Ward | `2 W_A W_B / (W_A + W_B) × ‖μ_A - μ_B‖` |
//!
//! `W` is the summed object weight of a cluster, so Ward scales the centroid
//! distance by the harmonic mean of the two cluster weights. Centroid and
//! Ward need [`ClusterObject::coordinates`].
//!
//! A [`DirectLinkage`] asks its [`ObjectDistance`] every time. A
//! [`CachedLinkage`] computes all object distances once, in parallel, and
//! keeps the matrix; termination criteria that inspect object distances
//! need one.

use super::result::Cluster;
use super::traits::{ClusterObject, ObjectDistance};
use crate::error::{Error, Result};
use crate::parallel::WorkerPool;
use ndarray::Array2;

/// Linkage method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage: weighted mean distance between clusters.
    Average,
    /// Distance between weighted centroids.
    Centroid,
    /// Centroid distance scaled by the harmonic mean of the cluster weights.
    Ward,
}

impl Linkage {
    /// Distance between clusters `a` and `b` from object distances `d`.
    pub fn combine<T, F>(&self, objects: &[T], a: &Cluster, b: &Cluster, mut d: F) -> Result<f64>
    where
        T: ClusterObject,
        F: FnMut(usize, usize) -> Result<f64>,
    {
        if a.is_empty() || b.is_empty() {
            return Err(Error::EmptyInput);
        }
        match self {
            Linkage::Single | Linkage::Complete => {
                let single = *self == Linkage::Single;
                let mut best = if single { f64::INFINITY } else { f64::NEG_INFINITY };
                for i in a.objects() {
                    for j in b.objects() {
                        let x = d(i, j)?;
                        best = if single { best.min(x) } else { best.max(x) };
                    }
                }
                Ok(best)
            }
            Linkage::Average => {
                let mut sum = 0.0;
                let mut norm = 0.0;
                for (i, pi) in a.members() {
                    for (j, pj) in b.members() {
                        let w = objects[i].weight() * pi * objects[j].weight() * pj;
                        sum += w * d(i, j)?;
                        norm += w;
                    }
                }
                if norm > 0.0 {
                    Ok(sum / norm)
                } else {
                    Err(Error::InvalidParameter {
                        name: "weight",
                        message: "clusters have zero total weight".to_string(),
                    })
                }
            }
            Linkage::Centroid => {
                let (ca, _) = centroid(objects, a)?;
                let (cb, _) = centroid(objects, b)?;
                euclidean(&ca, &cb)
            }
            Linkage::Ward => {
                let (ca, wa) = centroid(objects, a)?;
                let (cb, wb) = centroid(objects, b)?;
                Ok(2.0 * wa * wb / (wa + wb) * euclidean(&ca, &cb)?)
            }
        }
    }
}

/// Weighted centroid of a cluster and its total weight.
fn centroid<T: ClusterObject>(objects: &[T], cluster: &Cluster) -> Result<(Vec<f64>, f64)> {
    let mut sum: Option<Vec<f64>> = None;
    let mut total = 0.0;
    for (i, p) in cluster.members() {
        let x = objects[i].coordinates().ok_or(Error::MissingCoordinates(i))?;
        let w = objects[i].weight() * p;
        let acc = sum.get_or_insert_with(|| vec![0.0; x.len()]);
        if acc.len() != x.len() {
            return Err(Error::InvalidParameter {
                name: "coordinates",
                message: format!("object {i} has {} coordinates, expected {}", x.len(), acc.len()),
            });
        }
        for (s, v) in acc.iter_mut().zip(x) {
            *s += w * v;
        }
        total += w;
    }
    if !(total > 0.0) {
        return Err(Error::InvalidParameter {
            name: "weight",
            message: "cluster has zero total weight".to_string(),
        });
    }
    let mut c = sum.unwrap_or_default();
    c.iter_mut().for_each(|s| *s /= total);
    Ok((c, total))
}

fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::InvalidParameter {
            name: "coordinates",
            message: format!("{} vs {} dimensions", a.len(), b.len()),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt())
}

/// Distance between clusters of objects `T`.
pub trait ClusterDistance<T: ClusterObject>: Send + Sync {
    /// Linkage rule.
    fn linkage(&self) -> Linkage;

    /// Distance between objects `i` and `j`.
    fn object_distance(&self, objects: &[T], i: usize, j: usize) -> Result<f64>;

    /// All object distances, if precomputed.
    fn object_matrix(&self) -> Option<&Array2<f64>> {
        None
    }

    /// Distance between two clusters.
    fn cluster_distance(&self, objects: &[T], a: &Cluster, b: &Cluster) -> Result<f64> {
        self.linkage()
            .combine(objects, a, b, |i, j| self.object_distance(objects, i, j))
    }
}

/// Linkage over an object distance evaluated on demand.
#[derive(Debug, Clone)]
pub struct DirectLinkage<D> {
    linkage: Linkage,
    distance: D,
}

impl<D> DirectLinkage<D> {
    /// Linkage `linkage` over `distance`.
    pub fn new(linkage: Linkage, distance: D) -> Self {
        Self { linkage, distance }
    }
}

impl<T, D> ClusterDistance<T> for DirectLinkage<D>
where
    T: ClusterObject,
    D: ObjectDistance<T>,
{
    fn linkage(&self) -> Linkage {
        self.linkage
    }

    fn object_distance(&self, objects: &[T], i: usize, j: usize) -> Result<f64> {
        if i == j {
            return Ok(0.0);
        }
        self.distance.distance(&objects[i], &objects[j])
    }
}

/// Linkage over a precomputed object distance matrix.
#[derive(Debug, Clone)]
pub struct CachedLinkage {
    linkage: Linkage,
    matrix: Array2<f64>,
}

impl CachedLinkage {
    /// Compute all pairwise object distances, one row per work item.
    pub fn new<T, D>(linkage: Linkage, objects: &[T], distance: &D, pool: &WorkerPool) -> Result<Self>
    where
        T: ClusterObject,
        D: ObjectDistance<T> + ?Sized,
    {
        let n = objects.len();
        let rows = pool.try_map_range(n, |i| {
            ((i + 1)..n)
                .map(|j| distance.distance(&objects[i], &objects[j]))
                .collect::<Result<Vec<f64>>>()
        })?;
        let mut matrix = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (k, d) in row.into_iter().enumerate() {
                let j = i + 1 + k;
                matrix[[i, j]] = d;
                matrix[[j, i]] = d;
            }
        }
        log::debug!("cached linkage: {n}×{n} object distances");
        Ok(Self { linkage, matrix })
    }

    /// Linkage over an existing symmetric matrix.
    pub fn from_matrix(linkage: Linkage, matrix: Array2<f64>) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(Error::InvalidParameter {
                name: "matrix",
                message: format!("{}×{} is not square", matrix.nrows(), matrix.ncols()),
            });
        }
        Ok(Self { linkage, matrix })
    }

    /// The object distance matrix.
    pub fn cached_matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl<T: ClusterObject> ClusterDistance<T> for CachedLinkage {
    fn linkage(&self) -> Linkage {
        self.linkage
    }

    fn object_distance(&self, _objects: &[T], i: usize, j: usize) -> Result<f64> {
        self.matrix
            .get([i, j])
            .copied()
            .ok_or_else(|| Error::Precondition(format!("object pair ({i}, {j}) outside the cached matrix")))
    }

    fn object_matrix(&self) -> Option<&Array2<f64>> {
        Some(&self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Point {
        x: [f64; 1],
        w: f64,
    }

    impl ClusterObject for Point {
        fn weight(&self) -> f64 {
            self.w
        }

        fn coordinates(&self) -> Option<&[f64]> {
            Some(&self.x)
        }
    }

    struct Bare;

    impl ClusterObject for Bare {}

    fn points(xs: &[f64]) -> Vec<Point> {
        xs.iter().map(|&x| Point { x: [x], w: 1.0 }).collect()
    }

    fn abs(a: &Point, b: &Point) -> Result<f64> {
        Ok((a.x[0] - b.x[0]).abs())
    }

    #[test]
    fn test_linkage_values() {
        let objects = points(&[0.0, 1.0, 4.0]);
        let a = Cluster::hard([0, 1]);
        let b = Cluster::singleton(2);
        let d = |l: Linkage| DirectLinkage::new(l, abs).cluster_distance(&objects, &a, &b).unwrap();
        assert_eq!(d(Linkage::Single), 3.0);
        assert_eq!(d(Linkage::Complete), 4.0);
        assert_eq!(d(Linkage::Average), 3.5);
        assert_eq!(d(Linkage::Centroid), 3.5);
        assert!((d(Linkage::Ward) - 2.0 * 2.0 / 3.0 * 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_weights_shift_centroid() {
        let mut objects = points(&[0.0, 3.0, 6.0]);
        objects[1].w = 2.0;
        let a = Cluster::hard([0, 1]);
        let b = Cluster::singleton(2);
        let d = DirectLinkage::new(Linkage::Centroid, abs)
            .cluster_distance(&objects, &a, &b)
            .unwrap();
        assert!((d - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_needs_coordinates() {
        let objects = vec![Bare, Bare];
        let linkage = DirectLinkage::new(Linkage::Ward, |_: &Bare, _: &Bare| -> Result<f64> { Ok(1.0) });
        let err = linkage
            .cluster_distance(&objects, &Cluster::singleton(0), &Cluster::singleton(1))
            .unwrap_err();
        assert_eq!(err, Error::MissingCoordinates(0));
        let single = DirectLinkage::new(Linkage::Single, |_: &Bare, _: &Bare| -> Result<f64> { Ok(1.0) });
        assert_eq!(
            single
                .cluster_distance(&objects, &Cluster::singleton(0), &Cluster::singleton(1))
                .unwrap(),
            1.0
        );
    }

    #[test]
    fn test_cached_matches_direct() {
        let objects = points(&[0.0, 1.0, 2.0, 10.0, 11.0]);
        let pool = WorkerPool::sequential().unwrap();
        let cached = CachedLinkage::new(Linkage::Average, &objects, &abs, &pool).unwrap();
        let direct = DirectLinkage::new(Linkage::Average, abs);
        let a = Cluster::hard([0, 2]);
        let b = Cluster::hard([3, 4]);
        assert_eq!(
            cached.cluster_distance(&objects, &a, &b).unwrap(),
            direct.cluster_distance(&objects, &a, &b).unwrap()
        );
        let m = cached.cached_matrix();
        assert_eq!(m[[4, 0]], 11.0);
        assert_eq!(m[[0, 4]], 11.0);
        assert_eq!(m[[2, 2]], 0.0);
    }
}
