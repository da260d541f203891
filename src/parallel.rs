//! Parallel-for with a join barrier.
//!
//! Work items are independent, synchronous and CPU-bound. Each call blocks
//! until the whole batch is done; results come back in input order so the
//! caller aggregates after the barrier.

use crate::config::AnalysisConfig;
use crate::error::Result;

#[cfg(feature = "parallel")]
use crate::error::Error;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pool of workers sized once from [`AnalysisConfig::workers`].
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build the pool.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .build()
                .map_err(|e| Error::Other(format!("worker pool: {e}")))?;
            let workers = pool.current_num_threads();
            Ok(Self { pool, workers })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = config;
            Ok(Self { workers: 1 })
        }
    }

    /// Single worker; handy in tests.
    pub fn sequential() -> Result<Self> {
        Self::new(&AnalysisConfig::default().with_workers(1))
    }

    /// Number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item, failing on the first error.
    pub fn try_map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            self.pool.install(|| items.par_iter().map(&f).collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            items.iter().map(f).collect()
        }
    }

    /// Apply `f` to every index in `0..n`.
    pub fn try_map_range<R, F>(&self, n: usize, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            self.pool.install(|| (0..n).into_par_iter().map(&f).collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            (0..n).map(f).collect()
        }
    }
}

impl core::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_results_keep_input_order() {
        let pool = WorkerPool::new(&AnalysisConfig::default().with_workers(4)).unwrap();
        let items: Vec<u32> = (0..100).collect();
        let out = pool.try_map(&items, |&x| Ok(x * 2)).unwrap();
        assert_eq!(out, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_error_propagates() {
        let pool = WorkerPool::sequential().unwrap();
        let res: Result<Vec<usize>> = pool.try_map_range(10, |i| {
            if i == 7 {
                Err(Error::EmptyInput)
            } else {
                Ok(i)
            }
        });
        assert_eq!(res.unwrap_err(), Error::EmptyInput);
    }
}
