//! Orchestration: from survey records to bandwidths, maps and map clusters.
//!
//! ```text
//! store ─► VariantWeights ─► bandwidth (persisted │ estimated │ fallback)
//!                              └─► KernelDensityEstimation ─► AreaClassMap
//! AreaClassMaps ─► MapDistance ─► CachedLinkage ─► Agglomerative ─► clusters
//! ```
//!
//! Degenerate inputs never abort a batch: a map without candidates or
//! without an optimum gets the configured fallback bandwidth, and a failed
//! bandwidth save is logged while the computed value is still returned.

use crate::areal::AreaClassMap;
use crate::bandwidth::{generate_candidates, Bandwidth, BandwidthEstimator};
use crate::cluster::{
    Agglomeration, Agglomerative, CachedLinkage, ClusterObject, Linkage, TerminationCriterion,
};
use crate::config::AnalysisConfig;
use crate::density::KernelDensityEstimation;
use crate::error::Result;
use crate::kernel::KernelFamily;
use crate::map_distance::MapDistance;
use crate::parallel::WorkerPool;
use crate::survey::{BandwidthKey, LevelId, MapId, SurveyStore};
use crate::weights::{LevelMapping, VariantWeights};
use std::sync::Arc;

impl ClusterObject for AreaClassMap {}

/// Entry points of an analysis run, sharing one configuration and pool.
#[derive(Debug)]
pub struct Analysis {
    config: AnalysisConfig,
    pool: WorkerPool,
}

impl Analysis {
    /// Validate `config` and start its worker pool.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(&config)?;
        log::debug!("analysis with {} workers", pool.workers());
        Ok(Self { config, pool })
    }

    /// Configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Worker pool in use.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Weights of `map`, aggregated to `level` if given.
    pub fn weights(
        &self,
        store: &dyn SurveyStore,
        map: MapId,
        level: Option<LevelId>,
    ) -> Result<Arc<VariantWeights>> {
        let base = VariantWeights::extract(store, map)?;
        let weights = match level {
            Some(level) => {
                let mapping = LevelMapping::load(store, level, &base)?;
                base.aggregate(&mapping)?
            }
            None => base,
        };
        Ok(Arc::new(weights))
    }

    /// Lookup key of the bandwidth for `weights` under `family` and `estimator`.
    pub fn bandwidth_key(
        weights: &VariantWeights,
        family: &KernelFamily,
        estimator: &dyn BandwidthEstimator,
    ) -> BandwidthKey {
        BandwidthKey {
            map: weights.map(),
            weights: weights.identification().to_string(),
            kernel: family.kind().to_string(),
            distance: family.distance().identification().to_string(),
            estimator: estimator.kind().to_string(),
        }
    }

    /// Bandwidth for `weights`: persisted if present, estimated otherwise.
    ///
    /// A persisted zero counts as absent. An estimate is saved back; save
    /// failures are logged and do not discard it.
    pub fn bandwidth(
        &self,
        store: &dyn SurveyStore,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        estimator: &dyn BandwidthEstimator,
    ) -> Result<Bandwidth> {
        let key = Self::bandwidth_key(weights, family, estimator);
        if let Some(stored) = store.find_bandwidth(&key)? {
            if !stored.is_zero() {
                log::debug!("persisted bandwidth {stored} for {key}");
                return Ok(stored);
            }
        }

        let candidates = generate_candidates(weights, family.distance().as_ref(), &self.config, &self.pool)?;
        let bandwidth = match estimator.find_bandwidth(weights, family, &candidates, &self.pool)? {
            Some(found) => {
                log::info!("map {}: {} selected bandwidth {found}", weights.map(), estimator.kind());
                found
            }
            None => {
                let fallback = self.config.fallback_bandwidth;
                log::warn!(
                    "map {}: {} found no bandwidth among {} candidates, using {fallback}",
                    weights.map(),
                    estimator.kind(),
                    candidates.len()
                );
                fallback
            }
        };

        if let Err(e) = store.save_bandwidth(&key, &bandwidth) {
            log::warn!("could not save bandwidth {bandwidth} for {key}: {e}");
        }
        Ok(bandwidth)
    }

    /// Density estimation of `weights` with the selected bandwidth.
    pub fn estimation(
        &self,
        store: &dyn SurveyStore,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        estimator: &dyn BandwidthEstimator,
    ) -> Result<KernelDensityEstimation> {
        let bandwidth = self.bandwidth(store, weights, family, estimator)?;
        let kernel = family.with_bandwidth(bandwidth)?;
        Ok(KernelDensityEstimation::new(Arc::clone(weights), kernel))
    }

    /// Classified map of `weights`, evaluated in parallel.
    pub fn area_class_map(
        &self,
        store: &dyn SurveyStore,
        weights: &Arc<VariantWeights>,
        family: &KernelFamily,
        estimator: &dyn BandwidthEstimator,
    ) -> Result<AreaClassMap> {
        let map = AreaClassMap::new(self.estimation(store, weights, family, estimator)?);
        map.evaluate(&self.pool)?;
        Ok(map)
    }

    /// Cluster maps by `map_distance`.
    ///
    /// All maps must cover the same locations (see
    /// [`VariantWeights::enforce_locations`]).
    pub fn cluster_maps(
        &self,
        maps: &[AreaClassMap],
        map_distance: &dyn MapDistance,
        linkage: Linkage,
        termination: TerminationCriterion,
    ) -> Result<Agglomeration> {
        for map in maps {
            map.evaluate(&self.pool)?;
        }
        let distance = |a: &AreaClassMap, b: &AreaClassMap| -> Result<f64> { map_distance.distance(a, b) };
        let cached = CachedLinkage::new(linkage, maps, &distance, &self.pool)?;
        let out = Agglomerative::new(termination).fit(maps, &cached)?;
        log::info!(
            "clustered {} maps by {} into {} clusters",
            maps.len(),
            map_distance.kind(),
            out.result().len()
        );
        Ok(out)
    }
}
