//! Analysis configuration.
//!
//! All tunables of the bandwidth search and the worker pool live in one
//! explicit value passed to the entry points; nothing is process-global.

use crate::bandwidth::Bandwidth;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for bandwidth search, density estimation and clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Parallel workers. `0` uses every available core.
    pub workers: usize,
    /// Number of bandwidth candidates generated per map.
    pub candidate_count: usize,
    /// Fraction of the maximum pairwise distance used as the largest candidate.
    pub max_distance_ratio: f64,
    /// Consecutive worsening evaluations after which a search stops.
    pub early_exit_window: usize,
    /// Minimum fraction of locations a variant must occur at to enter likelihood CV.
    pub min_variant_location_share: f64,
    /// Bandwidth substituted when no estimator finds one.
    pub fallback_bandwidth: Bandwidth,
    /// Slack added to the distance-variability threshold.
    pub distance_epsilon: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            candidate_count: 100,
            max_distance_ratio: 1.0,
            early_exit_window: 20,
            min_variant_location_share: 0.1,
            fallback_bandwidth: Bandwidth::ONE,
            distance_epsilon: 1e-9,
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Other(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the number of bandwidth candidates.
    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = candidate_count;
        self
    }

    /// Set the maximum distance ratio.
    pub fn with_max_distance_ratio(mut self, ratio: f64) -> Self {
        self.max_distance_ratio = ratio;
        self
    }

    /// Set the early-exit window.
    pub fn with_early_exit_window(mut self, window: usize) -> Self {
        self.early_exit_window = window;
        self
    }

    /// Set the minimum location share of variants entering likelihood CV.
    pub fn with_min_variant_location_share(mut self, share: f64) -> Self {
        self.min_variant_location_share = share;
        self
    }

    /// Set the slack of the distance-variability threshold.
    pub fn with_distance_epsilon(mut self, epsilon: f64) -> Self {
        self.distance_epsilon = epsilon;
        self
    }

    /// Set the fallback bandwidth.
    pub fn with_fallback_bandwidth(mut self, bandwidth: Bandwidth) -> Self {
        self.fallback_bandwidth = bandwidth;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.candidate_count == 0 {
            return Err(Error::InvalidParameter {
                name: "candidate_count",
                message: "must be at least 1".into(),
            });
        }
        if !(self.max_distance_ratio > 0.0 && self.max_distance_ratio.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "max_distance_ratio",
                message: format!("must be positive, got {}", self.max_distance_ratio),
            });
        }
        if self.early_exit_window == 0 {
            return Err(Error::InvalidParameter {
                name: "early_exit_window",
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_variant_location_share) {
            return Err(Error::InvalidParameter {
                name: "min_variant_location_share",
                message: format!("must be in [0, 1], got {}", self.min_variant_location_share),
            });
        }
        if !(self.distance_epsilon >= 0.0 && self.distance_epsilon.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "distance_epsilon",
                message: format!("must be finite and non-negative, got {}", self.distance_epsilon),
            });
        }
        if self.fallback_bandwidth.is_zero() {
            return Err(Error::InvalidParameter {
                name: "fallback_bandwidth",
                message: "must be positive".into(),
            });
        }
        Ok(())
    }
}
