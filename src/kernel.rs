//! Radially symmetric kernels over a distance measure.
//!
//! A kernel weights an observation by its distance `d` from the target,
//! scaled by the bandwidth `h`:
//!
//! ```text
//! K_h(d) = k(d / h) / h
//! ```
//!
//! | Kind | Profile `k(x)` | Relevant up to |
//! |------|----------------|----------------|
//! | Gaussian | `exp(-x²/2) / √(2π)` | `3.09 h` |
//! | Epanechnikov | `0.75 (1 - x²)` for `|x| ≤ 1` | `h` |
//! | K3 | `(4/π) (1 - x²)³` for `|x| ≤ 1` | `h` |
//!
//! The bandwidth is an exact [`Bandwidth`] so the identification string is
//! a stable lookup key:
//!
//! ```text
//! gaussian:distances=geographic:bandwidth=1.25
//! ```

use crate::bandwidth::Bandwidth;
use crate::distance::{DistanceId, DistanceMeasure};
use crate::error::{Error, Result};
use core::f64::consts::PI;
use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

/// Standard-normal quantile beyond which Gaussian contributions are dropped.
const GAUSSIAN_CUTOFF: f64 = 3.09;

/// Kernel shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Gaussian (infinite support, truncated at `3.09 h`).
    Gaussian,
    /// Epanechnikov (compact support).
    Epanechnikov,
    /// Triweight-style K3 (compact support).
    K3,
}

impl KernelKind {
    /// Identification of the kind alone, as used in bandwidth keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            KernelKind::Gaussian => "gaussian",
            KernelKind::Epanechnikov => "epanechnikov",
            KernelKind::K3 => "k3",
        }
    }

    /// Unscaled profile `k(x)`.
    pub fn profile(&self, x: f64) -> f64 {
        match self {
            KernelKind::Gaussian => (-0.5 * x * x).exp() / (2.0 * PI).sqrt(),
            KernelKind::Epanechnikov if x.abs() <= 1.0 => 0.75 * (1.0 - x * x),
            KernelKind::K3 if x.abs() <= 1.0 => (4.0 / PI) * (1.0 - x * x).powi(3),
            _ => 0.0,
        }
    }

    /// Relevant radius in units of the bandwidth.
    pub fn support(&self) -> f64 {
        match self {
            KernelKind::Gaussian => GAUSSIAN_CUTOFF,
            KernelKind::Epanechnikov | KernelKind::K3 => 1.0,
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KernelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gaussian" => Ok(KernelKind::Gaussian),
            "epanechnikov" => Ok(KernelKind::Epanechnikov),
            "k3" => Ok(KernelKind::K3),
            _ => Err(Error::InvalidIdentification(s.to_string())),
        }
    }
}

/// A kernel kind over a distance measure, before a bandwidth is chosen.
#[derive(Clone)]
pub struct KernelFamily {
    kind: KernelKind,
    distance: Arc<dyn DistanceMeasure>,
}

impl KernelFamily {
    /// Create a family.
    pub fn new(kind: KernelKind, distance: Arc<dyn DistanceMeasure>) -> Self {
        Self { kind, distance }
    }

    /// Kernel shape.
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// Underlying distance measure.
    pub fn distance(&self) -> &Arc<dyn DistanceMeasure> {
        &self.distance
    }

    /// Fix the bandwidth.
    pub fn with_bandwidth(&self, bandwidth: Bandwidth) -> Result<Kernel> {
        Kernel::new(self.kind, Arc::clone(&self.distance), bandwidth)
    }
}

impl fmt::Debug for KernelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelFamily")
            .field("kind", &self.kind)
            .field("distance", &self.distance.identification())
            .finish()
    }
}

/// Immutable kernel: kind, distance measure and positive bandwidth.
#[derive(Clone)]
pub struct Kernel {
    kind: KernelKind,
    distance: Arc<dyn DistanceMeasure>,
    bandwidth: Bandwidth,
    h: f64,
}

impl Kernel {
    /// Create a kernel. The bandwidth must be positive.
    pub fn new(
        kind: KernelKind,
        distance: Arc<dyn DistanceMeasure>,
        bandwidth: Bandwidth,
    ) -> Result<Self> {
        if bandwidth.is_zero() {
            return Err(Error::InvalidBandwidth(bandwidth.to_string()));
        }
        Ok(Self {
            kind,
            distance,
            bandwidth,
            h: bandwidth.value(),
        })
    }

    /// Kernel shape.
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    /// Exact bandwidth.
    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Distance measure.
    pub fn distance_measure(&self) -> &Arc<dyn DistanceMeasure> {
        &self.distance
    }

    /// Family of this kernel (kind and distance, no bandwidth).
    pub fn family(&self) -> KernelFamily {
        KernelFamily::new(self.kind, Arc::clone(&self.distance))
    }

    /// Density contribution at `distance`. NaN distances contribute nothing.
    #[inline]
    pub fn evaluate(&self, distance: f64) -> f64 {
        if distance.is_nan() {
            return 0.0;
        }
        self.kind.profile(distance / self.h) / self.h
    }

    /// Distance beyond which contributions are negligible (or exactly zero).
    pub fn max_relevant_distance(&self) -> f64 {
        self.kind.support() * self.h
    }

    /// Stable identification string.
    pub fn identification(&self) -> String {
        KernelIdentification {
            kind: self.kind,
            distance: self.distance.identification(),
            bandwidth: self.bandwidth,
        }
        .to_string()
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identification())
    }
}

/// Parsed form of a kernel identification string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelIdentification {
    /// Kernel shape.
    pub kind: KernelKind,
    /// Distance measure identification.
    pub distance: DistanceId,
    /// Exact bandwidth.
    pub bandwidth: Bandwidth,
}

impl fmt::Display for KernelIdentification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:distances={}:bandwidth={}",
            self.kind, self.distance, self.bandwidth
        )
    }
}

impl FromStr for KernelIdentification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidIdentification(s.to_string());
        let (kind, rest) = s.split_once(':').ok_or_else(invalid)?;
        let rest = rest.strip_prefix("distances=").ok_or_else(invalid)?;
        // Distance ids contain colons themselves; the bandwidth is always last.
        let (distance, bandwidth) = rest.rsplit_once(":bandwidth=").ok_or_else(invalid)?;
        Ok(Self {
            kind: kind.parse()?,
            distance: distance.parse()?,
            bandwidth: bandwidth.parse()?,
        })
    }
}
