//! Exact decimal bandwidth values.
//!
//! Bandwidths are part of persisted lookup keys, so they are kept as
//! normalized decimals (`unscaled × 10^-scale`, no trailing zeros) and
//! print back exactly as they were parsed. Kernels evaluate with the
//! derived `f64`.

use crate::error::{Error, Result};
use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Digits kept after the decimal point when converting from `f64`.
const F64_FRACTION_DIGITS: usize = 12;

/// Largest supported number of fractional digits.
const MAX_SCALE: u32 = 18;

/// A non-negative exact decimal.
///
/// Zero is representable because stores use it as the "not found" sentinel;
/// kernels reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bandwidth {
    unscaled: u64,
    scale: u32,
}

impl Bandwidth {
    /// The zero sentinel.
    pub const ZERO: Bandwidth = Bandwidth {
        unscaled: 0,
        scale: 0,
    };

    /// `1`, the fallback bandwidth for degenerate maps.
    pub const ONE: Bandwidth = Bandwidth {
        unscaled: 1,
        scale: 0,
    };

    /// Build from an unscaled integer and a decimal scale, normalizing.
    pub fn from_parts(unscaled: u64, scale: u32) -> Result<Self> {
        if scale > MAX_SCALE {
            return Err(Error::InvalidBandwidth(format!("{unscaled}e-{scale}")));
        }
        Ok(Self { unscaled, scale }.normalized())
    }

    /// Convert a finite non-negative float, rounding to 12 fractional digits.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidBandwidth(value.to_string()));
        }
        // Large values overflow u64 at full precision; trade digits for range.
        for digits in (0..=F64_FRACTION_DIGITS).rev() {
            if let Ok(b) = format!("{value:.digits$}").parse::<Bandwidth>() {
                return Ok(b);
            }
        }
        Err(Error::InvalidBandwidth(value.to_string()))
    }

    /// Whether this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.unscaled == 0
    }

    /// Nearest `f64`.
    pub fn value(&self) -> f64 {
        self.to_string()
            .parse::<f64>()
            .unwrap_or_else(|_| self.unscaled as f64 / 10f64.powi(self.scale as i32))
    }

    fn normalized(mut self) -> Self {
        if self.unscaled == 0 {
            return Self::ZERO;
        }
        while self.scale > 0 && self.unscaled % 10 == 0 {
            self.unscaled /= 10;
            self.scale -= 1;
        }
        self
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let divisor = 10u64.pow(self.scale);
        write!(
            f,
            "{}.{:0width$}",
            self.unscaled / divisor,
            self.unscaled % divisor,
            width = self.scale as usize
        )
    }
}

impl FromStr for Bandwidth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidBandwidth(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Trailing fractional zeros carry no value and may exceed the scale limit.
        let frac_part = frac_part.trim_end_matches('0');
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        if scale > MAX_SCALE {
            return Err(invalid());
        }
        let mut unscaled: u64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|u| u.checked_add(u64::from(b - b'0')))
                .ok_or_else(invalid)?;
        }
        Ok(Self { unscaled, scale }.normalized())
    }
}

impl TryFrom<String> for Bandwidth {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Bandwidth> for String {
    fn from(b: Bandwidth) -> String {
        b.to_string()
    }
}

impl Ord for Bandwidth {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        let widen = |b: &Bandwidth| u128::from(b.unscaled) * 10u128.pow(scale - b.scale);
        widen(self).cmp(&widen(other))
    }
}

impl PartialOrd for Bandwidth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_plain_decimals() {
        for s in ["1", "0.01", "123.456", "30", "0.3", "100"] {
            let b: Bandwidth = s.parse().unwrap();
            assert_eq!(b.to_string(), s);
        }
    }

    #[test]
    fn test_trailing_zeros_normalized() {
        let b: Bandwidth = "1.2500".parse().unwrap();
        assert_eq!(b.to_string(), "1.25");
        assert_eq!(b, "1.25".parse().unwrap());
        assert_eq!("0.000".parse::<Bandwidth>().unwrap(), Bandwidth::ZERO);
    }

    #[test]
    fn test_rejects_malformed() {
        for s in ["", ".", "-1", "1e3", "1.2.3", "abc", " 1"] {
            assert!(s.parse::<Bandwidth>().is_err(), "{s}");
        }
    }

    #[test]
    fn test_from_f64_cancels_float_noise() {
        let noisy = 0.3 * 3.0;
        assert_ne!(noisy, 0.9);
        assert_eq!(Bandwidth::from_f64(noisy).unwrap().to_string(), "0.9");
        assert!(Bandwidth::from_f64(-1.0).is_err());
        assert!(Bandwidth::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_ordering_across_scales() {
        let a: Bandwidth = "0.5".parse().unwrap();
        let b: Bandwidth = "0.45".parse().unwrap();
        let c: Bandwidth = "2".parse().unwrap();
        assert!(b < a);
        assert!(a < c);
        assert_eq!(c.value(), 2.0);
    }

    #[test]
    fn test_serde_as_string() {
        let b: Bandwidth = "12.5".parse().unwrap();
        let encoded = toml::to_string(&Wrapper { b }).unwrap();
        assert!(encoded.contains("\"12.5\""));
        let decoded: Wrapper = toml::from_str(&encoded).unwrap();
        assert_eq!(decoded.b, b);
    }

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        b: Bandwidth,
    }
}
