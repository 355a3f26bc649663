//! Physical quantities written in the simulator's customary notation.
//!
//! Configuration files express sizes as `"16kB"`, clocks as `"3GHz"`, and delays as `"50ns"`.
//! This module parses those strings into strongly typed values:
//! 1. **`ByteSize`:** Byte counts with binary multiples (`kB` = 1024).
//! 2. **`Frequency`:** Clock rates in hertz with decimal multiples.
//! 3. **`Latency`:** Delays in picoseconds (one simulator tick).
//!
//! Each type deserializes from either a string or a bare integer in base units.

use std::fmt;

use serde::{Deserialize, Deserializer};

use super::error::ConfigError;

/// Either a bare integer or a suffixed string, as accepted in configuration files.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Int(u64),
    Text(String),
}

/// Splits `"16 kB"` into `(16.0, "kB")`.
fn split_quantity(text: &str) -> Option<(f64, &str)> {
    let text = text.trim();
    let idx = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    if idx == 0 {
        return None;
    }
    let value = text[..idx].parse::<f64>().ok()?;
    Some((value, text[idx..].trim()))
}

/// Scales `value` by `mult`, rejecting results that are not whole, finite base units.
fn to_units(value: f64, mult: f64) -> Option<u64> {
    let scaled = (value * mult).round();
    let exact = ((value * mult) - scaled).abs() < 1e-6;
    (scaled.is_finite() && scaled >= 0.0 && scaled <= u64::MAX as f64 && exact)
        .then_some(scaled as u64)
}

/// A size in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// One kibibyte, written `kB` in configuration files.
    pub const KIB: u64 = 1 << 10;
    /// One mebibyte, written `MB`.
    pub const MIB: u64 = 1 << 20;
    /// One gibibyte, written `GB`.
    pub const GIB: u64 = 1 << 30;

    /// Parses a size such as `"512MB"`, `"64kB"`, or `"4096"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidQuantity` for unknown suffixes or fractional byte counts.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidQuantity {
            kind: "size",
            value: text.to_string(),
        };
        let (value, suffix) = split_quantity(text).ok_or_else(invalid)?;
        let mult = match suffix {
            "" | "B" => 1,
            "kB" | "KB" | "KiB" | "k" => Self::KIB,
            "MB" | "MiB" | "M" => Self::MIB,
            "GB" | "GiB" | "G" => Self::GIB,
            "TB" | "TiB" => Self::GIB << 10,
            _ => return Err(invalid()),
        };
        to_units(value, mult as f64).map(Self).ok_or_else(invalid)
    }

    /// Returns the size in bytes.
    #[inline]
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b != 0 && b % Self::GIB == 0 {
            write!(f, "{}GB", b / Self::GIB)
        } else if b != 0 && b % Self::MIB == 0 {
            write!(f, "{}MB", b / Self::MIB)
        } else if b != 0 && b % Self::KIB == 0 {
            write!(f, "{}kB", b / Self::KIB)
        } else {
            write!(f, "{b}B")
        }
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match RawQuantity::deserialize(d)? {
            RawQuantity::Int(n) => Ok(Self(n)),
            RawQuantity::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// A clock frequency in hertz.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frequency(pub u64);

impl Frequency {
    /// Parses a frequency such as `"3GHz"` or `"1.6GHz"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidQuantity` for unknown suffixes, zero, or sub-hertz values.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidQuantity {
            kind: "frequency",
            value: text.to_string(),
        };
        let (value, suffix) = split_quantity(text).ok_or_else(invalid)?;
        let mult = match suffix {
            "" | "Hz" => 1.0,
            "kHz" => 1e3,
            "MHz" => 1e6,
            "GHz" => 1e9,
            _ => return Err(invalid()),
        };
        match to_units(value, mult) {
            Some(hz) if hz > 0 => Ok(Self(hz)),
            _ => Err(invalid()),
        }
    }

    /// Returns the frequency in hertz.
    #[inline]
    pub const fn hz(self) -> u64 {
        self.0
    }

    /// Returns the clock period in picoseconds, rounded to the nearest tick.
    pub fn period_ps(self) -> u64 {
        if self.0 == 0 {
            return 0;
        }
        (1e12 / self.0 as f64).round() as u64
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz % 1_000_000_000 == 0 {
            write!(f, "{}GHz", hz / 1_000_000_000)
        } else if hz % 1_000_000 == 0 {
            write!(f, "{}MHz", hz / 1_000_000)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match RawQuantity::deserialize(d)? {
            RawQuantity::Int(0) => Err(serde::de::Error::custom("frequency must be nonzero")),
            RawQuantity::Int(n) => Ok(Self(n)),
            RawQuantity::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// A delay in picoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Latency(pub u64);

impl Latency {
    /// Parses a latency such as `"50ns"` or `"1us"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidQuantity` for unknown suffixes or sub-picosecond values.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidQuantity {
            kind: "latency",
            value: text.to_string(),
        };
        let (value, suffix) = split_quantity(text).ok_or_else(invalid)?;
        let mult = match suffix {
            "" | "ps" => 1.0,
            "ns" => 1e3,
            "us" => 1e6,
            "ms" => 1e9,
            "s" => 1e12,
            _ => return Err(invalid()),
        };
        to_units(value, mult).map(Self).ok_or_else(invalid)
    }

    /// Returns the latency in picoseconds.
    #[inline]
    pub const fn ps(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ps = self.0;
        if ps != 0 && ps % 1_000_000 == 0 {
            write!(f, "{}us", ps / 1_000_000)
        } else if ps != 0 && ps % 1_000 == 0 {
            write!(f, "{}ns", ps / 1_000)
        } else {
            write!(f, "{ps}ps")
        }
    }
}

impl<'de> Deserialize<'de> for Latency {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match RawQuantity::deserialize(d)? {
            RawQuantity::Int(n) => Ok(Self(n)),
            RawQuantity::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
