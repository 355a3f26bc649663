//! Cache parameter sets.
//!
//! Each cache level starts from a fixed base parameter set and applies the named overrides
//! from configuration. This module provides:
//! 1. **Levels:** `CacheLevel` is the closed set of caches the platform can instantiate.
//! 2. **Resolution:** `CacheParams::resolve` merges a level's base values with overrides.
//! 3. **Validation:** Geometry and queueing checks before a cache is placed in the system.
//! 4. **Wiring:** Which CPU and bus ports each level attaches to.

use crate::common::{ByteSize, ConfigError};
use crate::config::CacheOverrides;

/// Default line size for every cache level (64 bytes).
pub const LINE_SIZE: u64 = 64;

/// Cache levels known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    /// L1 instruction cache, attached to the CPU instruction port.
    L1I,
    /// L1 data cache, attached to the CPU data port.
    L1D,
    /// Unified second-level cache between the L1s and the memory bus.
    L2,
    /// Small cache between the I/O bus and the memory bus for DMA coherence.
    Io,
}

impl CacheLevel {
    /// Every level, in bring-up order.
    pub const ALL: [Self; 4] = [Self::L1I, Self::L1D, Self::L2, Self::Io];

    /// Returns the object name used in the port graph.
    pub const fn name(self) -> &'static str {
        match self {
            Self::L1I => "cpu.icache",
            Self::L1D => "cpu.dcache",
            Self::L2 => "l2cache",
            Self::Io => "iocache",
        }
    }

    /// Returns the CPU port an L1 connects to, or `None` for shared levels.
    pub const fn cpu_port(self) -> Option<&'static str> {
        match self {
            Self::L1I => Some("icache_port"),
            Self::L1D => Some("dcache_port"),
            Self::L2 | Self::Io => None,
        }
    }

    /// Returns the base parameter set before overrides.
    pub const fn base(self) -> CacheParams {
        const L1: CacheParams = CacheParams {
            level: CacheLevel::L1I,
            size: ByteSize(16 * ByteSize::KIB),
            line_size: ByteSize(LINE_SIZE),
            assoc: 2,
            hit_latency: 2,
            response_latency: 2,
            mshrs: 4,
            tgts_per_mshr: 20,
            is_top_level: true,
        };
        match self {
            Self::L1I => L1,
            Self::L1D => CacheParams {
                level: Self::L1D,
                size: ByteSize(64 * ByteSize::KIB),
                ..L1
            },
            Self::L2 => CacheParams {
                level: Self::L2,
                size: ByteSize(256 * ByteSize::KIB),
                line_size: ByteSize(LINE_SIZE),
                assoc: 8,
                hit_latency: 20,
                response_latency: 20,
                mshrs: 20,
                tgts_per_mshr: 12,
                is_top_level: false,
            },
            Self::Io => CacheParams {
                level: Self::Io,
                size: ByteSize(ByteSize::KIB),
                line_size: ByteSize(LINE_SIZE),
                assoc: 8,
                hit_latency: 50,
                response_latency: 50,
                mshrs: 20,
                tgts_per_mshr: 12,
                is_top_level: false,
            },
        }
    }
}

/// Resolved parameters of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheParams {
    /// Level these parameters belong to.
    pub level: CacheLevel,
    /// Capacity.
    pub size: ByteSize,
    /// Line size.
    pub line_size: ByteSize,
    /// Associativity (ways per set).
    pub assoc: u32,
    /// Tag and data lookup latency in cycles.
    pub hit_latency: u32,
    /// Latency to forward a response in cycles.
    pub response_latency: u32,
    /// Miss status holding registers.
    pub mshrs: u32,
    /// Outstanding targets per MSHR.
    pub tgts_per_mshr: u32,
    /// Closest cache to the CPU (forwards snoops instead of responding).
    pub is_top_level: bool,
}

impl CacheParams {
    /// Applies `overrides` on top of the base parameters of `level`.
    pub fn resolve(level: CacheLevel, overrides: &CacheOverrides) -> Self {
        let base = level.base();
        Self {
            level,
            size: overrides.size.unwrap_or(base.size),
            line_size: overrides.line_size.unwrap_or(base.line_size),
            assoc: overrides.assoc.unwrap_or(base.assoc),
            hit_latency: overrides.hit_latency.unwrap_or(base.hit_latency),
            response_latency: overrides.response_latency.unwrap_or(base.response_latency),
            mshrs: overrides.mshrs.unwrap_or(base.mshrs),
            tgts_per_mshr: overrides.tgts_per_mshr.unwrap_or(base.tgts_per_mshr),
            is_top_level: base.is_top_level,
        }
    }

    /// Returns the bytes held by one set (`line_size * assoc`), or `None` on overflow.
    pub const fn set_bytes(&self) -> Option<u64> {
        self.line_size.bytes().checked_mul(self.assoc as u64)
    }

    /// Returns the number of sets, or `None` when the geometry is degenerate.
    pub const fn num_sets(&self) -> Option<u64> {
        match self.set_bytes() {
            Some(set) => self.size.bytes().checked_div(set),
            None => None,
        }
    }

    /// Checks cache geometry and queue sizes.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = |f: &str| format!("cache.{}.{f}", self.level.name());
        let fail = |f: &str, reason: &str| ConfigError::InvalidValue {
            field: field(f),
            reason: reason.to_string(),
        };

        let size = self.size.bytes();
        let line = self.line_size.bytes();
        if !size.is_power_of_two() {
            return Err(fail("size", "must be a nonzero power of two"));
        }
        if !line.is_power_of_two() {
            return Err(fail("line_size", "must be a nonzero power of two"));
        }
        if self.assoc == 0 {
            return Err(fail("assoc", "must be at least 1"));
        }
        let Some(set) = self.set_bytes() else {
            return Err(fail("line_size", "line_size * assoc overflows"));
        };
        if size % set != 0 || size < set {
            return Err(fail("size", "must be a multiple of line_size * assoc"));
        }
        if self.hit_latency == 0 || self.response_latency == 0 {
            return Err(fail("hit_latency", "latencies must be at least one cycle"));
        }
        if self.mshrs == 0 {
            return Err(fail("mshrs", "must be at least 1"));
        }
        if self.tgts_per_mshr == 0 {
            return Err(fail("tgts_per_mshr", "must be at least 1"));
        }
        Ok(())
    }
}
