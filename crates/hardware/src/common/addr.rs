//! Physical address ranges.
//!
//! This module defines the address range type used throughout the memory map. It provides:
//! 1. **Construction:** From a start plus size, or from an inclusive `[start, last]` pair.
//! 2. **Queries:** Size, containment, and overlap tests used by the bridge and E820 checks.
//!
//! Ranges are stored inclusively so that a range may end at `u64::MAX` (the PCI
//! configuration window runs to the top of the address space).

use std::fmt;

/// An inclusive physical address range `[start, last]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddrRange {
    start: u64,
    last: u64,
}

impl AddrRange {
    /// Creates a range covering `[start, last]`.
    ///
    /// # Arguments
    ///
    /// * `start` - First address in the range.
    /// * `last` - Last address in the range (inclusive); must be `>= start`.
    pub const fn inclusive(start: u64, last: u64) -> Self {
        debug_assert!(last >= start);
        Self { start, last }
    }

    /// Creates a range of `size` bytes beginning at `start`.
    ///
    /// A zero `size` is treated as one byte; callers validate sizes before building ranges.
    pub const fn with_size(start: u64, size: u64) -> Self {
        let size = if size == 0 { 1 } else { size };
        Self {
            start,
            last: start.saturating_add(size - 1),
        }
    }

    /// Creates a range starting at address zero (the main memory range).
    pub const fn from_zero(size: u64) -> Self {
        Self::with_size(0, size)
    }

    /// Returns the first address in the range.
    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Returns the last address in the range (inclusive).
    #[inline]
    pub const fn last(&self) -> u64 {
        self.last
    }

    /// Returns the number of bytes covered, saturating at `u64::MAX` for the full address space.
    pub const fn size(&self) -> u64 {
        (self.last - self.start).saturating_add(1)
    }

    /// Returns `true` if `addr` lies within the range.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr <= self.last
    }

    /// Returns `true` if the two ranges share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.last && other.start <= self.last
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x}]", self.start, self.last)
    }
}
