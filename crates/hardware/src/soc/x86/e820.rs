//! E820 physical memory map handed to the guest kernel.

use std::fmt;

use crate::common::ByteSize;
use crate::soc::x86::{BIOS_ROM_START, IO_GAP_START};

/// Memory region type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum E820Type {
    /// Usable RAM (type 1).
    Usable,
    /// Reserved (type 2).
    Reserved,
}

impl E820Type {
    /// Returns the numeric type code.
    pub const fn code(self) -> u32 {
        match self {
            Self::Usable => 1,
            Self::Reserved => 2,
        }
    }
}

/// One map entry covering `[addr, addr + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E820Entry {
    /// Base address.
    pub addr: u64,
    /// Length in bytes.
    pub size: u64,
    /// Region type.
    pub range_type: E820Type,
}

impl E820Entry {
    /// Returns the exclusive end address.
    pub const fn end(&self) -> u64 {
        self.addr + self.size
    }
}

impl fmt::Display for E820Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#012x}-{:#012x} type {}",
            self.addr,
            self.end(),
            self.range_type.code()
        )
    }
}

/// Start of the extended BIOS data area.
const EBDA_START: u64 = 0x9_fc00;

/// Start of extended memory (1MB).
const EXTENDED_START: u64 = 0x10_0000;

/// Builds the E820 map for `mem_size` bytes of RAM.
///
/// Validated configurations have `EXTENDED_START < mem_size <= IO_GAP_START`. Outside that
/// range, an empty extended-memory entry is skipped. When RAM reaches the I/O gap exactly, the
/// reserved hole between them is omitted.
pub fn memory_map(mem_size: u64) -> Vec<E820Entry> {
    let entry = |addr, size, range_type| E820Entry {
        addr,
        size,
        range_type,
    };
    let mut map = vec![
        entry(0, 639 * ByteSize::KIB, E820Type::Usable),
        entry(EBDA_START, 385 * ByteSize::KIB, E820Type::Reserved),
    ];
    let extended = mem_size.saturating_sub(EXTENDED_START);
    if extended > 0 {
        map.push(entry(EXTENDED_START, extended, E820Type::Usable));
    }
    let top = mem_size.max(EXTENDED_START);
    let hole = IO_GAP_START.saturating_sub(top);
    if hole > 0 {
        map.push(entry(top, hole, E820Type::Reserved));
    }
    map.push(entry(BIOS_ROM_START, 64 * ByteSize::KIB, E820Type::Reserved));
    map
}
