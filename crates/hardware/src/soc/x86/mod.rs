//! x86 PC platform description.
//!
//! This module lays out everything the guest kernel expects to find on a PC:
//! 1. **Address spaces:** Fixed bases for the I/O, PCI configuration, and interrupt spaces.
//! 2. **Bridges:** The north bridge (memory bus to I/O bus) and the APIC bridge back.
//! 3. **I/O cache:** A small cache between the I/O bus and the memory bus for DMA coherence.
//! 4. **Firmware tables:** SMBIOS, the Intel MP table, and the E820 memory map.

use crate::common::{AddrRange, Latency};
use crate::config::Config;
use crate::core::cache::{CacheLevel, CacheParams};
use crate::core::cpu::LocalApic;

/// E820 memory map construction.
pub mod e820;

/// Intel MP table construction.
pub mod mp_table;

pub use e820::{E820Entry, E820Type};
pub use mp_table::MpTable;

/// Base of the x86 I/O port address space.
pub const IO_ADDRESS_SPACE_BASE: u64 = 0x8000_0000_0000_0000;

/// Base of the PCI configuration address space.
pub const PCI_CONFIG_ADDRESS_SPACE_BASE: u64 = 0xc000_0000_0000_0000;

/// Base of the interrupt (local APIC) address space.
pub const INTERRUPTS_ADDRESS_SPACE_BASE: u64 = 0xa000_0000_0000_0000;

/// Size of one local APIC register window.
pub const APIC_RANGE_SIZE: u64 = 1 << 12;

/// Start of the 32-bit PCI device window; main memory must end at or below it.
pub const IO_GAP_START: u64 = 0xC000_0000;

/// Size of the I/O window registered as the second system memory range.
pub const IO_GAP_WINDOW: u64 = 0x10_0000;

/// Start of the reserved 64kB at the top of the 32-bit space.
pub const BIOS_ROM_START: u64 = 0xFFFF_0000;

/// A bus bridge forwarding a set of address ranges after a fixed delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    /// Object name in the port graph.
    pub name: &'static str,
    /// Forwarding delay.
    pub delay: Latency,
    /// Address ranges passed through.
    pub ranges: Vec<AddrRange>,
}

impl Bridge {
    /// Returns `true` if the bridge forwards `addr`.
    pub fn forwards(&self, addr: u64) -> bool {
        self.ranges.iter().any(|r| r.contains(addr))
    }
}

/// SMBIOS BIOS information structure (type 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosInformation {
    /// Vendor string.
    pub vendor: String,
    /// Version string.
    pub version: String,
    /// Release date (mm/dd/yyyy).
    pub release_date: String,
    /// Segment the BIOS image starts at.
    pub starting_addr_segment: u16,
}

impl Default for BiosInformation {
    fn default() -> Self {
        Self {
            vendor: String::new(),
            version: String::new(),
            release_date: "06/08/2008".to_string(),
            starting_addr_segment: 0,
        }
    }
}

/// SMBIOS table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmbiosTable {
    /// Table structures; the platform registers a single BIOS information entry.
    pub structures: Vec<BiosInformation>,
}

/// The PC platform around the CPU and memory bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X86Platform {
    /// North bridge from the memory bus down to the I/O bus.
    pub bridge: Bridge,
    /// Bridge from the I/O bus back up to the local APIC.
    pub apic_bridge: Bridge,
    /// I/O coherence cache.
    pub io_cache: CacheParams,
    /// Firmware SMBIOS table.
    pub smbios: SmbiosTable,
    /// Intel MP table.
    pub mp_table: MpTable,
    /// E820 memory map.
    pub e820: Vec<E820Entry>,
}

impl X86Platform {
    /// Describes the platform for a validated configuration.
    ///
    /// Memory size must already be checked against [`IO_GAP_START`].
    pub fn init_fs(config: &Config) -> Self {
        let delay = config.system.bridge_delay;
        let bridge = Bridge {
            name: "bridge",
            delay,
            ranges: vec![
                AddrRange::inclusive(IO_GAP_START, BIOS_ROM_START - 1),
                AddrRange::inclusive(IO_ADDRESS_SPACE_BASE, INTERRUPTS_ADDRESS_SPACE_BASE - 1),
                AddrRange::inclusive(PCI_CONFIG_ADDRESS_SPACE_BASE, u64::MAX),
            ],
        };
        let apic_bridge = Bridge {
            name: "apicbridge",
            delay,
            ranges: vec![AddrRange::with_size(INTERRUPTS_ADDRESS_SPACE_BASE, APIC_RANGE_SIZE)],
        };

        Self {
            bridge,
            apic_bridge,
            io_cache: config.cache_params(CacheLevel::Io),
            smbios: SmbiosTable {
                structures: vec![BiosInformation::default()],
            },
            mp_table: MpTable::uniprocessor(LocalApic::VERSION),
            e820: e820::memory_map(config.system.mem_size.bytes()),
        }
    }
}
