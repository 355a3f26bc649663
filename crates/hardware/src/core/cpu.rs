//! CPU description.
//!
//! A CPU is selected by tag from the closed `CpuModel` set. Model-specific state (the Minor
//! functional-unit pool) is carried alongside rather than through a type hierarchy.

use crate::common::{AddrRange, SystemError};
use crate::config::{CpuConfig, CpuModel, MemMode};
use crate::core::fu_pool::FuPool;
use crate::soc::x86::{APIC_RANGE_SIZE, INTERRUPTS_ADDRESS_SPACE_BASE};

/// Object name of the CPU in the port graph.
pub const CPU_NAME: &str = "cpu";

/// Local APIC of one CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalApic {
    /// APIC identifier; also the CPU index.
    pub id: u8,
    /// Version reported in the MP table.
    pub version: u8,
    /// Memory-mapped register window in the interrupts address space.
    pub pio: AddrRange,
}

impl LocalApic {
    /// Version of the local APIC model.
    pub const VERSION: u8 = 0x14;

    /// Creates the APIC for CPU `id`.
    pub const fn new(id: u8) -> Self {
        Self {
            id,
            version: Self::VERSION,
            pio: AddrRange::with_size(
                INTERRUPTS_ADDRESS_SPACE_BASE + id as u64 * APIC_RANGE_SIZE,
                APIC_RANGE_SIZE,
            ),
        }
    }
}

/// A configured CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    model: CpuModel,
    fu_pool: Option<FuPool>,
    interrupts: Vec<LocalApic>,
    threads: usize,
}

impl Cpu {
    /// Builds the CPU described by `config`.
    pub fn new(config: &CpuConfig) -> Self {
        let fu_pool = match config.model {
            CpuModel::Minor => Some(FuPool::from_config(config)),
            CpuModel::AtomicSimple | CpuModel::O3 => None,
        };
        Self {
            model: config.model,
            fu_pool,
            interrupts: Vec::new(),
            threads: 0,
        }
    }

    /// Returns the selected model.
    pub const fn model(&self) -> CpuModel {
        self.model
    }

    /// Returns the memory mode the system must run in for this CPU.
    pub const fn mem_mode(&self) -> MemMode {
        self.model.mem_mode()
    }

    /// Returns the execute-stage functional units (Minor only).
    pub const fn fu_pool(&self) -> Option<&FuPool> {
        self.fu_pool.as_ref()
    }

    /// Creates the hardware thread context. Single-threaded cores get exactly one.
    pub const fn create_threads(&mut self) {
        self.threads = 1;
    }

    /// Returns the number of hardware thread contexts.
    pub const fn threads(&self) -> usize {
        self.threads
    }

    /// Creates the next interrupt controller and returns it. The first one is local APIC 0.
    ///
    /// # Errors
    ///
    /// `SystemError::ApicIdsExhausted` once every 8-bit APIC id is taken.
    pub fn create_interrupt_controller(&mut self) -> Result<LocalApic, SystemError> {
        let count = self.interrupts.len();
        let id = u8::try_from(count).map_err(|_| SystemError::ApicIdsExhausted { count })?;
        let apic = LocalApic::new(id);
        self.interrupts.push(apic);
        Ok(apic)
    }

    /// Returns the interrupt controllers created so far.
    pub fn interrupts(&self) -> &[LocalApic] {
        &self.interrupts
    }
}
