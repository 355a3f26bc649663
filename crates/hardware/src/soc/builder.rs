//! Full-system construction and the top-level `System` type.
//!
//! This module builds the complete PC from a validated configuration. Bring-up runs in a fixed
//! order, and each stage only depends on the stages before it:
//! 1. **Clock domain:** System clock and voltage domain.
//! 2. **Memory ranges:** Main memory from address zero plus the 1MB I/O window at 3GB.
//! 3. **Memory bus:** Crossbar with a bad-address responder and the functional system port.
//! 4. **Platform:** Bridges, I/O bus, I/O cache, and firmware tables.
//! 5. **Kernel:** Kernel image path and boot flags.
//! 6. **Disks:** Copy-on-write images on the IDE controller. A missing image stops bring-up
//!    here, before any CPU or cache exists.
//! 7. **CPU:** Model, memory mode, and thread context.
//! 8. **Caches:** Split L1s on the CPU ports, an optional L2 behind an L2 bus, TLB walkers.
//! 9. **Memory controller:** One controller on the first memory range.
//! 10. **Interrupts:** Local APIC PIO and interrupt ports on the memory bus.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::{AddrRange, Frequency, SystemError};
use crate::config::{Config, MemMode, MemoryController};
use crate::core::cache::{CacheLevel, CacheParams};
use crate::core::cpu::{CPU_NAME, Cpu};
use crate::disk::{IdeController, IdeDisk};
use crate::soc::ports::{PortGraph, PortRef};
use crate::soc::x86::{IO_GAP_START, IO_GAP_WINDOW, X86Platform};
use crate::stats::DiskStats;

const MEMBUS: &str = "membus";
const IOBUS: &str = "iobus";
const L2BUS: &str = "l2bus";
const IDE: &str = "pc.south_bridge.ide";

/// Bring-up stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Clock and voltage domain.
    ClockDomain,
    /// Physical memory ranges.
    MemoryRanges,
    /// Memory bus and bad-address responder.
    MemoryBus,
    /// x86 platform (bridges, I/O bus, firmware tables).
    Platform,
    /// Kernel image and command line.
    Kernel,
    /// Disk images and IDE controller.
    Disks,
    /// CPU.
    Cpu,
    /// Cache hierarchy.
    Caches,
    /// Main memory controller.
    MemoryController,
    /// Interrupt controller wiring.
    Interrupts,
}

impl Stage {
    /// Every stage, in bring-up order.
    pub const ALL: [Self; 10] = [
        Self::ClockDomain,
        Self::MemoryRanges,
        Self::MemoryBus,
        Self::Platform,
        Self::Kernel,
        Self::Disks,
        Self::Cpu,
        Self::Caches,
        Self::MemoryController,
        Self::Interrupts,
    ];

    /// Returns a short stage name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClockDomain => "clock-domain",
            Self::MemoryRanges => "memory-ranges",
            Self::MemoryBus => "memory-bus",
            Self::Platform => "platform",
            Self::Kernel => "kernel",
            Self::Disks => "disks",
            Self::Cpu => "cpu",
            Self::Caches => "caches",
            Self::MemoryController => "memory-controller",
            Self::Interrupts => "interrupts",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main memory controller placed on one memory range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemCtrl {
    /// Controller model.
    pub model: MemoryController,
    /// Range served.
    pub range: AddrRange,
}

/// A fully wired simulated PC.
#[derive(Debug)]
pub struct System {
    stages: Vec<Stage>,
    clock: Frequency,
    voltage: f64,
    mem_ranges: Vec<AddrRange>,
    platform: Option<X86Platform>,
    kernel: PathBuf,
    boot_osflags: String,
    ide: IdeController,
    cpu: Option<Cpu>,
    mem_mode: MemMode,
    caches: Vec<CacheParams>,
    mem_ctrl: Option<MemCtrl>,
    ports: PortGraph,
    membus_requestors: usize,
    iobus_requestors: usize,
}

impl System {
    /// Validates `config` and brings up every component in order.
    ///
    /// # Errors
    ///
    /// `SystemError::Config` if validation fails, `SystemError::Disk` if a disk image cannot be
    /// opened, or a wiring error if two components claim the same port.
    pub fn new(config: &Config) -> Result<Self, SystemError> {
        config.validate()?;

        let mut sys = Self {
            stages: Vec::with_capacity(Stage::ALL.len()),
            clock: config.system.clock,
            voltage: config.system.voltage,
            mem_ranges: Vec::new(),
            platform: None,
            kernel: PathBuf::new(),
            boot_osflags: String::new(),
            ide: IdeController::new(),
            cpu: None,
            mem_mode: MemMode::Atomic,
            caches: Vec::new(),
            mem_ctrl: None,
            ports: PortGraph::new(),
            membus_requestors: 0,
            iobus_requestors: 0,
        };
        sys.finish(Stage::ClockDomain);

        sys.mem_ranges = vec![
            AddrRange::from_zero(config.system.mem_size.bytes()),
            AddrRange::with_size(IO_GAP_START, IO_GAP_WINDOW),
        ];
        sys.finish(Stage::MemoryRanges);

        sys.create_membus()?;
        sys.finish(Stage::MemoryBus);

        sys.init_platform(config)?;
        sys.finish(Stage::Platform);

        sys.kernel.clone_from(&config.general.kernel);
        sys.boot_osflags = config.boot_osflags();
        sys.finish(Stage::Kernel);

        sys.set_disk_images(config)?;
        sys.finish(Stage::Disks);

        let mut cpu = Cpu::new(&config.cpu);
        cpu.create_threads();
        sys.mem_mode = cpu.mem_mode();
        sys.cpu = Some(cpu);
        sys.finish(Stage::Cpu);

        sys.create_cache_hierarchy(config)?;
        sys.finish(Stage::Caches);

        sys.create_memory_controller(config)?;
        sys.finish(Stage::MemoryController);

        sys.setup_interrupts()?;
        sys.finish(Stage::Interrupts);

        tracing::info!(
            cpu = config.cpu.model.as_str(),
            mem_mode = sys.mem_mode.as_str(),
            mem_size = %config.system.mem_size,
            disks = sys.ide.len(),
            "system ready"
        );
        Ok(sys)
    }

    fn finish(&mut self, stage: Stage) {
        tracing::debug!(%stage, "bring-up stage complete");
        self.stages.push(stage);
    }

    fn next_membus_port(&mut self) -> PortRef {
        let port = PortRef::new(MEMBUS, format!("mem_side_ports[{}]", self.membus_requestors));
        self.membus_requestors += 1;
        port
    }

    fn next_iobus_port(&mut self) -> PortRef {
        let port = PortRef::new(IOBUS, format!("mem_side_ports[{}]", self.iobus_requestors));
        self.iobus_requestors += 1;
        port
    }

    fn membus_responder() -> PortRef {
        PortRef::new(MEMBUS, "cpu_side_ports")
    }

    fn create_membus(&mut self) -> Result<(), SystemError> {
        let system_port = PortRef::new("system", "system_port");
        self.ports.require(system_port.clone());
        self.ports.connect(system_port, Self::membus_responder())?;
        self.ports.connect(
            PortRef::new(MEMBUS, "default"),
            PortRef::new("membus.badaddr_responder", "pio"),
        )
    }

    fn init_platform(&mut self, config: &Config) -> Result<(), SystemError> {
        let platform = X86Platform::init_fs(config);

        let bridge = platform.bridge.name;
        let req = self.next_membus_port();
        self.ports.connect(req, PortRef::new(bridge, "cpu_side_port"))?;
        self.ports.connect(
            PortRef::new(bridge, "mem_side_port"),
            PortRef::new(IOBUS, "cpu_side_ports"),
        )?;

        let apic_bridge = platform.apic_bridge.name;
        let req = self.next_iobus_port();
        self.ports.connect(req, PortRef::new(apic_bridge, "cpu_side_port"))?;
        self.ports.connect(
            PortRef::new(apic_bridge, "mem_side_port"),
            Self::membus_responder(),
        )?;

        let ide_pio = PortRef::new(IDE, "pio");
        let ide_dma = PortRef::new(IDE, "dma");
        self.ports.require(ide_pio.clone());
        self.ports.require(ide_dma.clone());
        let req = self.next_iobus_port();
        self.ports.connect(req, ide_pio)?;
        self.ports.connect(ide_dma, PortRef::new(IOBUS, "cpu_side_ports"))?;

        let iocache = CacheLevel::Io.name();
        let req = self.next_iobus_port();
        self.connect_cache(iocache, req, Self::membus_responder())?;

        self.platform = Some(platform);
        Ok(())
    }

    fn connect_cache(
        &mut self,
        cache: &str,
        upstream: PortRef,
        downstream: PortRef,
    ) -> Result<(), SystemError> {
        let cpu_side = PortRef::new(cache, "cpu_side");
        let mem_side = PortRef::new(cache, "mem_side");
        self.ports.require(cpu_side.clone());
        self.ports.require(mem_side.clone());
        self.ports.connect(upstream, cpu_side)?;
        self.ports.connect(mem_side, downstream)
    }

    fn set_disk_images(&mut self, config: &Config) -> Result<(), SystemError> {
        let disks = config
            .disks
            .iter()
            .map(|d| IdeDisk::cow(&d.image, d.drive, d.block_size))
            .collect::<Result<Vec<_>, _>>()?;
        self.ide = IdeController::with_disks(disks)?;
        Ok(())
    }

    fn create_cache_hierarchy(&mut self, config: &Config) -> Result<(), SystemError> {
        let l2 = config.cache.l2.is_enabled(false);
        let l1_downstream = if l2 {
            PortRef::new(L2BUS, "cpu_side_ports")
        } else {
            Self::membus_responder()
        };

        for level in [CacheLevel::L1I, CacheLevel::L1D] {
            let Some(cpu_port) = level.cpu_port() else {
                continue;
            };
            let upstream = PortRef::new(CPU_NAME, cpu_port);
            self.ports.require(upstream.clone());
            self.connect_cache(level.name(), upstream, l1_downstream.clone())?;
            self.caches.push(config.cache_params(level));
        }

        if l2 {
            let upstream = PortRef::new(L2BUS, "mem_side_ports[0]");
            self.connect_cache(CacheLevel::L2.name(), upstream, Self::membus_responder())?;
            self.caches.push(config.cache_params(CacheLevel::L2));
        }

        for walker in ["cpu.itb.walker", "cpu.dtb.walker"] {
            let port = PortRef::new(walker, "port");
            self.ports.require(port.clone());
            self.ports.connect(port, Self::membus_responder())?;
        }
        Ok(())
    }

    fn create_memory_controller(&mut self, config: &Config) -> Result<(), SystemError> {
        let ctrl = MemCtrl {
            model: config.memory.controller,
            range: self.mem_ranges[0],
        };
        let port = PortRef::new("mem_cntrl", "port");
        self.ports.require(port.clone());
        let req = self.next_membus_port();
        self.ports.connect(req, port)?;
        self.mem_ctrl = Some(ctrl);
        Ok(())
    }

    fn setup_interrupts(&mut self) -> Result<(), SystemError> {
        let Some(cpu) = self.cpu.as_mut() else {
            return Ok(());
        };
        let apic = cpu.create_interrupt_controller()?;
        let owner = format!("{CPU_NAME}.interrupts[{}]", apic.id);

        let pio = PortRef::new(owner.as_str(), "pio");
        let int_requestor = PortRef::new(owner.as_str(), "int_requestor");
        let int_responder = PortRef::new(owner.as_str(), "int_responder");
        for port in [&pio, &int_requestor, &int_responder] {
            self.ports.require(port.clone());
        }

        let req = self.next_membus_port();
        self.ports.connect(req, pio)?;
        self.ports.connect(int_requestor, Self::membus_responder())?;
        let req = self.next_membus_port();
        self.ports.connect(req, int_responder)
    }

    /// Returns the bring-up stages completed, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns the system clock.
    pub const fn clock(&self) -> Frequency {
        self.clock
    }

    /// Returns the voltage of the system voltage domain.
    pub const fn voltage(&self) -> f64 {
        self.voltage
    }

    /// Returns the physical memory ranges: main memory first, then the I/O window.
    pub fn mem_ranges(&self) -> &[AddrRange] {
        &self.mem_ranges
    }

    /// Returns the platform description.
    pub const fn platform(&self) -> Option<&X86Platform> {
        self.platform.as_ref()
    }

    /// Returns the kernel image path.
    pub fn kernel(&self) -> &Path {
        &self.kernel
    }

    /// Returns the kernel command line.
    pub fn boot_osflags(&self) -> &str {
        &self.boot_osflags
    }

    /// Returns the IDE controller.
    pub const fn ide(&self) -> &IdeController {
        &self.ide
    }

    /// Returns the IDE controller mutably.
    pub const fn ide_mut(&mut self) -> &mut IdeController {
        &mut self.ide
    }

    /// Returns the CPU.
    pub const fn cpu(&self) -> Option<&Cpu> {
        self.cpu.as_ref()
    }

    /// Returns the memory mode selected by the CPU model.
    pub const fn mem_mode(&self) -> MemMode {
        self.mem_mode
    }

    /// Returns the CPU-side caches (L1I, L1D, then L2 if enabled).
    pub fn caches(&self) -> &[CacheParams] {
        &self.caches
    }

    /// Returns the main memory controller.
    pub const fn mem_ctrl(&self) -> Option<&MemCtrl> {
        self.mem_ctrl.as_ref()
    }

    /// Returns the port graph.
    pub const fn ports(&self) -> &PortGraph {
        &self.ports
    }

    /// Checks that every required port is wired.
    ///
    /// # Errors
    ///
    /// `SystemError::UnconnectedPort` for the first unconnected required port.
    pub fn validate_ports(&self) -> Result<(), SystemError> {
        self.ports.validate()
    }

    /// Closes every disk, discarding all copy-on-write state, and returns per-disk stats.
    pub fn shutdown(&mut self) -> Vec<(String, DiskStats)> {
        let stats = self.ide.close_all();
        tracing::info!(disks = stats.len(), "system shut down");
        stats
    }
}
