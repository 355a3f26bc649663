//! Configuration system for the simulated platform.
//!
//! This module defines the single, immutable configuration record handed to system bring-up.
//! It provides:
//! 1. **Defaults:** The baseline x86 platform (3GHz, 512MB, one atomic CPU, split L1, one
//!    copy-on-write root disk).
//! 2. **Structures:** Hierarchical sections for general, system, CPU, cache, memory, and disks.
//! 3. **Enums:** CPU model and memory controller selections as closed tag sets.
//! 4. **Validation:** Cross-field checks run before any component is constructed.
//!
//! Configuration is supplied as JSON (`Config::from_json`, `Config::from_file`) or taken from
//! `Config::default()`. Sizes, clocks, and delays accept strings such as `"16kB"`, `"3GHz"`,
//! and `"50ns"`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::{ByteSize, ConfigError, Frequency, Latency};
use crate::core::cache::{CacheLevel, CacheParams};
use crate::disk::{DriveId, SECTOR_SIZE};
use crate::disk::ide::MAX_IDE_DISKS;
use crate::soc::x86::IO_GAP_START;

/// Default configuration constants for the platform.
mod defaults {
    /// System clock (3 GHz).
    pub const CLOCK_HZ: u64 = 3_000_000_000;

    /// Main memory size (512 MiB); must stay below the I/O gap at 3 GiB.
    pub const MEM_SIZE: u64 = 512 * 1024 * 1024;

    /// Supply voltage of the system voltage domain, in volts.
    pub const VOLTAGE: f64 = 1.0;

    /// Delay through the north bridge and APIC bridge (50 ns).
    pub const BRIDGE_DELAY_PS: u64 = 50_000;

    /// Kernel image, relative to the working directory.
    pub const KERNEL: &str = "binaries/x86_64-vmlinux-2.6.22.9";

    /// Root disk image, relative to the working directory.
    pub const DISK_IMAGE: &str = "disks/linux-x86.img";

    /// Kernel command line, one flag per entry.
    pub const BOOT_OPTIONS: [&str; 4] = [
        "earlyprintk=ttyS0",
        "console=ttyS0",
        "lpj=7999923",
        "root=/dev/hda1",
    ];
}

/// CPU model selection.
///
/// Each model is a fixed parameter set; there is no inheritance between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CpuModel {
    /// Single-cycle functional CPU using atomic memory accesses.
    #[default]
    #[serde(alias = "Atomic", alias = "atomic")]
    AtomicSimple,
    /// Four-stage in-order pipeline with a configurable functional-unit pool.
    #[serde(alias = "minor")]
    Minor,
    /// Out-of-order CPU.
    #[serde(alias = "DerivO3", alias = "o3")]
    O3,
}

impl CpuModel {
    /// Returns the memory system mode this CPU requires.
    pub const fn mem_mode(self) -> MemMode {
        match self {
            Self::AtomicSimple => MemMode::Atomic,
            Self::Minor | Self::O3 => MemMode::Timing,
        }
    }

    /// Returns the model name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AtomicSimple => "AtomicSimpleCPU",
            Self::Minor => "MinorCPU",
            Self::O3 => "DerivO3CPU",
        }
    }
}

/// Memory access mode of the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemMode {
    /// Accesses complete immediately with an estimated latency.
    Atomic,
    /// Accesses are timed through the memory system.
    Timing,
}

impl MemMode {
    /// Returns the lowercase mode name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Atomic => "atomic",
            Self::Timing => "timing",
        }
    }
}

/// Main memory controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MemoryController {
    /// DDR3-1600 with eight x8 devices per rank.
    #[default]
    #[serde(rename = "DDR3_1600_8x8")]
    Ddr3_1600_8x8,
    /// DDR3-1600 with a single x64 interface.
    #[serde(rename = "DDR3_1600_x64")]
    Ddr3_1600_x64,
    /// Fixed-latency memory.
    #[serde(rename = "SimpleMemory", alias = "Simple")]
    Simple,
}

impl MemoryController {
    /// Returns the controller model name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ddr3_1600_8x8 => "DDR3_1600_8x8",
            Self::Ddr3_1600_x64 => "DDR3_1600_x64",
            Self::Simple => "SimpleMemory",
        }
    }
}

/// Root configuration record.
///
/// # Examples
///
/// ```
/// use fssim_core::config::{Config, CpuModel};
///
/// let json = r#"{
///     "system": { "clock": "2GHz", "mem_size": "256MB" },
///     "cpu": { "model": "Minor", "fpu_operation_latency": 4 },
///     "cache": { "l1_d": { "size": "32kB" } },
///     "disks": [ { "image": "root.img" } ]
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.cpu.model, CpuModel::Minor);
/// assert_eq!(config.system.mem_size.bytes(), 256 << 20);
/// assert_eq!(config.disks[0].block_size, 512);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Kernel, boot flags, and session script
    pub general: GeneralConfig,
    /// Clock, memory size, and bridge parameters
    pub system: SystemConfig,
    /// CPU model and functional-unit overrides
    pub cpu: CpuConfig,
    /// Per-level cache overrides
    pub cache: CacheHierarchyConfig,
    /// Main memory controller
    pub memory: MemoryConfig,
    /// Disks on the IDE controller, in attach order
    #[serde(default = "Config::default_disks")]
    pub disks: Vec<DiskConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            system: SystemConfig::default(),
            cpu: CpuConfig::default(),
            cache: CacheHierarchyConfig::default(),
            memory: MemoryConfig::default(),
            disks: Self::default_disks(),
        }
    }
}

impl Config {
    fn default_disks() -> Vec<DiskConfig> {
        vec![DiskConfig::default()]
    }

    /// Parses a configuration from JSON text and validates it.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` for malformed JSON or unknown fields, otherwise any validation error.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Read` if the file cannot be read, otherwise as for [`Config::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Returns the resolved parameters for a cache level.
    pub fn cache_params(&self, level: CacheLevel) -> CacheParams {
        let overrides = match level {
            CacheLevel::L1I => &self.cache.l1_i,
            CacheLevel::L1D => &self.cache.l1_d,
            CacheLevel::L2 => &self.cache.l2,
            CacheLevel::Io => &self.cache.io,
        };
        CacheParams::resolve(level, overrides)
    }

    /// Checks every cross-field invariant.
    ///
    /// # Errors
    ///
    /// The first violated invariant, as a `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mem = self.system.mem_size.bytes();
        if mem <= ByteSize::MIB {
            return Err(invalid("system.mem_size", "must exceed the 1MB legacy region"));
        }
        if mem > IO_GAP_START {
            return Err(ConfigError::IoGapOverlap {
                size: mem,
                gap_start: IO_GAP_START,
            });
        }
        if !self.system.voltage.is_finite() || self.system.voltage <= 0.0 {
            return Err(invalid("system.voltage", "must be a positive number of volts"));
        }

        for (i, opt) in self.general.boot_options.iter().enumerate() {
            if opt.is_empty() || opt.chars().any(char::is_whitespace) {
                return Err(invalid(
                    &format!("general.boot_options[{i}]"),
                    "must be a single non-empty flag",
                ));
            }
        }

        for level in CacheLevel::ALL {
            if level == CacheLevel::L2 && !self.cache.l2.is_enabled(false) {
                continue;
            }
            self.cache_params(level).validate()?;
        }

        if self.disks.len() > MAX_IDE_DISKS {
            return Err(ConfigError::TooManyDisks {
                count: self.disks.len(),
                max: MAX_IDE_DISKS,
            });
        }
        for (i, disk) in self.disks.iter().enumerate() {
            if disk.block_size == 0 {
                return Err(invalid(&format!("disks[{i}].block_size"), "must be nonzero"));
            }
            if disk.image.as_os_str().is_empty() {
                return Err(invalid(&format!("disks[{i}].image"), "must name an image file"));
            }
        }
        Ok(())
    }

    /// Returns the kernel command line.
    pub fn boot_osflags(&self) -> String {
        self.general.boot_options.join(" ")
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Kernel and session inputs.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Kernel image to boot
    #[serde(default = "GeneralConfig::default_kernel")]
    pub kernel: PathBuf,

    /// Kernel command-line flags, joined with spaces at boot
    #[serde(default = "GeneralConfig::default_boot_options")]
    pub boot_options: Vec<String>,

    /// Script the simulated system reads and executes after boot
    #[serde(default)]
    pub readfile: Option<PathBuf>,
}

impl GeneralConfig {
    fn default_kernel() -> PathBuf {
        PathBuf::from(defaults::KERNEL)
    }

    fn default_boot_options() -> Vec<String> {
        defaults::BOOT_OPTIONS.iter().map(ToString::to_string).collect()
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            kernel: Self::default_kernel(),
            boot_options: Self::default_boot_options(),
            readfile: None,
        }
    }
}

/// Clock domain, memory size, and bridge parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// System clock
    #[serde(default = "SystemConfig::default_clock")]
    pub clock: Frequency,

    /// Voltage of the system voltage domain (volts)
    #[serde(default = "SystemConfig::default_voltage")]
    pub voltage: f64,

    /// Main memory size
    #[serde(default = "SystemConfig::default_mem_size")]
    pub mem_size: ByteSize,

    /// Delay through the I/O and APIC bridges
    #[serde(default = "SystemConfig::default_bridge_delay")]
    pub bridge_delay: Latency,
}

impl SystemConfig {
    fn default_clock() -> Frequency {
        Frequency(defaults::CLOCK_HZ)
    }

    fn default_voltage() -> f64 {
        defaults::VOLTAGE
    }

    fn default_mem_size() -> ByteSize {
        ByteSize(defaults::MEM_SIZE)
    }

    fn default_bridge_delay() -> Latency {
        Latency(defaults::BRIDGE_DELAY_PS)
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            clock: Self::default_clock(),
            voltage: Self::default_voltage(),
            mem_size: Self::default_mem_size(),
            bridge_delay: Self::default_bridge_delay(),
        }
    }
}

/// CPU selection and functional-unit overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CpuConfig {
    /// CPU model
    #[serde(default)]
    pub model: CpuModel,

    /// Floating-point/SIMD operation latency override (Minor only; 0 keeps the default)
    #[serde(default)]
    pub fpu_operation_latency: Option<u32>,

    /// Floating-point/SIMD issue latency override (Minor only; 0 keeps the default)
    #[serde(default)]
    pub fpu_issue_latency: Option<u32>,
}

/// Per-level cache overrides on top of each level's base parameters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheHierarchyConfig {
    /// L1 instruction cache
    pub l1_i: CacheOverrides,
    /// L1 data cache
    pub l1_d: CacheOverrides,
    /// Unified L2 (disabled unless `enabled` is set)
    pub l2: CacheOverrides,
    /// I/O coherence cache on the I/O bus
    pub io: CacheOverrides,
}

/// Optional overrides for one cache; unset fields keep the level's base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOverrides {
    /// Instantiate this cache (only meaningful for the L2)
    pub enabled: Option<bool>,
    /// Capacity
    pub size: Option<ByteSize>,
    /// Line size
    pub line_size: Option<ByteSize>,
    /// Associativity
    pub assoc: Option<u32>,
    /// Lookup latency in cycles
    pub hit_latency: Option<u32>,
    /// Response latency in cycles
    pub response_latency: Option<u32>,
    /// Miss status holding registers
    pub mshrs: Option<u32>,
    /// Targets per MSHR
    pub tgts_per_mshr: Option<u32>,
}

impl CacheOverrides {
    /// Returns whether the cache is instantiated, given the level's default.
    pub fn is_enabled(&self, default: bool) -> bool {
        self.enabled.unwrap_or(default)
    }
}

/// Main memory configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Controller model placed on the first memory range
    #[serde(default)]
    pub controller: MemoryController,
}

/// One disk on the IDE controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiskConfig {
    /// Read-only base image
    #[serde(default = "DiskConfig::default_image")]
    pub image: PathBuf,

    /// Drive position
    #[serde(default)]
    pub drive: DriveId,

    /// Block size in bytes
    #[serde(default = "DiskConfig::default_block_size")]
    pub block_size: usize,
}

impl DiskConfig {
    fn default_image() -> PathBuf {
        PathBuf::from(defaults::DISK_IMAGE)
    }

    const fn default_block_size() -> usize {
        SECTOR_SIZE
    }

    /// Creates a master-drive entry for `image` with 512-byte sectors.
    pub fn master(image: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            drive: DriveId::Master,
            block_size: SECTOR_SIZE,
        }
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::master(defaults::DISK_IMAGE)
    }
}
