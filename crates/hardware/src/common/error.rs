//! Error types for disk access, configuration, and system bring-up.
//!
//! This module defines the error taxonomy of the crate. It provides:
//! 1. **Disk errors:** Failures opening a backing image and address-range violations on a device.
//! 2. **Configuration errors:** Invalid parameter values and cross-field inconsistencies.
//! 3. **System errors:** The union of the above plus port-wiring failures, returned by bring-up.
//!
//! None of these errors ever causes overlay contents to be written back to a backing image.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by block devices and their backing images.
#[derive(Debug, Error)]
pub enum DiskError {
    /// The backing image path is missing, unreadable, or not a regular file.
    ///
    /// Fatal for the session: raised at construction, before any read or write.
    #[error("disk image not found or unreadable: {}", path.display())]
    ImageNotFound {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying host error.
        #[source]
        source: io::Error,
    },

    /// A block address lies beyond the end of the image.
    ///
    /// Recoverable: the device and its overlay are left untouched.
    #[error("block {block} out of range (image has {num_blocks} blocks)")]
    OutOfRange {
        /// Offending block address.
        block: u64,
        /// Number of addressable blocks in the image.
        num_blocks: u64,
    },

    /// A whole-block write carried a payload of the wrong length.
    #[error("write of {actual} bytes does not match block size {expected}")]
    BlockSize {
        /// Device block size in bytes.
        expected: usize,
        /// Length of the supplied payload.
        actual: usize,
    },

    /// The requested block size is zero.
    #[error("invalid block size {0}")]
    InvalidBlockSize(usize),

    /// The device was closed; its overlay is gone and it accepts no further requests.
    #[error("device is closed")]
    Closed,

    /// A host read of the backing image failed after it was opened.
    #[error("backing image read failed")]
    Io(#[from] io::Error),
}

/// Errors raised while parsing or validating a configuration record.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A size, frequency, or latency string could not be parsed.
    #[error("invalid {kind} value {value:?}")]
    InvalidQuantity {
        /// Kind of quantity ("size", "frequency", "latency").
        kind: &'static str,
        /// Text that failed to parse.
        value: String,
    },

    /// A parameter holds a value outside its permitted domain.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Main memory reaches into the x86 I/O hole below 4 GiB.
    #[error("memory size {size:#x} overlaps the I/O gap starting at {gap_start:#x}")]
    IoGapOverlap {
        /// Requested memory size in bytes.
        size: u64,
        /// First address of the I/O gap.
        gap_start: u64,
    },

    /// More disks were attached than the IDE controller has drive slots.
    #[error("{count} disks attached but the IDE controller only has {max} slots")]
    TooManyDisks {
        /// Number of disks requested.
        count: usize,
        /// Number of available slots.
        max: usize,
    },

    /// Every channel already has a drive in the requested position.
    #[error("no free IDE {drive} slot")]
    NoFreeSlot {
        /// Drive position name.
        drive: &'static str,
    },

    /// A slave drive was attached to a channel with no master.
    #[error("IDE channel {channel} has a slave drive but no master")]
    OrphanSlave {
        /// IDE channel index.
        channel: usize,
    },

    /// The configuration file could not be read.
    #[error("cannot read configuration {}", path.display())]
    Read {
        /// Configuration path.
        path: PathBuf,
        /// Underlying host error.
        #[source]
        source: io::Error,
    },

    /// The configuration text is not valid JSON for the schema.
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while bringing up a system or session.
#[derive(Debug, Error)]
pub enum SystemError {
    /// A disk could not be opened or accessed.
    #[error(transparent)]
    Disk(#[from] DiskError),

    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A port that must be wired before instantiation was left unconnected.
    #[error("port {owner}.{port} is not connected")]
    UnconnectedPort {
        /// Object that owns the port.
        owner: String,
        /// Port name.
        port: String,
    },

    /// A port was connected more than once.
    #[error("port {owner}.{port} is already connected")]
    PortInUse {
        /// Object that owns the port.
        owner: String,
        /// Port name.
        port: String,
    },

    /// The session script named by `readfile` could not be read.
    #[error("cannot read session script {}", path.display())]
    Script {
        /// Script path.
        path: PathBuf,
        /// Underlying host error.
        #[source]
        source: io::Error,
    },

    /// The session was instantiated twice.
    #[error("session already instantiated")]
    AlreadyInstantiated,

    /// Every local APIC identifier is already in use.
    #[error("no free local APIC id ({count} controllers exist)")]
    ApicIdsExhausted {
        /// Number of interrupt controllers already created.
        count: usize,
    },
}
