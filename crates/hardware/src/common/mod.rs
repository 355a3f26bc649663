//! Common utilities and types used throughout the simulator setup.
//!
//! This module provides fundamental building blocks that are shared across all components.
//! It includes:
//! 1. **Address Ranges:** Inclusive physical address ranges for memory maps and bridges.
//! 2. **Units:** Sizes, frequencies, and latencies in the simulator's string notation.
//! 3. **Error Handling:** Disk, configuration, and bring-up error taxonomies.

/// Address range type.
pub mod addr;

/// Error types for disks, configuration, and bring-up.
pub mod error;

/// Size, frequency, and latency quantities.
pub mod units;

pub use addr::AddrRange;
pub use error::{ConfigError, DiskError, SystemError};
pub use units::{ByteSize, Frequency, Latency};
