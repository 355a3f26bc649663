//! Full-system x86 simulation setup with copy-on-write disks.
//!
//! This crate describes and brings up a simulated PC, and provides the storage model its disks
//! run on:
//! 1. **Disk:** Read-only raw images, per-session write overlays, and the copy-on-write device
//!    that combines them, hosted on a two-channel IDE controller.
//! 2. **Configuration:** One immutable, validated record for the whole system.
//! 3. **Core:** CPU model selection, functional units, and cache parameters.
//! 4. **SoC:** The x86 platform (bridges, MP table, E820 map), port wiring, and bring-up.
//! 5. **Simulation:** Sessions that own a system from bring-up to shutdown, and statistics.
//!
//! Writes made during a session are visible to later reads in that session and are never
//! written back to the image file.

/// Common types (address ranges, quantities, errors).
pub mod common;
/// System configuration (defaults, enums, validation).
pub mod config;
/// CPU, functional units, and caches.
pub mod core;
/// Disk images, overlays, and block devices.
pub mod disk;
/// Simulation sessions.
pub mod sim;
/// Platform description, port wiring, and system bring-up.
pub mod soc;
/// Disk statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or parse from JSON.
pub use crate::config::Config;
/// Copy-on-write block device.
pub use crate::disk::CowDisk;
/// Simulation session; construct with `Session::new`.
pub use crate::sim::Session;
/// Fully wired system; construct with `System::new`.
pub use crate::soc::System;
