//! Full-system platform components.
//!
//! This module organizes what surrounds the CPU: the x86 PC platform description, the port
//! graph wiring components together, and the builder that assembles the system.

/// System builder and bring-up sequencing.
pub mod builder;

/// Port wiring between components.
pub mod ports;

/// x86 PC platform (bridges, firmware tables, memory map).
pub mod x86;

pub use builder::{Stage, System};
pub use ports::{PortGraph, PortRef};
pub use x86::X86Platform;
