//! Processor-side components.
//!
//! This module describes what sits between the CPU and the memory bus:
//! 1. **CPU:** Model selection, thread context, and local interrupt controller.
//! 2. **Functional units:** The in-order CPU's execute-stage pool.
//! 3. **Caches:** Per-level parameter sets with configuration overrides.

/// Cache parameter sets and levels.
pub mod cache;

/// CPU description.
pub mod cpu;

/// Minor CPU functional-unit pool.
pub mod fu_pool;

pub use cache::{CacheLevel, CacheParams};
pub use cpu::{Cpu, LocalApic};
pub use fu_pool::{FuKind, FuPool, FunctionalUnit};
