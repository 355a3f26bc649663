//! Functional-unit pool for the in-order (Minor) CPU.
//!
//! The pool mirrors the default Minor execute stage: two integer ALUs, one multiplier,
//! one divider, a memory unit, a miscellaneous unit, and a floating-point/SIMD unit whose
//! latencies can be overridden from configuration.

use crate::config::CpuConfig;

/// Class of operations a functional unit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuKind {
    /// Integer ALU.
    Int,
    /// Integer multiplier.
    IntMul,
    /// Integer divider.
    IntDiv,
    /// Floating-point and SIMD unit.
    FloatSimd,
    /// Load/store unit.
    Mem,
    /// Miscellaneous (barriers, system instructions).
    Misc,
}

/// One functional unit and its timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionalUnit {
    /// Operation class.
    pub kind: FuKind,
    /// Cycles from issue to result.
    pub op_lat: u32,
    /// Cycles before the unit accepts another operation.
    pub issue_lat: u32,
}

impl FunctionalUnit {
    /// Returns the default unit for `kind`.
    pub const fn default_for(kind: FuKind) -> Self {
        let (op_lat, issue_lat) = match kind {
            FuKind::Int | FuKind::IntMul => (3, 1),
            FuKind::IntDiv => (9, 9),
            FuKind::FloatSimd => (6, 1),
            FuKind::Mem | FuKind::Misc => (1, 1),
        };
        Self {
            kind,
            op_lat,
            issue_lat,
        }
    }
}

/// Ordered set of functional units in the execute stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuPool {
    units: Vec<FunctionalUnit>,
}

impl FuPool {
    /// Builds the default pool, applying any nonzero FPU latency overrides from `cpu`.
    pub fn from_config(cpu: &CpuConfig) -> Self {
        let mut fpu = FunctionalUnit::default_for(FuKind::FloatSimd);
        if let Some(lat) = cpu.fpu_operation_latency.filter(|&l| l != 0) {
            fpu.op_lat = lat;
        }
        if let Some(lat) = cpu.fpu_issue_latency.filter(|&l| l != 0) {
            fpu.issue_lat = lat;
        }

        let units = [
            FuKind::Int,
            FuKind::Int,
            FuKind::IntMul,
            FuKind::IntDiv,
            FuKind::Mem,
            FuKind::Misc,
        ]
        .into_iter()
        .map(FunctionalUnit::default_for)
        .chain(std::iter::once(fpu))
        .collect();

        Self { units }
    }

    /// Returns the units in pool order.
    pub fn units(&self) -> &[FunctionalUnit] {
        &self.units
    }

    /// Returns the units of one kind.
    pub fn of_kind(&self, kind: FuKind) -> impl Iterator<Item = &FunctionalUnit> {
        self.units.iter().filter(move |u| u.kind == kind)
    }
}
