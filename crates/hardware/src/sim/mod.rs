//! Simulation sessions.
//!
//! A session owns one fully built system for its lifetime: it is created from a configuration,
//! instantiated once, and ended, at which point every disk overlay is discarded.

/// Session lifecycle and end-of-session report.
pub mod session;

pub use session::{Session, SessionReport};
