//! Block device trait.
//!
//! This module defines the `BlockDevice` trait consumed by disk controllers. It provides:
//! 1. **Geometry:** Block size and number of addressable blocks.
//! 2. **Access:** Whole-block read and write at a block address.
//! 3. **Lifecycle:** `close` ends the session; afterwards every access fails.
//!
//! Implementors must be `Send` so a session can move its devices to a worker thread.

use crate::common::DiskError;
use crate::stats::DiskStats;

/// A logical block device owned by exactly one simulation session.
pub trait BlockDevice: Send {
    /// Returns a short name for this device (e.g., `"cow:linux-x86.img"`).
    fn name(&self) -> &str;
    /// Returns the block size in bytes.
    fn block_size(&self) -> usize;
    /// Returns the number of addressable blocks.
    fn num_blocks(&self) -> u64;
    /// Reads block `block` into `buf` (exactly one block long).
    ///
    /// # Errors
    ///
    /// `DiskError::OutOfRange`, `DiskError::Closed`, or a host I/O failure.
    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<(), DiskError>;
    /// Writes one block of `data` at `block`.
    ///
    /// # Errors
    ///
    /// `DiskError::OutOfRange`, `DiskError::BlockSize`, or `DiskError::Closed`.
    fn write_block(&mut self, block: u64, data: &[u8]) -> Result<(), DiskError>;
    /// Ends the session for this device. Never fails; closing twice is harmless.
    fn close(&mut self);
    /// Returns `true` once `close` has been called.
    fn is_closed(&self) -> bool;

    /// Returns the capacity in bytes.
    fn capacity_bytes(&self) -> u64 {
        self.num_blocks() * self.block_size() as u64
    }
    /// Returns activity counters for this device.
    fn stats(&self) -> DiskStats {
        DiskStats::default()
    }
}
