//! Disk session statistics collection and reporting.
//!
//! This module tracks activity on a copy-on-write device over one session. It provides:
//! 1. **Reads:** Blocks served from the overlay versus the read-only base image.
//! 2. **Writes:** Blocks captured into the overlay, and how many were no-op rewrites.
//! 3. **Teardown:** Number of dirty blocks discarded when the device closed.

/// Per-device statistics for one simulation session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskStats {
    /// Block reads satisfied by the overlay.
    pub reads_overlay: u64,
    /// Block reads satisfied by the backing image.
    pub reads_base: u64,
    /// Block writes captured into the overlay.
    pub writes: u64,
    /// Writes whose content matched what the overlay already held.
    pub writes_unchanged: u64,
    /// Distinct blocks currently held by the overlay.
    pub dirty_blocks: u64,
    /// Dirty blocks thrown away at close.
    pub blocks_discarded: u64,
}

impl DiskStats {
    /// Returns the total number of block reads.
    pub const fn reads(&self) -> u64 {
        self.reads_overlay + self.reads_base
    }

    /// Returns the fraction of reads served by the overlay, or 0 when nothing was read.
    pub fn overlay_hit_rate(&self) -> f64 {
        let reads = self.reads();
        if reads == 0 {
            0.0
        } else {
            self.reads_overlay as f64 / reads as f64
        }
    }

    /// Prints the statistics block under the given device label.
    pub fn print(&self, label: &str) {
        println!("----------------------------------------------------------");
        println!("DISK {label}");
        println!("  disk.reads               {}", self.reads());
        println!("  disk.reads_overlay       {}", self.reads_overlay);
        println!("  disk.reads_base          {}", self.reads_base);
        println!("  disk.overlay_hit_rate    {:.4}", self.overlay_hit_rate());
        println!("  disk.writes              {}", self.writes);
        println!("  disk.writes_unchanged    {}", self.writes_unchanged);
        println!("  disk.dirty_blocks        {}", self.dirty_blocks);
        println!("  disk.blocks_discarded    {}", self.blocks_discarded);
    }
}
