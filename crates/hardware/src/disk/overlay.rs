//! In-memory overlay layer.
//!
//! Captures every block written during a session, keyed by block address. The layer never
//! holds a reference to the backing image, so it cannot mutate it; it is created empty with
//! its device and dropped (or cleared) when the device closes.

use std::collections::HashMap;

/// Block-level write capture for one session.
#[derive(Clone, Debug, Default)]
pub struct OverlayLayer {
    blocks: HashMap<u64, Box<[u8]>>,
}

impl OverlayLayer {
    /// Creates an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the most recent content written to `block`, if any.
    #[inline]
    pub fn get(&self, block: u64) -> Option<&[u8]> {
        self.blocks.get(&block).map(|b| &b[..])
    }

    /// Returns `true` if `block` has been written this session.
    #[inline]
    pub fn contains(&self, block: u64) -> bool {
        self.blocks.contains_key(&block)
    }

    /// Records `data` as the content of `block`.
    ///
    /// Returns `false` if the block already held exactly `data`, in which case nothing changes.
    pub fn insert(&mut self, block: u64, data: &[u8]) -> bool {
        match self.blocks.get_mut(&block) {
            Some(existing) if **existing == *data => false,
            Some(existing) => {
                *existing = data.into();
                true
            }
            None => {
                let _ = self.blocks.insert(block, data.into());
                true
            }
        }
    }

    /// Returns the number of distinct blocks held.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the written block addresses in ascending order.
    pub fn dirty_blocks(&self) -> Vec<u64> {
        let mut blocks: Vec<u64> = self.blocks.keys().copied().collect();
        blocks.sort_unstable();
        blocks
    }

    /// Discards every captured block, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.blocks.len();
        self.blocks.clear();
        n
    }
}
