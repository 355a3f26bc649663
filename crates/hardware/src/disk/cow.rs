//! Copy-on-write block device.
//!
//! Presents one writable logical disk over a read-only base image. It provides:
//! 1. **Reads:** The overlay is consulted first; a miss falls back to the base image.
//! 2. **Writes:** Always captured in the overlay; the base image is opened read-only and is
//!    never written.
//! 3. **Byte access:** `read_at`/`write_at` split sector transfers across blocks, merging
//!    partially covered blocks with their current content.
//! 4. **Teardown:** `close` discards the overlay and releases the image; the device then
//!    rejects every request with `DiskError::Closed`.
//!
//! Every range check happens before the overlay is modified, so a failed request leaves
//! the session's view of the disk exactly as it was.

use std::mem;
use std::path::{Path, PathBuf};

use super::image::RawDiskImage;
use super::overlay::OverlayLayer;
use super::traits::BlockDevice;
use crate::common::DiskError;
use crate::stats::DiskStats;

/// IDE sector size in bytes; the default block size of a disk.
pub const SECTOR_SIZE: usize = 512;

/// Backing state of an open device.
#[derive(Debug)]
enum Backing {
    Open {
        base: RawDiskImage,
        overlay: OverlayLayer,
    },
    Closed,
}

/// Composite device: a read-only base image plus a private overlay.
#[derive(Debug)]
pub struct CowDisk {
    name: String,
    path: PathBuf,
    block_size: usize,
    num_blocks: u64,
    state: Backing,
    stats: DiskStats,
}

impl CowDisk {
    /// Opens a copy-on-write view of the image at `path`.
    ///
    /// The overlay starts empty.
    ///
    /// # Errors
    ///
    /// `DiskError::ImageNotFound` if `path` is not a readable regular file, or
    /// `DiskError::InvalidBlockSize` for a zero block size.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self, DiskError> {
        let base = RawDiskImage::open(path, block_size)?;
        let path = base.path().to_path_buf();
        let name = path.file_name().map_or_else(
            || format!("cow:{}", path.display()),
            |n| format!("cow:{}", n.to_string_lossy()),
        );
        let num_blocks = base.num_blocks();

        tracing::debug!(
            path = %path.display(),
            block_size,
            num_blocks,
            "opened copy-on-write disk"
        );

        Ok(Self {
            name,
            path,
            block_size,
            num_blocks,
            state: Backing::Open {
                base,
                overlay: OverlayLayer::new(),
            },
            stats: DiskStats::default(),
        })
    }

    /// Opens a copy-on-write view addressed in 512-byte sectors.
    ///
    /// # Errors
    ///
    /// As for [`CowDisk::open`].
    pub fn with_sectors(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        Self::open(path, SECTOR_SIZE)
    }

    /// Returns the host path of the backing image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the block size in bytes.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the number of addressable blocks.
    #[inline]
    pub const fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    /// Returns `true` once the device has been closed.
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, Backing::Closed)
    }

    /// Returns the session counters.
    pub const fn stats(&self) -> &DiskStats {
        &self.stats
    }

    /// Returns the blocks written this session, ascending. Empty once closed.
    pub fn dirty_blocks(&self) -> Vec<u64> {
        match &self.state {
            Backing::Open { overlay, .. } => overlay.dirty_blocks(),
            Backing::Closed => Vec::new(),
        }
    }

    /// Reads block `block`, returning the most recent write or else the base content.
    ///
    /// # Errors
    ///
    /// `DiskError::Closed`, `DiskError::OutOfRange`, or `DiskError::Io`.
    pub fn read(&mut self, block: u64) -> Result<Vec<u8>, DiskError> {
        let mut buf = vec![0; self.block_size];
        self.read_into(block, &mut buf)?;
        Ok(buf)
    }

    /// Reads block `block` into `buf`, which must be exactly one block long.
    ///
    /// # Errors
    ///
    /// `DiskError::Closed`, `DiskError::OutOfRange`, `DiskError::BlockSize`, or `DiskError::Io`.
    pub fn read_into(&mut self, block: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        let Backing::Open { base, overlay } = &mut self.state else {
            return Err(DiskError::Closed);
        };
        base.check(block)?;
        if buf.len() != self.block_size {
            return Err(DiskError::BlockSize {
                expected: self.block_size,
                actual: buf.len(),
            });
        }

        if let Some(data) = overlay.get(block) {
            buf.copy_from_slice(data);
            self.stats.reads_overlay += 1;
            tracing::trace!(block, "read from overlay");
        } else {
            base.read_block(block, buf)?;
            self.stats.reads_base += 1;
            tracing::trace!(block, "read from base image");
        }
        Ok(())
    }

    /// Captures one block of `data` at `block` in the overlay.
    ///
    /// Rewriting identical content leaves the observable state unchanged.
    ///
    /// # Errors
    ///
    /// `DiskError::Closed`, `DiskError::OutOfRange`, or `DiskError::BlockSize`.
    pub fn write(&mut self, block: u64, data: &[u8]) -> Result<(), DiskError> {
        let Backing::Open { base, overlay } = &mut self.state else {
            return Err(DiskError::Closed);
        };
        base.check(block)?;
        if data.len() != self.block_size {
            return Err(DiskError::BlockSize {
                expected: self.block_size,
                actual: data.len(),
            });
        }

        let changed = overlay.insert(block, data);
        self.stats.writes += 1;
        if !changed {
            self.stats.writes_unchanged += 1;
        }
        self.stats.dirty_blocks = overlay.len() as u64;
        tracing::trace!(block, changed, "write captured in overlay");
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// `DiskError::Closed`, `DiskError::OutOfRange` if any byte lies past the last block,
    /// or `DiskError::Io`.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        let Some((first, last)) = self.block_span(offset, buf.len())? else {
            return Ok(());
        };

        let mut scratch = vec![0; self.block_size];
        let mut done = 0;
        for block in first..=last {
            self.read_into(block, &mut scratch)?;
            let from = if block == first {
                (offset - block * self.block_size as u64) as usize
            } else {
                0
            };
            let n = (self.block_size - from).min(buf.len() - done);
            buf[done..done + n].copy_from_slice(&scratch[from..from + n]);
            done += n;
        }
        Ok(())
    }

    /// Writes `data` starting at byte `offset`.
    ///
    /// Partially covered blocks are merged with their current content. All affected blocks
    /// are staged first, so an error leaves the overlay untouched.
    ///
    /// # Errors
    ///
    /// `DiskError::Closed`, `DiskError::OutOfRange` if any byte lies past the last block,
    /// or `DiskError::Io` while fetching a partially covered block.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), DiskError> {
        let Some((first, last)) = self.block_span(offset, data.len())? else {
            return Ok(());
        };

        let mut staged = Vec::with_capacity((last - first + 1) as usize);
        let mut done = 0;
        for block in first..=last {
            let from = if block == first {
                (offset - block * self.block_size as u64) as usize
            } else {
                0
            };
            let n = (self.block_size - from).min(data.len() - done);
            let content = if n == self.block_size {
                data[done..done + n].to_vec()
            } else {
                let mut current = self.peek(block)?;
                current[from..from + n].copy_from_slice(&data[done..done + n]);
                current
            };
            staged.push((block, content));
            done += n;
        }

        for (block, content) in staged {
            self.write(block, &content)?;
        }
        Ok(())
    }

    /// Discards the overlay and releases the base image.
    ///
    /// Always succeeds; the backing file is left exactly as it was before the session.
    pub fn close(&mut self) {
        if let Backing::Open { mut overlay, .. } = mem::replace(&mut self.state, Backing::Closed) {
            let discarded = overlay.clear();
            self.stats.blocks_discarded = discarded as u64;
            self.stats.dirty_blocks = 0;
            tracing::debug!(
                path = %self.path.display(),
                discarded,
                "closed copy-on-write disk"
            );
        }
    }

    /// Returns the current content of `block` without counting it as a read.
    fn peek(&mut self, block: u64) -> Result<Vec<u8>, DiskError> {
        let Backing::Open { base, overlay } = &mut self.state else {
            return Err(DiskError::Closed);
        };
        if let Some(data) = overlay.get(block) {
            return Ok(data.to_vec());
        }
        let mut buf = vec![0; self.block_size];
        base.read_block(block, &mut buf)?;
        Ok(buf)
    }

    /// Maps a byte span onto `(first_block, last_block)`, or `None` for an empty span.
    fn block_span(&self, offset: u64, len: usize) -> Result<Option<(u64, u64)>, DiskError> {
        if self.is_closed() {
            return Err(DiskError::Closed);
        }
        if len == 0 {
            return Ok(None);
        }

        let bs = self.block_size as u64;
        let capacity = self.num_blocks * bs;
        let first = offset / bs;
        match offset.checked_add(len as u64) {
            Some(end) if end <= capacity => Ok(Some((first, (end - 1) / bs))),
            _ => Err(DiskError::OutOfRange {
                block: first.max(self.num_blocks),
                num_blocks: self.num_blocks,
            }),
        }
    }
}

impl BlockDevice for CowDisk {
    fn name(&self) -> &str {
        Self::name(self)
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> u64 {
        self.num_blocks
    }

    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        self.read_into(block, buf)
    }

    fn write_block(&mut self, block: u64, data: &[u8]) -> Result<(), DiskError> {
        self.write(block, data)
    }

    fn close(&mut self) {
        Self::close(self);
    }

    fn is_closed(&self) -> bool {
        Self::is_closed(self)
    }

    fn stats(&self) -> DiskStats {
        self.stats.clone()
    }
}
