//! Read-only raw disk image.
//!
//! The backing store of a copy-on-write device: a host file opened for reading only and
//! addressed in fixed-size blocks. No write access to the file is ever requested, so any
//! number of devices may share one image concurrently.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::common::DiskError;

/// A raw image file addressed in blocks.
///
/// Trailing bytes that do not fill a whole block are not addressable.
#[derive(Debug)]
pub struct RawDiskImage {
    path: PathBuf,
    file: File,
    block_size: usize,
    num_blocks: u64,
}

impl RawDiskImage {
    /// Opens `path` read-only with the given block size.
    ///
    /// # Errors
    ///
    /// * `DiskError::InvalidBlockSize` if `block_size` is zero.
    /// * `DiskError::ImageNotFound` if the path is missing, unreadable, or not a regular file.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> Result<Self, DiskError> {
        let path = path.as_ref().to_path_buf();
        if block_size == 0 {
            return Err(DiskError::InvalidBlockSize(block_size));
        }

        let opened = File::open(&path).and_then(|file| {
            let meta = file.metadata()?;
            if meta.is_file() {
                Ok((file, meta.len()))
            } else {
                Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "not a regular file",
                ))
            }
        });
        let (file, len) = match opened {
            Ok(v) => v,
            Err(source) => return Err(DiskError::ImageNotFound { path, source }),
        };

        let num_blocks = len / block_size as u64;
        let tail = len % block_size as u64;
        if tail != 0 {
            tracing::warn!(
                path = %path.display(),
                tail,
                block_size,
                "disk image has a trailing partial block; it is not addressable"
            );
        }

        Ok(Self {
            path,
            file,
            block_size,
            num_blocks,
        })
    }

    /// Returns the host path of the image.
    pub fn path(&self) -> &Path {
        &self.path
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

    /// Checks that `block` is addressable.
    ///
    /// # Errors
    ///
    /// Returns `DiskError::OutOfRange` if `block >= num_blocks`.
    pub fn check(&self, block: u64) -> Result<(), DiskError> {
        if block < self.num_blocks {
            Ok(())
        } else {
            Err(DiskError::OutOfRange {
                block,
                num_blocks: self.num_blocks,
            })
        }
    }

    /// Reads block `block` into `buf`, which must be exactly one block long.
    ///
    /// # Errors
    ///
    /// * `DiskError::OutOfRange` for an unaddressable block.
    /// * `DiskError::BlockSize` if `buf` is not one block long.
    /// * `DiskError::Io` if the host read fails.
    pub fn read_block(&mut self, block: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        self.check(block)?;
        if buf.len() != self.block_size {
            return Err(DiskError::BlockSize {
                expected: self.block_size,
                actual: buf.len(),
            });
        }
        let _ = self
            .file
            .seek(SeekFrom::Start(block * self.block_size as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }
}
