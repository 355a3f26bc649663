//! IDE disks and controller.
//!
//! The south bridge exposes one IDE controller with two channels, each holding a master
//! and an optional slave drive. This module provides:
//! 1. **`IdeDisk`:** A drive position paired with any `BlockDevice` (normally a `CowDisk`).
//! 2. **`IdeController`:** Slot assignment, occupancy rules, and session teardown.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use super::cow::CowDisk;
use super::traits::BlockDevice;
use crate::common::{ConfigError, DiskError};
use crate::stats::DiskStats;

/// Number of IDE channels on the controller.
pub const IDE_CHANNELS: usize = 2;

/// Maximum number of drives (two per channel).
pub const MAX_IDE_DISKS: usize = IDE_CHANNELS * 2;

/// Drive position on an IDE channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveId {
    /// First drive on the channel.
    #[default]
    Master,
    /// Second drive on the channel; requires a master.
    Slave,
}

impl DriveId {
    /// Returns the lowercase position name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Slave => "slave",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Master => 0,
            Self::Slave => 1,
        }
    }
}

impl fmt::Display for DriveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A drive attached (or to be attached) to the IDE controller.
pub struct IdeDisk {
    drive: DriveId,
    device: Box<dyn BlockDevice>,
}

impl IdeDisk {
    /// Wraps an existing block device at the given drive position.
    pub fn new(drive: DriveId, device: Box<dyn BlockDevice>) -> Self {
        Self { drive, device }
    }

    /// Creates a drive backed by a copy-on-write view of the image at `path`.
    ///
    /// Writes made by the simulated system are kept in memory and dropped at exit.
    ///
    /// # Errors
    ///
    /// `DiskError::ImageNotFound` if the image cannot be opened.
    pub fn cow(path: impl AsRef<Path>, drive: DriveId, block_size: usize) -> Result<Self, DiskError> {
        let device = CowDisk::open(path, block_size)?;
        Ok(Self::new(drive, Box::new(device)))
    }

    /// Returns the drive position.
    pub const fn drive(&self) -> DriveId {
        self.drive
    }

    /// Returns the underlying device.
    pub fn device(&self) -> &dyn BlockDevice {
        self.device.as_ref()
    }

    /// Returns the underlying device mutably.
    pub fn device_mut(&mut self) -> &mut dyn BlockDevice {
        self.device.as_mut()
    }
}

impl fmt::Debug for IdeDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdeDisk")
            .field("drive", &self.drive)
            .field("device", &self.device.name())
            .field("num_blocks", &self.device.num_blocks())
            .finish()
    }
}

/// Two-channel IDE controller.
#[derive(Debug, Default)]
pub struct IdeController {
    channels: [[Option<IdeDisk>; 2]; IDE_CHANNELS],
}

impl IdeController {
    /// Creates a controller with no drives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a controller from an ordered disk list.
    ///
    /// Drives fill the first channel with a free slot in their position, so two masters
    /// land on channels 0 and 1.
    ///
    /// # Errors
    ///
    /// `ConfigError::TooManyDisks`, `ConfigError::NoFreeSlot`, or `ConfigError::OrphanSlave`.
    pub fn with_disks(disks: Vec<IdeDisk>) -> Result<Self, ConfigError> {
        if disks.len() > MAX_IDE_DISKS {
            return Err(ConfigError::TooManyDisks {
                count: disks.len(),
                max: MAX_IDE_DISKS,
            });
        }
        let mut ctrl = Self::new();
        for disk in disks {
            let _ = ctrl.attach(disk)?;
        }
        ctrl.validate()?;
        Ok(ctrl)
    }

    /// Attaches one drive, returning the `(channel, position)` it was given.
    ///
    /// # Errors
    ///
    /// `ConfigError::TooManyDisks` when the controller is full, otherwise
    /// `ConfigError::NoFreeSlot` when every channel already has a drive in that position.
    pub fn attach(&mut self, disk: IdeDisk) -> Result<(usize, DriveId), ConfigError> {
        if self.len() >= MAX_IDE_DISKS {
            return Err(ConfigError::TooManyDisks {
                count: self.len() + 1,
                max: MAX_IDE_DISKS,
            });
        }
        let drive = disk.drive;
        let slot = drive.slot();
        let Some(channel) = self.channels.iter().position(|ch| ch[slot].is_none()) else {
            return Err(ConfigError::NoFreeSlot {
                drive: drive.as_str(),
            });
        };
        tracing::debug!(channel, %drive, device = disk.device.name(), "attached IDE disk");
        self.channels[channel][slot] = Some(disk);
        Ok((channel, drive))
    }

    /// Checks that every channel with a slave also has a master.
    ///
    /// # Errors
    ///
    /// `ConfigError::OrphanSlave` naming the first offending channel.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (channel, ch) in self.channels.iter().enumerate() {
            if ch[DriveId::Slave.slot()].is_some() && ch[DriveId::Master.slot()].is_none() {
                return Err(ConfigError::OrphanSlave { channel });
            }
        }
        Ok(())
    }

    /// Returns the number of attached drives.
    pub fn len(&self) -> usize {
        self.channels.iter().flatten().flatten().count()
    }

    /// Returns `true` if no drive is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the drive at `(channel, drive)`, if present.
    pub fn disk(&self, channel: usize, drive: DriveId) -> Option<&IdeDisk> {
        self.channels.get(channel)?[drive.slot()].as_ref()
    }

    /// Returns the drive at `(channel, drive)` mutably, if present.
    pub fn disk_mut(&mut self, channel: usize, drive: DriveId) -> Option<&mut IdeDisk> {
        self.channels.get_mut(channel)?[drive.slot()].as_mut()
    }

    /// Iterates over attached drives in channel order, master before slave.
    pub fn disks(&self) -> impl Iterator<Item = (usize, &IdeDisk)> {
        self.channels
            .iter()
            .enumerate()
            .flat_map(|(i, ch)| ch.iter().flatten().map(move |d| (i, d)))
    }

    /// Iterates mutably over attached drives in channel order.
    pub fn disks_mut(&mut self) -> impl Iterator<Item = &mut IdeDisk> {
        self.channels.iter_mut().flatten().flatten()
    }

    /// Closes every drive, discarding their overlays, and returns `(name, stats)` per drive.
    pub fn close_all(&mut self) -> Vec<(String, DiskStats)> {
        self.disks_mut()
            .map(|disk| {
                disk.device.close();
                (disk.device.name().to_string(), disk.device.stats())
            })
            .collect()
    }
}
