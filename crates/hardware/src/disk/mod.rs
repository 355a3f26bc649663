//! Disk images and block devices.
//!
//! This module organizes the storage side of the simulated platform: read-only base images,
//! the per-session overlay that captures writes, the copy-on-write device combining them,
//! and the IDE controller that hosts the drives.

/// Copy-on-write composite device.
pub mod cow;

/// IDE drives and controller.
pub mod ide;

/// Read-only raw image files.
pub mod image;

/// Per-session write overlay.
pub mod overlay;

/// Block device trait definitions.
pub mod traits;

pub use cow::{CowDisk, SECTOR_SIZE};
pub use ide::{DriveId, IdeController, IdeDisk};
pub use image::RawDiskImage;
pub use overlay::OverlayLayer;
pub use traits::BlockDevice;
