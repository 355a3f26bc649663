//! # IDE Controller Tests

use crate::common::abcd_image;
use fssim_core::common::ConfigError;
use fssim_core::disk::{DriveId, IdeController, IdeDisk};
use tempfile::NamedTempFile;

fn disk(file: &NamedTempFile, drive: DriveId) -> IdeDisk {
    IdeDisk::cow(file.path(), drive, 1).unwrap()
}

#[test]
fn masters_fill_channels_in_order() {
    let file = abcd_image();
    let mut ctrl = IdeController::new();
    assert_eq!(ctrl.attach(disk(&file, DriveId::Master)).unwrap(), (0, DriveId::Master));
    assert_eq!(ctrl.attach(disk(&file, DriveId::Master)).unwrap(), (1, DriveId::Master));
    assert_eq!(ctrl.attach(disk(&file, DriveId::Slave)).unwrap(), (0, DriveId::Slave));
    assert_eq!(ctrl.len(), 3);
    assert!(ctrl.validate().is_ok());
}

#[test]
fn third_master_has_no_slot() {
    let file = abcd_image();
    let err = IdeController::with_disks(vec![
        disk(&file, DriveId::Master),
        disk(&file, DriveId::Master),
        disk(&file, DriveId::Master),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::NoFreeSlot { drive: "master" }));
}

#[test]
fn five_disks_rejected() {
    let file = abcd_image();
    let disks = (0..5).map(|_| disk(&file, DriveId::Master)).collect();
    let err = IdeController::with_disks(disks).unwrap_err();
    assert!(matches!(err, ConfigError::TooManyDisks { count: 5, max: 4 }));
}

#[test]
fn slave_without_master_rejected() {
    let file = abcd_image();
    let err = IdeController::with_disks(vec![disk(&file, DriveId::Slave)]).unwrap_err();
    assert!(matches!(err, ConfigError::OrphanSlave { channel: 0 }));
}

#[test]
fn full_controller_lists_disks_master_first() {
    let file = abcd_image();
    let ctrl = IdeController::with_disks(vec![
        disk(&file, DriveId::Slave),
        disk(&file, DriveId::Master),
        disk(&file, DriveId::Master),
        disk(&file, DriveId::Slave),
    ])
    .unwrap();
    let order: Vec<(usize, DriveId)> = ctrl.disks().map(|(c, d)| (c, d.drive())).collect();
    assert_eq!(
        order,
        vec![
            (0, DriveId::Master),
            (0, DriveId::Slave),
            (1, DriveId::Master),
            (1, DriveId::Slave),
        ]
    );
    assert!(ctrl.disk(1, DriveId::Slave).is_some());
    assert!(ctrl.disk(2, DriveId::Master).is_none());
}

#[test]
fn close_all_discards_overlays() {
    let file = abcd_image();
    let mut ctrl = IdeController::with_disks(vec![disk(&file, DriveId::Master)]).unwrap();
    let dev = ctrl.disk_mut(0, DriveId::Master).unwrap().device_mut();
    dev.write_block(2, b"!").unwrap();

    let stats = ctrl.close_all();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].0.starts_with("cow:"));
    assert_eq!(stats[0].1.blocks_discarded, 1);
    assert!(ctrl.disk(0, DriveId::Master).unwrap().device().is_closed());
}
