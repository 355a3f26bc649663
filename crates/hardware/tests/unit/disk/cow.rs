//! # Copy-on-Write Device Tests
//!
//! Verifies that reads observe the session's own writes, that the base image is never
//! modified, and that closing a device discards its overlay.

use std::sync::mpsc;
use std::thread;

use crate::common::{abcd_image, file_bytes, init_logging, patterned_image};
use fssim_core::common::DiskError;
use fssim_core::disk::{BlockDevice, CowDisk, SECTOR_SIZE};
use pretty_assertions::assert_eq;

#[test]
fn write_visible_in_session_and_gone_after_close() {
    init_logging();
    let file = abcd_image();

    let mut disk = CowDisk::open(file.path(), 1).unwrap();
    disk.write(1, b"X").unwrap();
    assert_eq!(disk.read(1).unwrap(), b"X");
    assert_eq!(disk.read(0).unwrap(), b"A");
    disk.close();

    let mut fresh = CowDisk::open(file.path(), 1).unwrap();
    assert_eq!(fresh.read(1).unwrap(), b"B");
    assert_eq!(file_bytes(file.path()), b"ABCD");
}

#[test]
fn unwritten_blocks_come_from_base() {
    let file = patterned_image(4, SECTOR_SIZE);
    let mut disk = CowDisk::with_sectors(file.path()).unwrap();
    for block in 0..4 {
        assert_eq!(disk.read(block).unwrap(), vec![block as u8; SECTOR_SIZE]);
    }
    assert_eq!(disk.stats().reads_base, 4);
    assert_eq!(disk.stats().reads_overlay, 0);
}

#[test]
fn last_write_wins() {
    let file = abcd_image();
    let mut disk = CowDisk::open(file.path(), 1).unwrap();
    disk.write(2, b"1").unwrap();
    disk.write(2, b"2").unwrap();
    assert_eq!(disk.read(2).unwrap(), b"2");
    assert_eq!(disk.dirty_blocks(), vec![2]);
}

#[test]
fn repeated_write_is_idempotent() {
    let file = abcd_image();
    let mut disk = CowDisk::open(file.path(), 1).unwrap();
    disk.write(3, b"Q").unwrap();
    disk.write(3, b"Q").unwrap();
    assert_eq!(disk.read(3).unwrap(), b"Q");
    assert_eq!(disk.stats().writes, 2);
    assert_eq!(disk.stats().writes_unchanged, 1);
    assert_eq!(disk.stats().dirty_blocks, 1);
}

#[test]
fn base_image_bytes_unchanged_during_session() {
    let file = patterned_image(4, 64);
    let before = file_bytes(file.path());
    let mut disk = CowDisk::open(file.path(), 64).unwrap();
    for block in 0..4 {
        disk.write(block, &[0xEE; 64]).unwrap();
    }
    assert_eq!(file_bytes(file.path()), before);
    disk.close();
    assert_eq!(file_bytes(file.path()), before);
}

#[test]
fn out_of_range_leaves_overlay_untouched() {
    let file = abcd_image();
    let mut disk = CowDisk::open(file.path(), 1).unwrap();
    disk.write(0, b"Z").unwrap();

    let err = disk.write(4, b"Y").unwrap_err();
    assert!(matches!(
        err,
        DiskError::OutOfRange {
            block: 4,
            num_blocks: 4
        }
    ));
    assert!(matches!(disk.read(4), Err(DiskError::OutOfRange { .. })));
    assert_eq!(disk.dirty_blocks(), vec![0]);
    assert_eq!(disk.read(0).unwrap(), b"Z");
}

#[test]
fn wrong_payload_length_rejected() {
    let file = patterned_image(2, 8);
    let mut disk = CowDisk::open(file.path(), 8).unwrap();
    let err = disk.write(0, &[1, 2, 3]).unwrap_err();
    assert!(matches!(
        err,
        DiskError::BlockSize {
            expected: 8,
            actual: 3
        }
    ));
    assert!(disk.dirty_blocks().is_empty());
}

#[test]
fn closed_device_rejects_everything() {
    let file = abcd_image();
    let mut disk = CowDisk::open(file.path(), 1).unwrap();
    disk.write(1, b"X").unwrap();
    disk.close();
    disk.close();

    assert!(disk.is_closed());
    assert!(matches!(disk.read(1), Err(DiskError::Closed)));
    assert!(matches!(disk.write(1, b"X"), Err(DiskError::Closed)));
    let mut buf = [0u8; 2];
    assert!(matches!(disk.read_at(0, &mut buf), Err(DiskError::Closed)));
    assert!(disk.dirty_blocks().is_empty());
    assert_eq!(disk.stats().blocks_discarded, 1);
}

#[test]
fn missing_image_fails_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let err = CowDisk::with_sectors(dir.path().join("nope.img")).unwrap_err();
    assert!(matches!(err, DiskError::ImageNotFound { .. }));
}

#[test]
fn name_uses_file_name() {
    let file = abcd_image();
    let disk = CowDisk::open(file.path(), 1).unwrap();
    let expected = format!(
        "cow:{}",
        file.path().file_name().unwrap().to_string_lossy()
    );
    assert_eq!(disk.name(), expected);
}

#[test]
fn byte_access_spans_blocks() {
    let file = patterned_image(4, 4);
    let mut disk = CowDisk::open(file.path(), 4).unwrap();

    disk.write_at(3, &[9, 9, 9]).unwrap();
    assert_eq!(disk.read(0).unwrap(), vec![0, 0, 0, 9]);
    assert_eq!(disk.read(1).unwrap(), vec![9, 9, 1, 1]);

    let mut buf = [0u8; 6];
    disk.read_at(2, &mut buf).unwrap();
    assert_eq!(buf, [0, 9, 9, 9, 1, 1]);
}

#[test]
fn byte_access_past_end_is_atomic() {
    let file = patterned_image(2, 4);
    let mut disk = CowDisk::open(file.path(), 4).unwrap();
    let err = disk.write_at(6, &[7; 4]).unwrap_err();
    assert!(matches!(err, DiskError::OutOfRange { num_blocks: 2, .. }));
    assert!(disk.dirty_blocks().is_empty());

    let mut empty = [0u8; 0];
    disk.read_at(8, &mut empty).unwrap();
}

#[test]
fn trait_object_dispatch() {
    let file = abcd_image();
    let mut device: Box<dyn BlockDevice> = Box::new(CowDisk::open(file.path(), 1).unwrap());
    assert_eq!(device.num_blocks(), 4);
    assert_eq!(device.capacity_bytes(), 4);

    device.write_block(0, b"x").unwrap();
    let mut buf = [0u8; 1];
    device.read_block(0, &mut buf).unwrap();
    assert_eq!(&buf, b"x");
    assert_eq!(device.stats().writes, 1);

    device.close();
    assert!(device.is_closed());
    assert!(matches!(device.read_block(0, &mut buf), Err(DiskError::Closed)));
}

#[test]
fn overlays_are_private_per_device() {
    let file = abcd_image();
    let mut a = CowDisk::open(file.path(), 1).unwrap();
    let mut b = CowDisk::open(file.path(), 1).unwrap();

    a.write(0, b"a").unwrap();
    assert_eq!(b.read(0).unwrap(), b"A");
    b.write(0, b"b").unwrap();
    assert_eq!(a.read(0).unwrap(), b"a");
    assert_eq!(b.read(0).unwrap(), b"b");
}

#[test]
fn concurrent_devices_over_one_image() {
    let file = patterned_image(16, 32);
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0u8..2)
        .map(|id| {
            let path = file.path().to_path_buf();
            let tx = tx.clone();
            thread::spawn(move || {
                let mut disk = CowDisk::open(&path, 32).unwrap();
                for block in 0..16 {
                    disk.write(block, &[0x80 | id; 32]).unwrap();
                }
                let seen: Vec<u8> = (0..16).map(|b| disk.read(b).unwrap()[0]).collect();
                tx.send((id, seen)).unwrap();
                disk.close();
            })
        })
        .collect();
    drop(tx);
    for h in handles {
        h.join().unwrap();
    }

    for (id, seen) in rx {
        assert!(seen.iter().all(|&b| b == 0x80 | id));
    }
    let mut fresh = CowDisk::open(file.path(), 32).unwrap();
    assert_eq!(fresh.read(7).unwrap(), vec![7; 32]);
}
