//! # Copy-on-Write Properties
//!
//! Random operation sequences are replayed against both a `CowDisk` and a flat in-memory
//! model of the disk. Every read must match the model, out-of-range requests must change
//! nothing, and the image file must come out of the session byte-for-byte identical.

use crate::common::{file_bytes, patterned_image};
use fssim_core::common::DiskError;
use fssim_core::disk::CowDisk;
use proptest::prelude::*;

const BLOCK: usize = 8;
const BLOCKS: u64 = 6;

#[derive(Debug, Clone)]
enum Op {
    Write { block: u64, fill: u8 },
    Read { block: u64 },
    WriteAt { offset: u64, data: Vec<u8> },
    ReadAt { offset: u64, len: usize },
}

fn op() -> impl Strategy<Value = Op> {
    // Addresses run one block past the end so the out-of-range path is exercised.
    let span = (BLOCKS + 1) * BLOCK as u64;
    prop_oneof![
        (0..=BLOCKS, any::<u8>()).prop_map(|(block, fill)| Op::Write { block, fill }),
        (0..=BLOCKS).prop_map(|block| Op::Read { block }),
        (0..span, prop::collection::vec(any::<u8>(), 0..20))
            .prop_map(|(offset, data)| Op::WriteAt { offset, data }),
        (0..span, 0usize..20).prop_map(|(offset, len)| Op::ReadAt { offset, len }),
    ]
}

fn in_range(offset: u64, len: usize) -> bool {
    offset + len as u64 <= BLOCKS * BLOCK as u64
}

proptest! {
    #[test]
    fn matches_flat_model(ops in prop::collection::vec(op(), 1..40)) {
        let file = patterned_image(BLOCKS as usize, BLOCK);
        let original = file_bytes(file.path());
        let mut model = original.clone();
        let mut disk = CowDisk::open(file.path(), BLOCK).unwrap();

        for op in ops {
            match op {
                Op::Write { block, fill } => {
                    let result = disk.write(block, &[fill; BLOCK]);
                    if block < BLOCKS {
                        prop_assert!(result.is_ok());
                        let at = block as usize * BLOCK;
                        model[at..at + BLOCK].fill(fill);
                    } else {
                        prop_assert!(matches!(result, Err(DiskError::OutOfRange { .. })), "expected OutOfRange");
                    }
                }
                Op::Read { block } => {
                    let result = disk.read(block);
                    if block < BLOCKS {
                        let at = block as usize * BLOCK;
                        prop_assert_eq!(result.unwrap(), model[at..at + BLOCK].to_vec());
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                Op::WriteAt { offset, data } => {
                    let result = disk.write_at(offset, &data);
                    if data.is_empty() || in_range(offset, data.len()) {
                        prop_assert!(result.is_ok());
                        let at = offset as usize;
                        if !data.is_empty() {
                            model[at..at + data.len()].copy_from_slice(&data);
                        }
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
                Op::ReadAt { offset, len } => {
                    let mut buf = vec![0u8; len];
                    let result = disk.read_at(offset, &mut buf);
                    if len == 0 || in_range(offset, len) {
                        prop_assert!(result.is_ok());
                        let at = offset as usize;
                        if len > 0 {
                            prop_assert_eq!(&buf[..], &model[at..at + len]);
                        }
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }
        }

        prop_assert_eq!(file_bytes(file.path()), original.clone());
        disk.close();

        let mut fresh = CowDisk::open(file.path(), BLOCK).unwrap();
        for block in 0..BLOCKS {
            let at = block as usize * BLOCK;
            prop_assert_eq!(fresh.read(block).unwrap(), original[at..at + BLOCK].to_vec());
        }
    }

    #[test]
    fn rewriting_same_content_is_unobservable(block in 0..BLOCKS, fill in any::<u8>(), times in 1usize..5) {
        let file = patterned_image(BLOCKS as usize, BLOCK);
        let mut disk = CowDisk::open(file.path(), BLOCK).unwrap();
        for _ in 0..times {
            disk.write(block, &[fill; BLOCK]).unwrap();
        }
        prop_assert_eq!(disk.read(block).unwrap(), vec![fill; BLOCK]);
        prop_assert_eq!(disk.dirty_blocks(), vec![block]);
        prop_assert_eq!(disk.stats().writes_unchanged, times as u64 - 1);
    }
}
