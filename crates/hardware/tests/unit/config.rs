//! # Configuration Tests
//!
//! Tests for defaults, JSON deserialization, quantity strings, and cross-field validation.

use fssim_core::common::{ByteSize, ConfigError, Frequency, Latency};
use fssim_core::config::*;
use fssim_core::core::cache::CacheLevel;
use fssim_core::disk::DriveId;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.system.clock, Frequency(3_000_000_000));
    assert_eq!(config.system.mem_size, ByteSize(512 * ByteSize::MIB));
    assert_eq!(config.system.bridge_delay, Latency(50_000));
    assert_eq!(config.cpu.model, CpuModel::AtomicSimple);
    assert_eq!(config.memory.controller, MemoryController::Ddr3_1600_8x8);
    assert_eq!(config.disks.len(), 1);
    assert_eq!(config.disks[0].drive, DriveId::Master);
    assert_eq!(config.disks[0].block_size, 512);
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_boot_flags() {
    let config = Config::default();
    assert_eq!(
        config.boot_osflags(),
        "earlyprintk=ttyS0 console=ttyS0 lpj=7999923 root=/dev/hda1"
    );
    assert_eq!(
        config.general.kernel.to_str(),
        Some("binaries/x86_64-vmlinux-2.6.22.9")
    );
}

#[test]
fn test_empty_json_is_default() {
    let config = Config::from_json("{}").unwrap();
    let default = Config::default();
    assert_eq!(config.system.mem_size, default.system.mem_size);
    assert_eq!(config.disks[0].image, default.disks[0].image);
}

#[test]
fn test_quantity_strings() {
    let config = Config::from_json(
        r#"{ "system": { "clock": "1.6GHz", "mem_size": "1GB", "bridge_delay": "20ns" } }"#,
    )
    .unwrap();
    assert_eq!(config.system.clock.hz(), 1_600_000_000);
    assert_eq!(config.system.mem_size.bytes(), ByteSize::GIB);
    assert_eq!(config.system.bridge_delay.ps(), 20_000);
}

#[test]
fn test_integer_quantities_accepted() {
    let config = Config::from_json(r#"{ "system": { "mem_size": 268435456 } }"#).unwrap();
    assert_eq!(config.system.mem_size.bytes(), 256 * ByteSize::MIB);
}

#[rstest]
#[case("AtomicSimple", CpuModel::AtomicSimple, MemMode::Atomic)]
#[case("atomic", CpuModel::AtomicSimple, MemMode::Atomic)]
#[case("Minor", CpuModel::Minor, MemMode::Timing)]
#[case("DerivO3", CpuModel::O3, MemMode::Timing)]
fn test_cpu_model_aliases(#[case] name: &str, #[case] model: CpuModel, #[case] mode: MemMode) {
    let json = format!(r#"{{ "cpu": {{ "model": "{name}" }} }}"#);
    let config = Config::from_json(&json).unwrap();
    assert_eq!(config.cpu.model, model);
    assert_eq!(config.cpu.model.mem_mode(), mode);
}

#[test]
fn test_unknown_field_rejected() {
    let err = Config::from_json(r#"{ "system": { "ram_base": 0 } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_bad_quantity_rejected() {
    let err = Config::from_json(r#"{ "system": { "clock": "fast" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_memory_above_io_gap_rejected() {
    let err = Config::from_json(r#"{ "system": { "mem_size": "4GB" } }"#).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::IoGapOverlap {
            gap_start: 0xC000_0000,
            ..
        }
    ));
}

#[test]
fn test_memory_exactly_at_io_gap_accepted() {
    assert!(Config::from_json(r#"{ "system": { "mem_size": "3GB" } }"#).is_ok());
}

#[test]
fn test_tiny_memory_rejected() {
    let err = Config::from_json(r#"{ "system": { "mem_size": "1MB" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "system.mem_size"));
}

#[test]
fn test_boot_option_with_space_rejected() {
    let err =
        Config::from_json(r#"{ "general": { "boot_options": ["console=ttyS0 root=/dev/hda1"] } }"#)
            .unwrap_err();
    assert!(
        matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "general.boot_options[0]")
    );
}

#[test]
fn test_cache_override_applied() {
    let config = Config::from_json(r#"{ "cache": { "l1_d": { "size": "32kB", "assoc": 4 } } }"#)
        .unwrap();
    let params = config.cache_params(CacheLevel::L1D);
    assert_eq!(params.size, ByteSize(32 * ByteSize::KIB));
    assert_eq!(params.assoc, 4);
    assert_eq!(params.hit_latency, 2);
}

#[test]
fn test_bad_cache_geometry_rejected() {
    let err = Config::from_json(r#"{ "cache": { "l1_i": { "size": "24kB" } } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache.cpu.icache.size"));
}

#[test]
fn test_overflowing_cache_set_rejected() {
    let json = r#"{ "cache": { "l1_i": {
        "line_size": 4611686018427387904,
        "size": 9223372036854775808,
        "assoc": 8
    } } }"#;
    let err = Config::from_json(json).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache.cpu.icache.line_size"));
}

#[test]
fn test_disabled_l2_is_not_validated() {
    assert!(Config::from_json(r#"{ "cache": { "l2": { "assoc": 0 } } }"#).is_ok());
    let err = Config::from_json(r#"{ "cache": { "l2": { "enabled": true, "assoc": 0 } } }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache.l2cache.assoc"));
}

#[test]
fn test_too_many_disks_rejected() {
    let json = r#"{ "disks": [
        { "image": "a.img" }, { "image": "b.img" }, { "image": "c.img", "drive": "slave" },
        { "image": "d.img", "drive": "slave" }, { "image": "e.img" }
    ] }"#;
    let err = Config::from_json(json).unwrap_err();
    assert!(matches!(err, ConfigError::TooManyDisks { count: 5, max: 4 }));
}

#[test]
fn test_zero_block_size_rejected() {
    let err = Config::from_json(r#"{ "disks": [ { "image": "a.img", "block_size": 0 } ] }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "disks[0].block_size"));
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(br#"{ "cpu": { "model": "Minor", "fpu_issue_latency": 2 } }"#)
        .unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.cpu.model, CpuModel::Minor);
    assert_eq!(config.cpu.fpu_issue_latency, Some(2));
}

#[test]
fn test_from_missing_file() {
    let err = Config::from_file("/nonexistent/fssim.json").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
