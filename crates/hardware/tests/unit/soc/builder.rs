//! # System Bring-Up Tests
//!
//! Builds complete systems over temporary disk images and checks the bring-up order, the
//! memory layout, the port wiring, and shutdown.

use crate::common::{abcd_image, config_with_disk, config_with_disks, init_logging};
use fssim_core::common::{ByteSize, ConfigError, DiskError, SystemError};
use fssim_core::config::{CacheOverrides, CpuModel, DiskConfig, MemMode, MemoryController};
use fssim_core::core::cache::CacheLevel;
use fssim_core::disk::DriveId;
use fssim_core::soc::{PortRef, Stage, System};
use pretty_assertions::assert_eq;

#[test]
fn stages_run_in_order() {
    init_logging();
    let file = abcd_image();
    let system = System::new(&config_with_disk(file.path())).unwrap();
    assert_eq!(system.stages(), &Stage::ALL[..]);
}

#[test]
fn default_system_shape() {
    let file = abcd_image();
    let system = System::new(&config_with_disk(file.path())).unwrap();

    assert_eq!(system.clock().hz(), 3_000_000_000);
    assert_eq!(system.mem_mode(), MemMode::Atomic);
    assert_eq!(system.mem_ranges()[0].size(), 512 * ByteSize::MIB);
    assert_eq!(system.mem_ranges()[1].start(), 0xC000_0000);
    assert_eq!(system.mem_ranges()[1].size(), 0x10_0000);
    assert_eq!(
        system.boot_osflags(),
        "earlyprintk=ttyS0 console=ttyS0 lpj=7999923 root=/dev/hda1"
    );

    let ctrl = system.mem_ctrl().unwrap();
    assert_eq!(ctrl.model, MemoryController::Ddr3_1600_8x8);
    assert_eq!(ctrl.range, system.mem_ranges()[0]);

    let levels: Vec<CacheLevel> = system.caches().iter().map(|c| c.level).collect();
    assert_eq!(levels, vec![CacheLevel::L1I, CacheLevel::L1D]);
    assert_eq!(system.ide().len(), 1);
    assert_eq!(system.cpu().unwrap().interrupts().len(), 1);
    assert_eq!(system.cpu().unwrap().threads(), 1);
}

#[test]
fn wiring_is_complete() {
    let file = abcd_image();
    let system = System::new(&config_with_disk(file.path())).unwrap();
    let ports = system.ports();
    assert!(system.validate_ports().is_ok());

    let membus = PortRef::new("membus", "cpu_side_ports");
    assert_eq!(
        ports.responder_of(&PortRef::new("cpu", "icache_port")),
        Some(&PortRef::new("cpu.icache", "cpu_side"))
    );
    assert_eq!(
        ports.responder_of(&PortRef::new("cpu.dcache", "mem_side")),
        Some(&membus)
    );
    assert_eq!(
        ports.responder_of(&PortRef::new("cpu.itb.walker", "port")),
        Some(&membus)
    );
    assert_eq!(
        ports.responder_of(&PortRef::new("system", "system_port")),
        Some(&membus)
    );
    assert_eq!(
        ports.responder_of(&PortRef::new("cpu.interrupts[0]", "int_requestor")),
        Some(&membus)
    );
    assert!(ports.is_connected(&PortRef::new("cpu.interrupts[0]", "pio")));
    assert!(ports.is_connected(&PortRef::new("mem_cntrl", "port")));
    assert!(ports.is_connected(&PortRef::new("iocache", "cpu_side")));
}

#[test]
fn l2_sits_between_l1s_and_membus() {
    let file = abcd_image();
    let mut config = config_with_disk(file.path());
    config.cache.l2 = CacheOverrides {
        enabled: Some(true),
        ..CacheOverrides::default()
    };
    let system = System::new(&config).unwrap();
    let ports = system.ports();

    let l2bus = PortRef::new("l2bus", "cpu_side_ports");
    assert_eq!(
        ports.responder_of(&PortRef::new("cpu.icache", "mem_side")),
        Some(&l2bus)
    );
    assert_eq!(
        ports.responder_of(&PortRef::new("l2cache", "mem_side")),
        Some(&PortRef::new("membus", "cpu_side_ports"))
    );
    assert_eq!(system.caches().last().unwrap().level, CacheLevel::L2);
    assert!(system.validate_ports().is_ok());
}

#[test]
fn minor_cpu_selects_timing_mode() {
    let file = abcd_image();
    let mut config = config_with_disk(file.path());
    config.cpu.model = CpuModel::Minor;
    let system = System::new(&config).unwrap();
    assert_eq!(system.mem_mode(), MemMode::Timing);
    assert!(system.cpu().unwrap().fu_pool().is_some());
}

#[test]
fn missing_disk_image_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_disk(&dir.path().join("linux-x86.img"));
    let err = System::new(&config).unwrap_err();
    assert!(matches!(err, SystemError::Disk(DiskError::ImageNotFound { .. })));
}

#[test]
fn invalid_config_rejected_before_bring_up() {
    let file = abcd_image();
    let mut config = config_with_disk(file.path());
    config.system.mem_size = ByteSize(4 * ByteSize::GIB);
    let err = System::new(&config).unwrap_err();
    assert!(matches!(err, SystemError::Config(ConfigError::IoGapOverlap { .. })));
}

#[test]
fn master_and_slave_share_primary_channel() {
    let file = abcd_image();
    let config = config_with_disks(vec![
        DiskConfig::master(file.path()),
        DiskConfig {
            image: file.path().to_path_buf(),
            drive: DriveId::Slave,
            block_size: 1,
        },
    ]);
    let system = System::new(&config).unwrap();
    assert!(system.ide().disk(0, DriveId::Master).is_some());
    let slave = system.ide().disk(0, DriveId::Slave).unwrap();
    assert_eq!(slave.device().num_blocks(), 4);
}

#[test]
fn orphan_slave_rejected() {
    let file = abcd_image();
    let config = config_with_disks(vec![DiskConfig {
        image: file.path().to_path_buf(),
        drive: DriveId::Slave,
        block_size: 1,
    }]);
    let err = System::new(&config).unwrap_err();
    assert!(matches!(err, SystemError::Config(ConfigError::OrphanSlave { channel: 0 })));
}

#[test]
fn shutdown_closes_disks() {
    let file = abcd_image();
    let mut system = System::new(&config_with_disk(file.path())).unwrap();
    let stats = system.shutdown();
    assert_eq!(stats.len(), 1);
    let (_, disk) = system.ide().disks().next().unwrap();
    assert!(disk.device().is_closed());
}
