//! Full-system simulation setup CLI.
//!
//! This binary is the entry point for inspecting and exercising a configured system. It performs:
//! 1. **Show:** Validate a configuration and print the resulting system description.
//! 2. **Run:** Bring up a session, instantiate it, end it, and print disk statistics.
//! 3. **Disk:** Read or write one block through a copy-on-write view of an image.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use fssim_core::config::{Config, DiskConfig};
use fssim_core::disk::{CowDisk, SECTOR_SIZE};
use fssim_core::sim::Session;
use fssim_core::soc::System;

#[derive(Parser, Debug)]
#[command(
    name = "fssim",
    author,
    version,
    about = "Full-system x86 simulation setup with copy-on-write disks",
    long_about = "Validate a system configuration, bring up a session, or poke at a disk image through a copy-on-write view.\n\nConfiguration is JSON; without --config the built-in defaults are used.\n\nExamples:\n  fssim show --config system.json\n  fssim run --disk disks/linux-x86.img --script run.rcS\n  fssim disk read --image disks/linux-x86.img --block 0\n  fssim disk write --image disks/linux-x86.img --block 1 --byte 0x58"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration and print the system it describes.
    Show {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Bring up a session, instantiate it, and end it.
    Run {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Root disk image; replaces the configured disk list.
        #[arg(long)]
        disk: Option<PathBuf>,

        /// Script for the guest to read after boot.
        #[arg(long)]
        script: Option<PathBuf>,
    },

    /// Access one block of an image through a copy-on-write view.
    #[command(subcommand)]
    Disk(DiskCommand),
}

#[derive(Subcommand, Debug)]
enum DiskCommand {
    /// Hex-dump one block.
    Read(BlockArgs),

    /// Fill one block with a byte, read it back, and show the image is unchanged after close.
    Write {
        #[command(flatten)]
        target: BlockArgs,

        /// Fill byte (decimal or 0x-prefixed hex).
        #[arg(long, value_parser = parse_byte)]
        byte: u8,
    },
}

#[derive(Args, Debug)]
struct BlockArgs {
    /// Disk image file.
    #[arg(long)]
    image: PathBuf,

    /// Block address.
    #[arg(long)]
    block: u64,

    /// Block size in bytes.
    #[arg(long, default_value_t = SECTOR_SIZE)]
    block_size: usize,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Show { config } => cmd_show(&load_config(config)),
        Commands::Run {
            config,
            disk,
            script,
        } => {
            let mut config = load_config(config);
            if let Some(image) = disk {
                config.disks = vec![DiskConfig::master(image)];
            }
            if script.is_some() {
                config.general.readfile = script;
            }
            cmd_run(&config);
        }
        Commands::Disk(DiskCommand::Read(target)) => cmd_disk_read(&target),
        Commands::Disk(DiskCommand::Write { target, byte }) => cmd_disk_write(&target, byte),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_byte(text: &str) -> Result<u8, String> {
    let parsed = text.strip_prefix("0x").map_or_else(
        || text.parse::<u8>(),
        |hex| u8::from_str_radix(hex, 16),
    );
    parsed.map_err(|e| format!("invalid byte {text:?}: {e}"))
}

/// Loads and validates the configuration, or the defaults when no path is given.
///
/// Exits the process with code 1 on a read, parse, or validation error.
fn load_config(path: Option<PathBuf>) -> Config {
    let result = match path {
        Some(path) => Config::from_file(&path),
        None => {
            let config = Config::default();
            config.validate().map(|()| config)
        }
    };
    result.unwrap_or_else(|e| fail(&e))
}

fn fail(err: &dyn std::error::Error) -> ! {
    eprintln!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    process::exit(1);
}

/// Brings up the system and prints its description. Disks are opened, so images must exist.
fn cmd_show(config: &Config) {
    let mut system = System::new(config).unwrap_or_else(|e| fail(&e));

    println!("Stages:");
    for (i, stage) in system.stages().iter().enumerate() {
        println!("  {:>2}. {stage}", i + 1);
    }
    println!();
    println!(
        "Clock: {}  Voltage: {}V  Memory mode: {}",
        system.clock(),
        system.voltage(),
        system.mem_mode().as_str()
    );
    println!("Kernel: {}", system.kernel().display());
    println!("Boot flags: {}", system.boot_osflags());
    println!();

    println!("Memory ranges:");
    for range in system.mem_ranges() {
        println!("  {range}");
    }
    if let Some(ctrl) = system.mem_ctrl() {
        println!("Memory controller: {} on {}", ctrl.model.as_str(), ctrl.range);
    }
    println!();

    if let Some(cpu) = system.cpu() {
        println!("CPU: {}", cpu.model().as_str());
        if let Some(pool) = cpu.fu_pool() {
            for unit in pool.units() {
                println!(
                    "  fu {:?}: op_lat={} issue_lat={}",
                    unit.kind, unit.op_lat, unit.issue_lat
                );
            }
        }
    }
    println!("Caches:");
    let io_cache = system.platform().map(|p| p.io_cache);
    for cache in system.caches().iter().chain(io_cache.iter()) {
        println!(
            "  {:<12} {:>8} assoc={} hit={} resp={} mshrs={} tgts={}",
            cache.level.name(),
            cache.size.to_string(),
            cache.assoc,
            cache.hit_latency,
            cache.response_latency,
            cache.mshrs,
            cache.tgts_per_mshr
        );
    }
    println!();

    if let Some(platform) = system.platform() {
        for bridge in [&platform.bridge, &platform.apic_bridge] {
            println!("Bridge {} ({}):", bridge.name, bridge.delay);
            for range in &bridge.ranges {
                println!("  {range}");
            }
        }
        println!("E820:");
        for entry in &platform.e820 {
            println!("  {entry}");
        }
        println!();
    }

    println!("Disks:");
    for (channel, disk) in system.ide().disks() {
        println!(
            "  ide{channel} {:<6} {} ({} blocks of {}B)",
            disk.drive(),
            disk.device().name(),
            disk.device().num_blocks(),
            disk.device().block_size()
        );
    }
    let _ = system.shutdown();
}

/// Runs one session end to end and prints its disk statistics.
fn cmd_run(config: &Config) {
    let mut session = Session::new(config).unwrap_or_else(|e| fail(&e));
    if let Some(script) = session.script() {
        println!(
            "[*] Script {} ({} bytes)",
            script.path.display(),
            script.contents.len()
        );
    }
    if let Err(e) = session.instantiate() {
        fail(&e);
    }
    println!(
        "[*] Instantiated: {} connections, {} disk(s)",
        session.system().ports().len(),
        session.num_disks()
    );
    let report = session.end();
    report.print();
}

fn open_disk(target: &BlockArgs) -> CowDisk {
    CowDisk::open(&target.image, target.block_size).unwrap_or_else(|e| fail(&e))
}

fn cmd_disk_read(target: &BlockArgs) {
    let mut disk = open_disk(target);
    let data = disk.read(target.block).unwrap_or_else(|e| fail(&e));
    hexdump(target.block * target.block_size as u64, &data);
    disk.close();
}

fn cmd_disk_write(target: &BlockArgs, byte: u8) {
    let mut disk = open_disk(target);
    let before = disk.read(target.block).unwrap_or_else(|e| fail(&e));

    let fill = vec![byte; target.block_size];
    if let Err(e) = disk.write(target.block, &fill) {
        fail(&e);
    }
    let during = disk.read(target.block).unwrap_or_else(|e| fail(&e));
    println!(
        "[*] Block {} in session: {}",
        target.block,
        if during == fill { "updated" } else { "NOT updated" }
    );
    disk.stats().print(disk.name());
    disk.close();

    let mut reopened = open_disk(target);
    let after = reopened.read(target.block).unwrap_or_else(|e| fail(&e));
    println!(
        "[*] Block {} after close: {}",
        target.block,
        if after == before { "unchanged" } else { "CHANGED" }
    );
    reopened.close();
    if after != before {
        process::exit(1);
    }
}

fn hexdump(base: u64, data: &[u8]) {
    for (i, row) in data.chunks(16).enumerate() {
        let hex: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = row
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:010x}  {:<47}  |{ascii}|", base + (i * 16) as u64, hex.join(" "));
    }
}
