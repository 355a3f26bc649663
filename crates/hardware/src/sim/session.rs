//! Simulation session: owns the system from bring-up to shutdown.
//!
//! The session performs:
//! 1. **Setup:** Loads the optional `readfile` script and builds the system.
//! 2. **Instantiation:** Checks port wiring exactly once.
//! 3. **Disk access:** Exposes each copy-on-write device for the duration of the session.
//! 4. **Teardown:** Closes every disk and reports its activity.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::SystemError;
use crate::config::Config;
use crate::disk::{BlockDevice, IdeDisk};
use crate::soc::System;
use crate::stats::DiskStats;

/// Script the guest reads after boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    /// Host path the script was read from.
    pub path: PathBuf,
    /// Script contents.
    pub contents: String,
}

/// One simulation session.
#[derive(Debug)]
pub struct Session {
    system: System,
    script: Option<Script>,
    instantiated: bool,
}

impl Session {
    /// Loads the session script, if any, and brings up the system.
    ///
    /// # Errors
    ///
    /// `SystemError::Script` if `general.readfile` names an unreadable file, otherwise any
    /// bring-up error from [`System::new`].
    pub fn new(config: &Config) -> Result<Self, SystemError> {
        let script = config
            .general
            .readfile
            .as_deref()
            .map(load_script)
            .transpose()?;
        let system = System::new(config)?;
        tracing::info!(has_script = script.is_some(), "session created");
        Ok(Self {
            system,
            script,
            instantiated: false,
        })
    }

    /// Checks the system wiring and marks the session ready to run.
    ///
    /// # Errors
    ///
    /// `SystemError::AlreadyInstantiated` on a second call, or
    /// `SystemError::UnconnectedPort` if a required port is unwired.
    pub fn instantiate(&mut self) -> Result<(), SystemError> {
        if self.instantiated {
            return Err(SystemError::AlreadyInstantiated);
        }
        self.system.validate_ports()?;
        self.instantiated = true;
        tracing::info!(connections = self.system.ports().len(), "instantiated");
        Ok(())
    }

    /// Returns `true` once [`Session::instantiate`] has succeeded.
    pub const fn is_instantiated(&self) -> bool {
        self.instantiated
    }

    /// Returns the system.
    pub const fn system(&self) -> &System {
        &self.system
    }

    /// Returns the session script.
    pub const fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    /// Returns the number of attached disks.
    pub fn num_disks(&self) -> usize {
        self.system.ide().len()
    }

    /// Returns disk `index` (in controller order: channel, then master before slave).
    pub fn disk_mut(&mut self, index: usize) -> Option<&mut dyn BlockDevice> {
        self.system
            .ide_mut()
            .disks_mut()
            .nth(index)
            .map(IdeDisk::device_mut)
    }

    /// Ends the session, discarding every overlay.
    pub fn end(mut self) -> SessionReport {
        let disks = self.system.shutdown();
        SessionReport {
            instantiated: self.instantiated,
            disks,
        }
    }
}

fn load_script(path: &Path) -> Result<Script, SystemError> {
    let contents = fs::read_to_string(path).map_err(|source| SystemError::Script {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Script {
        path: path.to_path_buf(),
        contents,
    })
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Whether the session was instantiated before it ended.
    pub instantiated: bool,
    /// Per-disk `(name, stats)` at close.
    pub disks: Vec<(String, DiskStats)>,
}

impl SessionReport {
    /// Prints every disk's statistics block.
    pub fn print(&self) {
        for (name, stats) in &self.disks {
            stats.print(name);
        }
    }
}
