//! Linux sysfs GPIO lines (`/sys/class/gpio`).
//!
//! Implements the `embedded-hal` digital traits on top of the legacy
//! sysfs interface, which is available on every Raspberry Pi class board
//! without extra services.  Each pin is exported on open and its
//! direction set; values are read and written as `"0"` / `"1"` text.
//!
//! ## Dual-target design
//!
//! The sysfs root is a parameter so tests can point it at a scratch
//! directory laid out like `/sys/class/gpio`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use log::debug;

use crate::config::PinId;
use crate::error::HardwareError;

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Attempts to wait for udev to publish a freshly exported line.
const EXPORT_POLLS: u32 = 20;
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// I/O failure on a sysfs line.
#[derive(Debug)]
pub struct SysfsError {
    pub line: u32,
    pub source: io::Error,
}

impl digital::Error for SysfsError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct SysfsPin {
    line: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    /// Export `pin` and configure it as an input.
    pub fn input(root: &Path, pin: &PinId) -> Result<Self, HardwareError> {
        Self::open(root, pin, "in")
    }

    /// Export `pin` and configure it as an output, initially low.
    pub fn output(root: &Path, pin: &PinId) -> Result<Self, HardwareError> {
        // "low" sets direction and level in one write, without a glitch.
        Self::open(root, pin, "low")
    }

    fn open(root: &Path, pin: &PinId, direction: &str) -> Result<Self, HardwareError> {
        let setup_err = |reason: String| HardwareError::Setup {
            pin: pin.to_string(),
            reason,
        };
        let line = pin
            .line()
            .ok_or_else(|| setup_err("not a GPIO line number".into()))?;

        let dir = root.join(format!("gpio{line}"));
        if !dir.exists() {
            fs::write(root.join("export"), line.to_string())
                .map_err(|e| setup_err(format!("export: {e}")))?;
            let mut polls = 0;
            while !dir.exists() {
                polls += 1;
                if polls > EXPORT_POLLS {
                    return Err(setup_err(format!("{} did not appear", dir.display())));
                }
                thread::sleep(EXPORT_POLL_INTERVAL);
            }
        }

        fs::write(dir.join("direction"), direction)
            .map_err(|e| setup_err(format!("direction: {e}")))?;
        debug!("sysfs: gpio{line} configured as {direction}");

        Ok(Self {
            line,
            value_path: dir.join("value"),
        })
    }

    fn read(&self) -> Result<bool, SysfsError> {
        let text = fs::read_to_string(&self.value_path).map_err(|source| SysfsError {
            line: self.line,
            source,
        })?;
        match text.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(SysfsError {
                line: self.line,
                source: io::Error::new(io::ErrorKind::InvalidData, format!("value {other:?}")),
            }),
        }
    }

    fn write(&mut self, high: bool) -> Result<(), SysfsError> {
        fs::write(&self.value_path, if high { "1" } else { "0" }).map_err(|source| SysfsError {
            line: self.line,
            source,
        })
    }
}

impl ErrorType for SysfsPin {
    type Error = SysfsError;
}

impl InputPin for SysfsPin {
    fn is_high(&mut self) -> Result<bool, SysfsError> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool, SysfsError> {
        self.read().map(|v| !v)
    }
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), SysfsError> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), SysfsError> {
        self.write(true)
    }
}
