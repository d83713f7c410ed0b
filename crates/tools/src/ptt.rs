//! Push-to-talk signalling around transmissions

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An output line asserted while a packet is on the air
pub trait PttLine {
    fn key(&mut self) -> Result<()>;
    fn unkey(&mut self) -> Result<()>;
}

impl<P: PttLine + ?Sized> PttLine for Box<P> {
    fn key(&mut self) -> Result<()> {
        (**self).key()
    }

    fn unkey(&mut self) -> Result<()> {
        (**self).unkey()
    }
}

/// PTT for hosts without a keying line
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPtt;

impl PttLine for NoPtt {
    fn key(&mut self) -> Result<()> {
        Ok(())
    }

    fn unkey(&mut self) -> Result<()> {
        Ok(())
    }
}

/// GPIO output through the sysfs interface
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    pin: u32,
    exported: bool,
}

impl SysfsGpio {
    /// Export `pin` under `root` if needed and make it a low output
    pub fn open(root: impl Into<PathBuf>, pin: u32) -> Result<Self> {
        let root = root.into();
        let mut gpio = Self {
            root,
            pin,
            exported: false,
        };

        if !gpio.pin_dir().exists() {
            write_attr(&gpio.root.join("export"), &pin.to_string())?;
            gpio.exported = true;
            debug!("Exported GPIO {}", pin);
        }

        write_attr(&gpio.pin_dir().join("direction"), "out")?;
        gpio.unkey()?;

        Ok(gpio)
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    fn set(&mut self, high: bool) -> Result<()> {
        write_attr(&self.pin_dir().join("value"), if high { "1" } else { "0" })
    }
}

impl PttLine for SysfsGpio {
    fn key(&mut self) -> Result<()> {
        self.set(true)?;
        info!("PTT on (GPIO {})", self.pin);
        Ok(())
    }

    fn unkey(&mut self) -> Result<()> {
        self.set(false)?;
        debug!("PTT off (GPIO {})", self.pin);
        Ok(())
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        if let Err(e) = self.set(false) {
            warn!("Failed to drive GPIO {} low: {}", self.pin, e);
        }
        if self.exported {
            if let Err(e) = write_attr(&self.root.join("unexport"), &self.pin.to_string()) {
                warn!("Failed to unexport GPIO {}: {}", self.pin, e);
            }
        }
    }
}

fn write_attr(path: &Path, value: &str) -> Result<()> {
    fs::write(path, value).with_context(|| format!("Failed to write {:?} to {:?}", value, path))
}

/// Keys a line on creation and unkeys it when dropped
pub struct PttGuard<'a, P: PttLine + ?Sized> {
    line: &'a mut P,
}

impl<'a, P: PttLine + ?Sized> PttGuard<'a, P> {
    pub fn new(line: &'a mut P) -> Result<Self> {
        line.key()?;
        Ok(Self { line })
    }
}

impl<P: PttLine + ?Sized> Drop for PttGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.line.unkey() {
            warn!("Failed to release PTT: {}", e);
        }
    }
}
