//! Lifecycle of the external modem process

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use tracing::{info, warn};

/// Handle to a spawned modem (e.g. a soundcard TNC exposing KISS over TCP)
///
/// Dropping the handle leaves the process running.
#[derive(Debug)]
pub struct ModemProcess {
    child: Child,
    program: PathBuf,
}

impl ModemProcess {
    /// Launch `program` with `args`
    pub fn spawn(program: &Path, args: &[String]) -> Result<Self> {
        let child = Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to start modem {:?}", program))?;

        info!("Started modem {:?} (pid {})", program, child.id());
        Ok(Self {
            child,
            program: program.to_path_buf(),
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has already finished
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the modem exits
    pub fn wait(mut self) -> Result<ExitStatus> {
        let status = self
            .child
            .wait()
            .with_context(|| format!("Failed to wait for modem {:?}", self.program))?;

        if status.success() {
            info!("Modem {:?} exited", self.program);
        } else {
            warn!("Modem {:?} exited with {}", self.program, status);
        }
        Ok(status)
    }

    /// Kill the modem and reap it
    pub fn terminate(mut self) -> Result<ExitStatus> {
        if self.try_status()?.is_none() {
            self.child
                .kill()
                .with_context(|| format!("Failed to kill modem {:?}", self.program))?;
        }
        Ok(self.child.wait()?)
    }
}
