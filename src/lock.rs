use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Best-effort pid liveness check. False negatives are tolerable (a stale
/// lock gets overwritten at worst one restart late); false positives are not,
/// since they would wrongly refuse startup.
pub trait ProcessProbe {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probes `/proc/<pid>` where procfs exists; reports everything dead
/// elsewhere, which degrades to "stale locks are always overwritten".
pub struct ProcProbe;

impl ProcessProbe for ProcProbe {
    #[cfg(target_os = "linux")]
    fn is_alive(&self, pid: u32) -> bool {
        Path::new(&format!("/proc/{}", pid)).exists()
    }

    #[cfg(not(target_os = "linux"))]
    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

/// Advisory single-instance lock: a file holding the owning pid. Released on
/// drop so every exit path out of the run loop, panics included, cleans up.
pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    /// Refuses to acquire while the recorded pid is alive. A missing,
    /// garbled or dead-pid lock file is treated as stale and overwritten.
    pub fn acquire(path: PathBuf, probe: &dyn ProcessProbe) -> Result<Self> {
        if path.exists() {
            warn!("Lock file exists. Another instance may be running.");
            if let Some(pid) = Self::read_pid(&path) {
                if probe.is_alive(pid) {
                    anyhow::bail!("Bot is already running (pid {})", pid);
                }
            }
        }

        std::fs::write(&path, std::process::id().to_string())
            .with_context(|| format!("Cannot create lock file: {}", path.display()))?;

        Ok(Self { path })
    }

    fn read_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Released lock file"),
            Err(e) => warn!("Failed to remove lock file {}: {}", self.path.display(), e),
        }
    }
}
