//! Daemon lifecycle: pidfile bookkeeping and the signal handlers that turn
//! SIGTERM/SIGINT into cooperative shutdown and SIGHUP into a config reload.

use crate::error::{ControlError, ControlResult};
use std::path::{Path, PathBuf};

/// Owns an optional pidfile for the process's lifetime; removes it on drop
/// regardless of how the process exits a clean shutdown path.
pub struct Daemon {
    pidfile: Option<PathBuf>,
}

impl Daemon {
    pub fn new(pidfile: Option<PathBuf>) -> Self {
        Self { pidfile }
    }

    /// Writes the current process id to the pidfile, refusing to overwrite
    /// one left behind by a still-running instance.
    pub fn write_pid_file(&self) -> ControlResult<()> {
        let Some(path) = &self.pidfile else {
            return Ok(());
        };
        if path_has_live_content(path) {
            return Err(ControlError::Config(format!(
                "pidfile `{}` already exists; another instance may be running",
                path.display()
            )));
        }
        std::fs::write(path, std::process::id().to_string())?;
        Ok(())
    }

    pub fn remove_pid_file(&self) {
        if let Some(path) = &self.pidfile {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn path_has_live_content(path: &Path) -> bool {
    path.exists()
        && std::fs::read_to_string(path)
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.remove_pid_file();
    }
}

/// Signal-driven shutdown/reload requests, observed by `main`'s top-level
/// select loop.
pub enum SignalEvent {
    Shutdown,
    Reload,
}

/// Waits for SIGTERM, SIGINT, or SIGHUP (SIGHUP maps to `Reload`; the
/// other two to `Shutdown`). On platforms without `unix` signal support
/// this future never resolves, matching the "foreground until killed"
/// behavior of a plain `tokio::signal::ctrl_c()`-only daemon.
#[cfg(unix)]
pub async fn next_signal() -> SignalEvent {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut hup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = term.recv() => SignalEvent::Shutdown,
        _ = int.recv() => SignalEvent::Shutdown,
        _ = hup.recv() => SignalEvent::Reload,
    }
}

#[cfg(not(unix))]
pub async fn next_signal() -> SignalEvent {
    let _ = tokio::signal::ctrl_c().await;
    SignalEvent::Shutdown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pid-control-daemon-{label}-{}.pid", std::process::id()))
    }

    #[test]
    fn write_then_drop_removes_pid_file() {
        let path = temp_path("lifecycle");
        {
            let daemon = Daemon::new(Some(path.clone()));
            daemon.write_pid_file().unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn refuses_to_overwrite_a_live_pidfile() {
        let path = temp_path("collision");
        std::fs::write(&path, "12345").unwrap();
        let daemon = Daemon::new(Some(path.clone()));
        assert!(daemon.write_pid_file().is_err());
        daemon.remove_pid_file();
    }

    #[test]
    fn no_pidfile_configured_is_a_no_op() {
        let daemon = Daemon::new(None);
        assert!(daemon.write_pid_file().is_ok());
    }
}
