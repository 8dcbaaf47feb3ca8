//! Process-wide runtime flags, materialized from the CLI at startup and
//! refreshed once per reload cycle via [`RuntimeFlags::apply_sentinels`].
//! Threaded through the builder and the per-zone loop rather than read
//! from global state.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RuntimeFlags {
    /// When set, zone tuning-file overrides are consulted every cycle.
    pub tuning_enabled: bool,
    /// Directory holding per-zone tuning override files, one per zone id.
    pub tuning_dir: Option<PathBuf>,
    /// When set, the per-zone CSV diagnostic trace is written.
    pub logging_enabled: bool,
    /// When set, `pidcore.*`/`pidcoeffs.*` per-PID numerical logs are
    /// additionally written under `log_dir`.
    pub corelogging: bool,
    /// Directory for diagnostic output when `logging_enabled` or
    /// `corelogging` is set; also the well-known directory
    /// `apply_sentinels` checks for toggle files.
    pub log_dir: PathBuf,
    /// Extra `debug!`-level tracing in the per-tick loop.
    pub debug: bool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            tuning_enabled: false,
            tuning_dir: None,
            logging_enabled: false,
            corelogging: false,
            log_dir: PathBuf::from("/var/log/pid-control"),
            debug: false,
        }
    }
}

impl RuntimeFlags {
    /// Presence of a sentinel file in `dir` enables the matching switch
    /// without a restart: `logging`, `tuning`, `debugging`, `corelogging`.
    /// Checked once at startup and once per reload cycle, never polled.
    pub fn apply_sentinels(&mut self, dir: &Path) {
        if !dir.is_dir() {
            return;
        }
        if dir.join("logging").exists() {
            self.logging_enabled = true;
        }
        if dir.join("corelogging").exists() {
            self.corelogging = true;
        }
        if dir.join("debugging").exists() {
            self.debug = true;
        }
        if dir.join("tuning").exists() {
            self.tuning_enabled = true;
            if self.tuning_dir.is_none() {
                self.tuning_dir = Some(dir.to_path_buf());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_tuning_logging_and_corelogging() {
        let flags = RuntimeFlags::default();
        assert!(!flags.tuning_enabled);
        assert!(!flags.logging_enabled);
        assert!(!flags.corelogging);
        assert!(!flags.debug);
    }

    #[test]
    fn sentinel_files_enable_matching_flags() {
        let dir = std::env::temp_dir().join(format!("pid-control-sentinels-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("debugging"), b"").unwrap();
        std::fs::write(dir.join("corelogging"), b"").unwrap();

        let mut flags = RuntimeFlags::default();
        flags.apply_sentinels(&dir);

        assert!(flags.debug);
        assert!(flags.corelogging);
        assert!(!flags.logging_enabled);
        assert!(!flags.tuning_enabled);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn tuning_sentinel_defaults_the_directory_when_unset() {
        let dir = std::env::temp_dir().join(format!("pid-control-sentinels-tuning-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tuning"), b"").unwrap();

        let mut flags = RuntimeFlags::default();
        flags.apply_sentinels(&dir);

        assert!(flags.tuning_enabled);
        assert_eq!(flags.tuning_dir.as_deref(), Some(dir.as_path()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let mut flags = RuntimeFlags::default();
        flags.apply_sentinels(Path::new("/nonexistent/sentinel/dir"));
        assert!(!flags.logging_enabled);
    }
}
