//! Filesystem reader/writer: parses an integer from a sysfs-style path on
//! every poll, and writes raw or percentage-scaled integers back out.

use super::RawSample;
use crate::error::{ControlError, ControlResult};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct FsReader {
    path: PathBuf,
}

impl FsReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn poll(&mut self) -> ControlResult<(RawSample, Instant)> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| ControlError::Transport {
            sensor: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let value: i64 = content.trim().parse().map_err(|_| ControlError::Transport {
            sensor: self.path.display().to_string(),
            reason: format!("non-integer content: {content:?}"),
        })?;
        let value = value as f64;
        Ok((
            RawSample {
                value,
                unscaled: value,
            },
            Instant::now(),
        ))
    }
}

/// Whether a filesystem writer emits the fraction verbatim (scaled to an
/// integer) or linearly maps `[0,1]` into `[min,max]` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsWriteMode {
    Raw,
    Percent { min: i64, max: i64 },
}

pub struct FsWriter {
    path: PathBuf,
    mode: FsWriteMode,
}

impl FsWriter {
    pub fn new(path: impl Into<PathBuf>, mode: FsWriteMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    pub(crate) fn write(&mut self, value: f64) -> ControlResult<i64> {
        let raw = match self.mode {
            FsWriteMode::Raw => value as i64,
            FsWriteMode::Percent { min, max } => {
                (min as f64 + value * (max - min) as f64).round() as i64
            }
        };
        write_int(&self.path, raw)?;
        Ok(raw)
    }
}

fn write_int(path: &Path, value: i64) -> ControlResult<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| ControlError::Transport {
            sensor: path.display().to_string(),
            reason: e.to_string(),
        })?;
    write!(file, "{value}").map_err(|e| ControlError::Transport {
        sensor: path.display().to_string(),
        reason: e.to_string(),
    })
}
