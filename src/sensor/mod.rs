//! Sensor abstraction: a named input with a read transport, an optional
//! write transport, and the failure/timeout bookkeeping the Zone relies on
//! to drive its failsafe state machine.

pub mod active;
pub mod external;
pub mod fs;
pub mod manager;
pub mod passive;

pub use manager::SensorManager;

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// The declared role of a sensor, used both for defaulting its timeout and
/// for dispatch in the controller layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Fan,
    Temp,
    Margin,
    Power,
    #[serde(rename = "powersum")]
    PowerSum,
    #[serde(rename = "stepwise-temp")]
    StepwiseTemp,
}

impl SensorKind {
    /// A timeout of 0 means "never checked for staleness". Fans default to
    /// no timeout; everything else defaults to 2 seconds.
    pub fn default_timeout_seconds(self) -> i64 {
        match self {
            SensorKind::Fan => 0,
            _ => 2,
        }
    }
}

/// Why a sensor is currently reporting failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NotFinite,
    Timeout,
    Unavailable,
    ThresholdCritical,
    ThresholdWarning,
    Unknown,
}

/// A single reading: value (after any scaling/normalization), the
/// unscaled/raw counterpart, and when it was captured.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub value: f64,
    pub unscaled: f64,
    pub updated_at: Instant,
}

/// One sample pulled or pushed through a transport, before the Sensor
/// layers failure/timeout semantics on top.
#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    pub value: f64,
    pub unscaled: f64,
}

/// The four required reader plug-ins, as a closed enum rather than a
/// trait-object hierarchy -- matches the "no deep hierarchy" guidance for
/// small polymorphic sets in this codebase.
pub enum ReadTransport {
    /// Caches the most recent external push, scaled by a fixed power of
    /// ten at push time.
    Passive(passive::PassiveReader),
    /// Pulls a fresh value on demand from an active endpoint.
    Active(active::ActiveReader),
    /// Parses an integer from a filesystem path on every poll.
    FileSystem(fs::FsReader),
    /// Receives absolute readings pushed by other processes.
    External(external::ExternalReader),
}

impl ReadTransport {
    fn poll(&mut self) -> ControlResult<(RawSample, Instant)> {
        match self {
            ReadTransport::Passive(t) => t.poll(),
            ReadTransport::Active(t) => t.poll(),
            ReadTransport::FileSystem(t) => t.poll(),
            ReadTransport::External(t) => t.poll(),
        }
    }
}

/// The two required writer plug-ins.
pub enum WriteTransport {
    /// Writes a raw integer to a filesystem path, with an optional linear
    /// `[0,1] -> [min,max]` scaling (the "percentage" variant).
    FileSystem(fs::FsWriter),
    /// Writes to a remote endpoint owned by another process.
    ActiveRemote(active::ActiveWriter),
}

impl WriteTransport {
    fn write(&mut self, value: f64) -> ControlResult<i64> {
        match self {
            WriteTransport::FileSystem(w) => w.write(value),
            WriteTransport::ActiveRemote(w) => w.write(value),
        }
    }
}

/// A named sensor: read transport, optional write transport, and the
/// timeout/failure policy the Zone consults every cycle.
pub struct Sensor {
    name: String,
    kind: SensorKind,
    reader: ReadTransport,
    writer: Option<WriteTransport>,
    min: f64,
    max: f64,
    timeout: Duration,
    ignore_dbus_min_max: bool,
    unavailable_as_failed: bool,
    ignore_fail_if_host_off: bool,
    consecutive_zero_failure_threshold: Option<u32>,
    threshold_critical_high: Option<f64>,
    threshold_warning_high: Option<f64>,

    last_reading: Option<Reading>,
    failed: bool,
    fail_reason: Option<FailureReason>,
    consecutive_zero_count: u32,
}

impl Sensor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: SensorKind,
        reader: ReadTransport,
        writer: Option<WriteTransport>,
        min: f64,
        max: f64,
        timeout_seconds: i64,
        ignore_dbus_min_max: bool,
        unavailable_as_failed: bool,
        ignore_fail_if_host_off: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            reader,
            writer,
            min,
            max,
            timeout: Duration::from_secs(timeout_seconds.max(0) as u64),
            ignore_dbus_min_max,
            unavailable_as_failed,
            ignore_fail_if_host_off,
            consecutive_zero_failure_threshold: None,
            threshold_critical_high: None,
            threshold_warning_high: None,
            last_reading: None,
            failed: false,
            fail_reason: None,
            consecutive_zero_count: 0,
        }
    }

    pub fn with_consecutive_zero_failure_threshold(mut self, threshold: Option<u32>) -> Self {
        self.consecutive_zero_failure_threshold = threshold;
        self
    }

    /// `critical` marks failure outright; `warning` marks failure as a
    /// lower-severity `ThresholdWarning` reason when no critical threshold
    /// is also configured or tripped. Both are upper bounds -- a reading
    /// `>=` the threshold trips it.
    pub fn with_thresholds(mut self, critical_high: Option<f64>, warning_high: Option<f64>) -> Self {
        self.threshold_critical_high = critical_high;
        self.threshold_warning_high = warning_high;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn ignore_fail_if_host_off(&self) -> bool {
        self.ignore_fail_if_host_off
    }

    pub fn ignore_dbus_min_max(&self) -> bool {
        self.ignore_dbus_min_max
    }

    /// Pull a fresh sample through the transport and update failure state.
    /// `host_off` forces `failed = false` when `ignore_fail_if_host_off` is
    /// set, regardless of what the transport reported.
    pub fn read(&mut self, now: Instant, host_off: bool) -> Reading {
        match self.reader.poll() {
            Ok((sample, sampled_at)) => {
                // `ignore_dbus_min_max` only affects the external
                // normalization collaborators apply before a reading
                // reaches this sensor; by the time a value lands here it
                // is already in final units, so the flag is recorded for
                // builders/writers but not re-applied here.
                let value = sample.value;
                self.last_reading = Some(Reading {
                    value,
                    unscaled: sample.unscaled,
                    updated_at: sampled_at,
                });
                self.evaluate_failure(now, Some(value));
            }
            Err(_) => {
                self.failed = self.unavailable_as_failed;
                self.fail_reason = Some(FailureReason::Unavailable);
            }
        }

        if self.ignore_fail_if_host_off && host_off {
            self.failed = false;
            self.fail_reason = None;
        }

        self.last_reading.unwrap_or(Reading {
            value: 0.0,
            unscaled: 0.0,
            updated_at: now,
        })
    }

    fn evaluate_failure(&mut self, now: Instant, value: Option<f64>) {
        self.failed = false;
        self.fail_reason = None;

        match value {
            Some(v) if !v.is_finite() => {
                self.failed = true;
                self.fail_reason = Some(FailureReason::NotFinite);
            }
            Some(v) => {
                if let Some(threshold) = self.consecutive_zero_failure_threshold {
                    if v == 0.0 {
                        self.consecutive_zero_count += 1;
                        if self.consecutive_zero_count >= threshold {
                            self.failed = true;
                            self.fail_reason = Some(FailureReason::Unknown);
                        }
                    } else {
                        self.consecutive_zero_count = 0;
                    }
                }

                if let Some(critical) = self.threshold_critical_high {
                    if v >= critical {
                        self.assert_threshold(true);
                    }
                } else if let Some(warning) = self.threshold_warning_high {
                    if v >= warning {
                        self.assert_threshold(false);
                    }
                }
            }
            None => {}
        }

        if !self.timeout.is_zero() {
            if let Some(reading) = self.last_reading {
                if now.saturating_duration_since(reading.updated_at) >= self.timeout {
                    self.failed = true;
                    self.fail_reason = Some(FailureReason::Timeout);
                }
            }
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn fail_reason(&self) -> Option<FailureReason> {
        self.fail_reason
    }

    pub fn assert_threshold(&mut self, critical: bool) {
        self.failed = true;
        self.fail_reason = Some(if critical {
            FailureReason::ThresholdCritical
        } else {
            FailureReason::ThresholdWarning
        });
    }

    /// Write a fraction in `[0,1]` through the configured write transport,
    /// returning the raw integer actually emitted.
    pub fn write(&mut self, value: f64) -> ControlResult<i64> {
        match &mut self.writer {
            Some(w) => w.write(value),
            None => Err(ControlError::Internal(format!(
                "sensor `{}` has no write transport",
                self.name
            ))),
        }
    }

    pub fn has_write_transport(&self) -> bool {
        self.writer.is_some()
    }
}
