//! Error taxonomy for configuration loading, wiring, and runtime control.
//!
//! Kernels and controllers never recover from their own errors; they report
//! upward to the `Zone`, which folds the failure into failsafe state and
//! keeps going. Only config and wiring errors are fatal to the process.

use thiserror::Error;

/// Crate-wide result alias.
pub type ControlResult<T> = std::result::Result<T, ControlError>;

#[derive(Error, Debug, Clone)]
pub enum ControlError {
    /// Invalid configuration, caught during parse or validation. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required input could not be resolved while wiring a zone. Fatal.
    #[error("wiring error in zone {zone}: {reason}")]
    Wiring { zone: String, reason: String },

    /// Transient read/write failure on a sensor transport. Non-fatal;
    /// counted toward the owning zone's failsafe state.
    #[error("transport error on sensor `{sensor}`: {reason}")]
    Transport { sensor: String, reason: String },

    /// A sensor's critical/warning threshold tripped. Treated as a
    /// failsafe-triggering input, not a hard error.
    #[error("threshold asserted on sensor `{sensor}`: {reason}")]
    ThresholdAssertion { sensor: String, reason: String },

    /// Normal termination signal observed; unwinds loops cooperatively.
    #[error("cancellation requested")]
    Cancellation,

    /// An invariant was violated that should have been prevented at wiring
    /// time (e.g. a controller with no inputs after the builder ran).
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ControlError {
    fn from(e: std::io::Error) -> Self {
        ControlError::Config(format!("io error: {e}"))
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(e: serde_json::Error) -> Self {
        ControlError::Config(format!("json parse error: {e}"))
    }
}

impl From<toml::de::Error> for ControlError {
    fn from(e: toml::de::Error) -> Self {
        ControlError::Config(format!("toml parse error: {e}"))
    }
}
