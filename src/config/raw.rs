//! The on-disk configuration tree, deserialized as-is from JSON or TOML.
//! Deliberately permissive: unknown fields are ignored (`deny_unknown_fields`
//! is never set) so older config files keep loading across upgrades.
//! `validate` and `builder::wire` are the only code that may reject or
//! interpret these values; nothing else in the crate should parse config.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub sensors: Vec<RawSensorConfig>,
    #[serde(default)]
    pub zones: Vec<RawZoneConfig>,
}

fn default_min() -> f64 {
    f64::MIN
}

fn default_max() -> f64 {
    f64::MAX
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSensorConfig {
    pub name: String,
    pub kind: String,
    /// `"filesystem"`, `"passive"`, `"external"`, or `"active"`.
    #[serde(default = "default_transport")]
    pub read_transport: String,
    pub read_path: Option<String>,
    pub write_path: Option<String>,
    #[serde(default)]
    pub write_percent: bool,
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    /// Scale applied at push time for passive sensors; `value * 10^scale`.
    #[serde(default)]
    pub scale: i32,
    pub timeout_seconds: Option<i64>,
    #[serde(default)]
    pub ignore_dbus_min_max: bool,
    #[serde(default = "default_true")]
    pub unavailable_as_failed: bool,
    #[serde(default)]
    pub ignore_fail_if_host_off: bool,
    #[serde(default)]
    pub consecutive_zero_failure_threshold: Option<u32>,
    /// Upper bound; a reading `>=` this value asserts failure outright.
    #[serde(default)]
    pub threshold_critical_high: Option<f64>,
    /// Upper bound, consulted only when no critical threshold fired.
    #[serde(default)]
    pub threshold_warning_high: Option<f64>,
}

fn default_transport() -> String {
    "filesystem".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawZoneConfig {
    pub id: i64,
    pub min_thermal_output: f64,
    pub failsafe_percent: f64,
    #[serde(default)]
    pub strict_failsafe: bool,
    #[serde(default)]
    pub redundant_write: bool,
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// How often thermal/stepwise sensors are re-read, in milliseconds.
    /// Defaults to the cycle interval (refreshed every tick).
    pub update_thermals_ms: Option<u64>,
    /// How many `cycle_interval_ms` ticks elapse between
    /// `Zone::check_fan_failures` sweeps. Defaults to every tick.
    #[serde(default = "default_check_fan_failures_cycle")]
    pub check_fan_failures_cycle: u64,
    #[serde(default)]
    pub controllers: Vec<RawControllerConfig>,
}

fn default_cycle_interval_ms() -> u64 {
    1000
}

fn default_check_fan_failures_cycle() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RawControllerConfig {
    #[serde(rename = "fan")]
    Fan {
        name: String,
        inputs: Vec<String>,
        outputs: Vec<String>,
    },
    #[serde(rename = "thermal")]
    Thermal {
        name: String,
        inputs: Vec<RawInputConfig>,
        setpoint: f64,
        #[serde(default)]
        combine: String,
        #[serde(default)]
        variant: String,
        #[serde(default)]
        is_ceiling: bool,
        pid: RawPidConfig,
    },
    #[serde(rename = "stepwise")]
    Stepwise {
        name: String,
        input: RawInputConfig,
        #[serde(default)]
        is_ceiling: bool,
        reading: Vec<f64>,
        output: Vec<f64>,
        #[serde(default)]
        positive_hysteresis: f64,
        #[serde(default)]
        negative_hysteresis: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInputConfig {
    pub name: String,
    pub temp_to_margin: Option<f64>,
    #[serde(default)]
    pub missing_is_acceptable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPidConfig {
    #[serde(default)]
    pub p: f64,
    #[serde(default)]
    pub i: f64,
    #[serde(default)]
    pub d: f64,
    #[serde(default)]
    pub feed_fwd_offset: f64,
    #[serde(default)]
    pub feed_fwd_gain: f64,
    pub ts: f64,
    #[serde(default = "default_min")]
    pub i_limit_min: f64,
    #[serde(default = "default_max")]
    pub i_limit_max: f64,
    #[serde(default = "default_min")]
    pub out_limit_min: f64,
    #[serde(default = "default_max")]
    pub out_limit_max: f64,
    #[serde(default)]
    pub slew_neg: f64,
    #[serde(default)]
    pub slew_pos: f64,
    #[serde(default)]
    pub positive_hysteresis: f64,
    #[serde(default)]
    pub negative_hysteresis: f64,
    #[serde(default)]
    pub check_hysteresis_with_setpoint: bool,
}
