//! Structural validation of a `RawConfig` tree, run once after parsing and
//! before any wiring is attempted. Every rule here is fatal: a config that
//! fails validation never reaches the builder.

use super::raw::{RawConfig, RawControllerConfig};
use crate::ec::MAX_STEPWISE_POINTS;
use crate::error::{ControlError, ControlResult};
use std::collections::HashSet;

pub fn validate(config: &RawConfig) -> ControlResult<()> {
    if config.sensors.is_empty() {
        return Err(ControlError::Config("no sensors declared".into()));
    }
    if config.zones.is_empty() {
        return Err(ControlError::Config("no zones declared".into()));
    }

    let sensor_names: HashSet<&str> = config.sensors.iter().map(|s| s.name.as_str()).collect();
    if sensor_names.len() != config.sensors.len() {
        return Err(ControlError::Config("duplicate sensor name".into()));
    }

    let mut zone_ids = HashSet::new();
    for zone in &config.zones {
        if !zone_ids.insert(zone.id) {
            return Err(ControlError::Config(format!("duplicate zone id {}", zone.id)));
        }
        if zone.controllers.is_empty() {
            return Err(ControlError::Config(format!(
                "zone {} declares no controllers",
                zone.id
            )));
        }

        for controller in &zone.controllers {
            validate_controller(zone.id, controller, &sensor_names)?;
        }
    }

    Ok(())
}

fn validate_controller(
    zone_id: i64,
    controller: &RawControllerConfig,
    sensor_names: &HashSet<&str>,
) -> ControlResult<()> {
    match controller {
        RawControllerConfig::Fan { name, inputs, outputs } => {
            if inputs.is_empty() || outputs.is_empty() {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: fan controller `{name}` needs at least one input and one output"
                )));
            }
            for s in inputs.iter().chain(outputs.iter()) {
                require_sensor(zone_id, name, s, sensor_names)?;
            }
        }
        RawControllerConfig::Thermal { name, inputs, pid, .. } => {
            if inputs.is_empty() {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: thermal controller `{name}` needs at least one input"
                )));
            }
            for i in inputs {
                require_sensor(zone_id, name, &i.name, sensor_names)?;
            }
            if pid.ts == 0.0 {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: thermal controller `{name}` has ts=0"
                )));
            }
        }
        RawControllerConfig::Stepwise { name, input, reading, output, .. } => {
            require_sensor(zone_id, name, &input.name, sensor_names)?;
            if reading.is_empty() || reading.len() > MAX_STEPWISE_POINTS {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: stepwise controller `{name}` must declare 1..={MAX_STEPWISE_POINTS} points"
                )));
            }
            if reading.len() != output.len() {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: stepwise controller `{name}` reading/output length mismatch"
                )));
            }
            if !reading.windows(2).all(|w| w[0] <= w[1]) {
                return Err(ControlError::Config(format!(
                    "zone {zone_id}: stepwise controller `{name}` readings must be non-decreasing"
                )));
            }
        }
    }
    Ok(())
}

fn require_sensor(
    zone_id: i64,
    controller: &str,
    name: &str,
    sensor_names: &HashSet<&str>,
) -> ControlResult<()> {
    if sensor_names.contains(name) {
        Ok(())
    } else {
        Err(ControlError::Config(format!(
            "zone {zone_id}: controller `{controller}` references unknown sensor `{name}`"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::raw::{RawInputConfig, RawPidConfig, RawSensorConfig, RawZoneConfig};

    fn sensor(name: &str) -> RawSensorConfig {
        RawSensorConfig {
            name: name.to_string(),
            kind: "temp".to_string(),
            read_transport: "filesystem".to_string(),
            read_path: Some("/dev/null".into()),
            write_path: None,
            write_percent: false,
            min: 0.0,
            max: 100.0,
            scale: 0,
            timeout_seconds: None,
            ignore_dbus_min_max: false,
            unavailable_as_failed: true,
            ignore_fail_if_host_off: false,
            consecutive_zero_failure_threshold: None,
            threshold_critical_high: None,
            threshold_warning_high: None,
        }
    }

    fn pid() -> RawPidConfig {
        RawPidConfig {
            p: 1.0,
            i: 0.0,
            d: 0.0,
            feed_fwd_offset: 0.0,
            feed_fwd_gain: 0.0,
            ts: 1.0,
            i_limit_min: -100.0,
            i_limit_max: 100.0,
            out_limit_min: 0.0,
            out_limit_max: 100.0,
            slew_neg: 0.0,
            slew_pos: 0.0,
            positive_hysteresis: 0.0,
            negative_hysteresis: 0.0,
            check_hysteresis_with_setpoint: false,
        }
    }

    #[test]
    fn empty_zones_rejected() {
        let cfg = RawConfig { sensors: vec![sensor("t0")], zones: vec![] };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn zone_with_no_controllers_rejected() {
        let cfg = RawConfig {
            sensors: vec![sensor("t0")],
            zones: vec![RawZoneConfig {
                id: 0,
                min_thermal_output: 20.0,
                failsafe_percent: 40.0,
                strict_failsafe: false,
                redundant_write: false,
                cycle_interval_ms: 1000,
                update_thermals_ms: None,
                check_fan_failures_cycle: 1,
                controllers: vec![],
            }],
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn stepwise_mismatched_lengths_rejected() {
        let cfg = RawConfig {
            sensors: vec![sensor("t0")],
            zones: vec![RawZoneConfig {
                id: 0,
                min_thermal_output: 20.0,
                failsafe_percent: 40.0,
                strict_failsafe: false,
                redundant_write: false,
                cycle_interval_ms: 1000,
                update_thermals_ms: None,
                check_fan_failures_cycle: 1,
                controllers: vec![RawControllerConfig::Stepwise {
                    name: "sw0".into(),
                    input: RawInputConfig { name: "t0".into(), temp_to_margin: None, missing_is_acceptable: false },
                    is_ceiling: false,
                    reading: vec![1.0, 2.0],
                    output: vec![1.0],
                    positive_hysteresis: 0.0,
                    negative_hysteresis: 0.0,
                }],
            }],
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn thermal_with_ts_zero_rejected() {
        let mut bad_pid = pid();
        bad_pid.ts = 0.0;
        let cfg = RawConfig {
            sensors: vec![sensor("t0")],
            zones: vec![RawZoneConfig {
                id: 0,
                min_thermal_output: 20.0,
                failsafe_percent: 40.0,
                strict_failsafe: false,
                redundant_write: false,
                cycle_interval_ms: 1000,
                update_thermals_ms: None,
                check_fan_failures_cycle: 1,
                controllers: vec![RawControllerConfig::Thermal {
                    name: "th0".into(),
                    inputs: vec![RawInputConfig { name: "t0".into(), temp_to_margin: None, missing_is_acceptable: false }],
                    setpoint: 50.0,
                    combine: "absolute".into(),
                    variant: "google".into(),
                    is_ceiling: false,
                    pid: bad_pid,
                }],
            }],
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn well_formed_config_passes() {
        let cfg = RawConfig {
            sensors: vec![sensor("t0"), sensor("fan0")],
            zones: vec![RawZoneConfig {
                id: 0,
                min_thermal_output: 20.0,
                failsafe_percent: 40.0,
                strict_failsafe: false,
                redundant_write: false,
                cycle_interval_ms: 1000,
                update_thermals_ms: None,
                check_fan_failures_cycle: 1,
                controllers: vec![
                    RawControllerConfig::Thermal {
                        name: "th0".into(),
                        inputs: vec![RawInputConfig { name: "t0".into(), temp_to_margin: None, missing_is_acceptable: false }],
                        setpoint: 50.0,
                        combine: "absolute".into(),
                        variant: "google".into(),
                        is_ceiling: false,
                        pid: pid(),
                    },
                    RawControllerConfig::Fan {
                        name: "fc0".into(),
                        inputs: vec!["fan0".into()],
                        outputs: vec!["fan0".into()],
                    },
                ],
            }],
        };
        assert!(validate(&cfg).is_ok());
    }
}
