//! Turns a validated `RawConfig` into running `Zone` objects. The only
//! layer in the crate that sees the full configuration tree at once;
//! everything downstream works from `Zone`/`Sensor`/`Controller` alone.

use crate::config::raw::{RawConfig, RawControllerConfig, RawSensorConfig};
use crate::config::validate;
use crate::controller::{fan::FanController, stepwise::StepwiseController, thermal::{CombineRule, PidVariant, ThermalController}, Controller, InputSpec};
use crate::ec::{Limits, PidInfo, StepwiseInfo};
use crate::error::{ControlError, ControlResult};
use crate::runtime::flags::RuntimeFlags;
use crate::sensor::passive::{PassiveHandle, PassiveReader};
use crate::sensor::external::{ExternalHandle, ExternalReader};
use crate::sensor::fs::{FsReader, FsWriteMode, FsWriter};
use crate::sensor::{ReadTransport, Sensor, SensorKind, SensorManager, WriteTransport};
use crate::zone::{DiagLog, Zone};
use std::collections::{HashMap, HashSet};

/// The product of wiring: every zone, plus the push handles an external
/// collaborator needs to feed passive/external sensors. Handles are keyed
/// by sensor name across the whole config, not per zone.
pub struct Wired {
    pub zones: Vec<Zone>,
    /// `(cycle_interval_ms, update_thermals_ms, check_fan_failures_cycle)`
    /// per zone, aligned by index with `zones` -- the scheduling parameters
    /// `runtime::spawn` needs but `Zone` itself has no use for at runtime.
    pub zone_intervals: Vec<(u64, u64, u64)>,
    pub passive_handles: HashMap<String, PassiveHandle>,
    pub external_handles: HashMap<String, ExternalHandle>,
}

pub fn wire(config: &RawConfig, flags: &RuntimeFlags) -> ControlResult<Wired> {
    validate(config)?;

    let templates: HashMap<&str, &RawSensorConfig> =
        config.sensors.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut passive_handles = HashMap::new();
    let mut external_handles = HashMap::new();
    let mut zones = Vec::with_capacity(config.zones.len());
    let mut zone_intervals = Vec::with_capacity(config.zones.len());

    for raw_zone in &config.zones {
        let mut referenced = HashSet::new();
        for controller in &raw_zone.controllers {
            collect_names(controller, &mut referenced);
        }

        let mut sensors = SensorManager::new();
        let mut fan_inputs = Vec::new();
        let mut thermal_inputs = Vec::new();

        for name in &referenced {
            let template = templates.get(name.as_str()).ok_or_else(|| ControlError::Wiring {
                zone: raw_zone.id.to_string(),
                reason: format!("sensor `{name}` not declared"),
            })?;
            let sensor = build_sensor(template, &mut passive_handles, &mut external_handles)?;
            sensors.insert(sensor);
        }

        for controller in &raw_zone.controllers {
            if let RawControllerConfig::Fan { inputs, .. } = controller {
                fan_inputs.extend(inputs.iter().cloned());
            }
        }
        for controller in &raw_zone.controllers {
            match controller {
                RawControllerConfig::Thermal { inputs, .. } => {
                    thermal_inputs.extend(inputs.iter().map(|i| i.name.clone()));
                }
                RawControllerConfig::Stepwise { input, .. } => {
                    thermal_inputs.push(input.name.clone());
                }
                RawControllerConfig::Fan { .. } => {}
            }
        }

        let mut zone = Zone::new(
            raw_zone.id,
            raw_zone.min_thermal_output,
            raw_zone.failsafe_percent,
            raw_zone.strict_failsafe,
            raw_zone.redundant_write,
            fan_inputs,
            thermal_inputs,
            sensors,
        );

        let mut diag = if flags.logging_enabled || flags.corelogging {
            let csv_path = flags.log_dir.join(format!("zone{}.csv", raw_zone.id));
            let core_dir = flags.log_dir.join("core");
            Some(DiagLog::new(csv_path, core_dir)?)
        } else {
            None
        };

        for controller in &raw_zone.controllers {
            wire_controller(&mut zone, controller, diag.as_mut(), flags.corelogging)?;
        }

        zone.set_corelogging(flags.corelogging);
        if let Some(diag) = diag {
            zone.set_diag_log(diag);
        }
        if flags.tuning_enabled {
            if let Some(dir) = &flags.tuning_dir {
                zone.set_tuning_file(dir.join(format!("zone{}.tuning", raw_zone.id)));
            }
        }

        zone_intervals.push((
            raw_zone.cycle_interval_ms,
            raw_zone.update_thermals_ms.unwrap_or(raw_zone.cycle_interval_ms),
            raw_zone.check_fan_failures_cycle.max(1),
        ));
        zones.push(zone);
    }

    Ok(Wired { zones, zone_intervals, passive_handles, external_handles })
}

fn collect_names(controller: &RawControllerConfig, into: &mut HashSet<String>) {
    match controller {
        RawControllerConfig::Fan { inputs, outputs, .. } => {
            into.extend(inputs.iter().cloned());
            into.extend(outputs.iter().cloned());
        }
        RawControllerConfig::Thermal { inputs, .. } => {
            into.extend(inputs.iter().map(|i| i.name.clone()));
        }
        RawControllerConfig::Stepwise { input, .. } => {
            into.insert(input.name.clone());
        }
    }
}

fn wire_controller(
    zone: &mut Zone,
    controller: &RawControllerConfig,
    mut diag: Option<&mut DiagLog>,
    corelogging: bool,
) -> ControlResult<()> {
    match controller {
        RawControllerConfig::Fan { name, inputs, outputs } => {
            zone.push_controller(Controller::Fan(FanController::new(
                name.clone(),
                inputs.clone(),
                outputs.clone(),
            )));
        }
        RawControllerConfig::Thermal { name, inputs, setpoint, combine, variant, is_ceiling, pid } => {
            let input_specs: Vec<InputSpec> = inputs
                .iter()
                .map(|i| {
                    zone.mark_missing_acceptable(&i.name, i.missing_is_acceptable);
                    InputSpec {
                        name: i.name.clone(),
                        temp_to_margin: i.temp_to_margin,
                        missing_is_acceptable: i.missing_is_acceptable,
                    }
                })
                .collect();

            let combine_rule = match combine.as_str() {
                "summation" => CombineRule::Summation,
                _ => CombineRule::Absolute,
            };
            let variant_enum = match variant.as_str() {
                "standard" => PidVariant::Standard,
                _ => PidVariant::Google,
            };
            let info = PidInfo {
                proportional_coeff: pid.p,
                integral_coeff: pid.i,
                derivative_coeff: pid.d,
                feed_fwd_offset: pid.feed_fwd_offset,
                feed_fwd_gain: pid.feed_fwd_gain,
                ts: pid.ts,
                integral_limit: Limits::new(pid.i_limit_min, pid.i_limit_max),
                out_limit: Limits::new(pid.out_limit_min, pid.out_limit_max),
                slew_neg: pid.slew_neg,
                slew_pos: pid.slew_pos,
                positive_hysteresis: pid.positive_hysteresis,
                negative_hysteresis: pid.negative_hysteresis,
                check_hysteresis_with_setpoint: pid.check_hysteresis_with_setpoint,
            };
            if corelogging {
                if let Some(diag) = diag.as_mut() {
                    diag.write_pid_coeffs(name, &info)?;
                }
            }
            zone.push_controller(Controller::Thermal(ThermalController::new(
                name.clone(),
                input_specs,
                *setpoint,
                combine_rule,
                variant_enum,
                info,
                *is_ceiling,
            )));
        }
        RawControllerConfig::Stepwise { name, input, is_ceiling, reading, output, positive_hysteresis, negative_hysteresis } => {
            zone.mark_missing_acceptable(&input.name, input.missing_is_acceptable);
            let mut info = StepwiseInfo {
                is_ceiling: *is_ceiling,
                positive_hysteresis: *positive_hysteresis,
                negative_hysteresis: *negative_hysteresis,
                ..StepwiseInfo::default()
            };
            for (idx, (r, o)) in reading.iter().zip(output.iter()).enumerate() {
                info.reading[idx] = *r;
                info.output[idx] = *o;
            }
            let input_spec = InputSpec {
                name: input.name.clone(),
                temp_to_margin: input.temp_to_margin,
                missing_is_acceptable: input.missing_is_acceptable,
            };
            zone.push_controller(Controller::Stepwise(StepwiseController::new(name.clone(), input_spec, info)));
        }
    }
    Ok(())
}

fn build_sensor(
    template: &RawSensorConfig,
    passive_handles: &mut HashMap<String, PassiveHandle>,
    external_handles: &mut HashMap<String, ExternalHandle>,
) -> ControlResult<Sensor> {
    let kind = parse_kind(&template.kind)?;

    let reader = match template.read_transport.as_str() {
        "filesystem" => {
            let path = template.read_path.as_ref().ok_or_else(|| ControlError::Config(format!(
                "sensor `{}` declares filesystem read transport with no read_path",
                template.name
            )))?;
            ReadTransport::FileSystem(FsReader::new(path))
        }
        "passive" => {
            let (handle, reader) = PassiveReader::new(template.scale);
            passive_handles.insert(template.name.clone(), handle);
            ReadTransport::Passive(reader)
        }
        "external" => {
            let (handle, reader) = ExternalReader::new();
            external_handles.insert(template.name.clone(), handle);
            ReadTransport::External(reader)
        }
        other => {
            return Err(ControlError::Config(format!(
                "sensor `{}` declares unsupported read transport `{other}` (file-based wiring supports filesystem, passive, external)",
                template.name
            )));
        }
    };

    let writer = match &template.write_path {
        Some(path) => {
            let mode = if template.write_percent {
                FsWriteMode::Percent { min: template.min as i64, max: template.max as i64 }
            } else {
                FsWriteMode::Raw
            };
            Some(WriteTransport::FileSystem(FsWriter::new(path, mode)))
        }
        None => None,
    };

    let timeout = template
        .timeout_seconds
        .unwrap_or_else(|| kind.default_timeout_seconds());

    Ok(Sensor::new(
        template.name.clone(),
        kind,
        reader,
        writer,
        template.min,
        template.max,
        timeout,
        template.ignore_dbus_min_max,
        template.unavailable_as_failed,
        template.ignore_fail_if_host_off,
    )
    .with_consecutive_zero_failure_threshold(template.consecutive_zero_failure_threshold)
    .with_thresholds(template.threshold_critical_high, template.threshold_warning_high))
}

fn parse_kind(s: &str) -> ControlResult<SensorKind> {
    match s {
        "fan" => Ok(SensorKind::Fan),
        "temp" => Ok(SensorKind::Temp),
        "margin" => Ok(SensorKind::Margin),
        "power" => Ok(SensorKind::Power),
        "powersum" => Ok(SensorKind::PowerSum),
        "stepwise-temp" => Ok(SensorKind::StepwiseTemp),
        other => Err(ControlError::Config(format!("unknown sensor kind `{other}`"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::raw::{RawInputConfig, RawPidConfig, RawZoneConfig};

    fn sensor(name: &str, kind: &str) -> RawSensorConfig {
        RawSensorConfig {
            name: name.to_string(),
            kind: kind.to_string(),
            read_transport: "filesystem".to_string(),
            read_path: Some("/dev/null".into()),
            write_path: Some("/dev/null".into()),
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
            p: 1.0, i: 0.0, d: 0.0, feed_fwd_offset: 0.0, feed_fwd_gain: 0.0, ts: 1.0,
            i_limit_min: -100.0, i_limit_max: 100.0, out_limit_min: 0.0, out_limit_max: 100.0,
            slew_neg: 0.0, slew_pos: 0.0, positive_hysteresis: 0.0, negative_hysteresis: 0.0,
            check_hysteresis_with_setpoint: false,
        }
    }

    fn sample_config() -> RawConfig {
        RawConfig {
            sensors: vec![sensor("t0", "temp"), sensor("fan0", "fan")],
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
        }
    }

    #[test]
    fn wiring_a_well_formed_config_produces_one_zone() {
        let wired = wire(&sample_config(), &RuntimeFlags::default()).unwrap();
        assert_eq!(wired.zones.len(), 1);
        assert_eq!(wired.zones[0].id(), 0);
    }

    #[test]
    fn unknown_referenced_sensor_fails_wiring() {
        let mut cfg = sample_config();
        cfg.sensors.retain(|s| s.name != "t0");
        assert!(wire(&cfg, &RuntimeFlags::default()).is_err());
    }

    #[test]
    fn passive_transport_returns_a_push_handle() {
        let mut cfg = sample_config();
        cfg.sensors[0].read_transport = "passive".to_string();
        let wired = wire(&cfg, &RuntimeFlags::default()).unwrap();
        assert!(wired.passive_handles.contains_key("t0"));
    }
}
