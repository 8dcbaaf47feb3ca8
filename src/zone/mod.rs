//! `Zone`: the owner of a set of sensors and controllers, the value/output
//! caches controllers read and write through, the failsafe state machine,
//! and the setpoint/ceiling aggregation that turns per-controller output
//! into the single fraction the fan controllers apply.

pub mod diag_log;
pub mod failsafe_logger;

pub use diag_log::DiagLog;
pub use failsafe_logger::FailsafeLogger;

use crate::controller::{Controller, ZoneContext};
use crate::error::{ControlError, ControlResult};
use crate::sensor::{Sensor, SensorManager};
use chrono::Utc;
use log::warn;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

/// One thermal zone: a fixed set of fan and thermal/stepwise sensors, the
/// controllers that read them, and the aggregation policy that turns their
/// output into commanded fan percentages.
pub struct Zone {
    id: i64,
    min_thermal_output: f64,
    failsafe_percent: f64,
    strict_failsafe: bool,
    redundant_write: bool,

    fan_inputs: Vec<String>,
    thermal_inputs: Vec<String>,
    /// Sensor name -> whether its absence is tolerated without entering
    /// failsafe. A name can be declared `missing_is_acceptable` by more
    /// than one controller; any such declaration is enough to exempt it.
    missing_acceptable: HashMap<String, bool>,

    controllers: Vec<Controller>,
    sensors: SensorManager,

    value_cache: HashMap<String, (f64, f64)>,
    output_cache: HashMap<String, (f64, f64)>,
    setpoint_vector: Vec<f64>,
    ceiling_vector: Vec<f64>,
    maximum_setpoint: f64,

    manual_mode: bool,
    failsafe_sensors: HashSet<String>,
    failsafe_logger: FailsafeLogger,
    diag_log: Option<DiagLog>,
    /// Gates `pidcore.*`/`pidcoeffs.*` writes independently of whether a
    /// `DiagLog` exists at all (the CSV trace alone is gated by
    /// `logging_enabled`, not `corelogging`).
    corelogging: bool,

    /// Re-read, best-effort, once per cycle: if present and parseable, its
    /// value overrides the computed maximum setpoint for that cycle only.
    tuning_file: Option<PathBuf>,
}

impl Zone {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: i64,
        min_thermal_output: f64,
        failsafe_percent: f64,
        strict_failsafe: bool,
        redundant_write: bool,
        fan_inputs: Vec<String>,
        thermal_inputs: Vec<String>,
        sensors: SensorManager,
    ) -> Self {
        let mut failsafe_sensors = HashSet::new();
        for name in fan_inputs.iter().chain(thermal_inputs.iter()) {
            failsafe_sensors.insert(name.clone());
        }

        Self {
            id,
            min_thermal_output,
            failsafe_percent,
            strict_failsafe,
            redundant_write,
            fan_inputs,
            thermal_inputs,
            missing_acceptable: HashMap::new(),
            controllers: Vec::new(),
            sensors,
            value_cache: HashMap::new(),
            output_cache: HashMap::new(),
            setpoint_vector: Vec::new(),
            ceiling_vector: Vec::new(),
            maximum_setpoint: min_thermal_output,
            manual_mode: false,
            failsafe_sensors,
            failsafe_logger: FailsafeLogger::default(),
            diag_log: None,
            corelogging: false,
            tuning_file: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn push_controller(&mut self, controller: Controller) {
        self.controllers.push(controller);
    }

    /// Declares `name` exempt from failsafe-on-absence. Called by the
    /// builder once per controller input; OR-combines across callers.
    pub fn mark_missing_acceptable(&mut self, name: &str, acceptable: bool) {
        if acceptable {
            self.missing_acceptable.insert(name.to_string(), true);
        } else {
            self.missing_acceptable.entry(name.to_string()).or_insert(false);
        }
    }

    pub fn set_diag_log(&mut self, log: DiagLog) {
        self.diag_log = Some(log);
    }

    pub fn set_corelogging(&mut self, enabled: bool) {
        self.corelogging = enabled;
    }

    pub fn set_tuning_file(&mut self, path: PathBuf) {
        self.tuning_file = Some(path);
    }

    fn is_missing_acceptable(&self, name: &str) -> bool {
        self.missing_acceptable.get(name).copied().unwrap_or(false)
    }

    /// Inserts or removes `name` from the failsafe set per its current
    /// `Sensor::failed()` state, except for sensors declared
    /// `missing_is_acceptable`, which never contribute to failsafe
    /// membership regardless of their read outcome.
    fn update_failsafe_membership(&mut self, name: &str, location: &str) {
        if self.is_missing_acceptable(name) {
            return;
        }

        let failed = match self.sensors.get(name) {
            Ok(sensor) => sensor.failed(),
            Err(_) => true,
        };

        if failed {
            let fail_reason = self.sensors.get(name).ok().and_then(|s| s.fail_reason());
            let reason = match fail_reason {
                Some(crate::sensor::FailureReason::ThresholdCritical) => {
                    ControlError::ThresholdAssertion {
                        sensor: name.to_string(),
                        reason: "critical".to_string(),
                    }
                    .to_string()
                }
                Some(crate::sensor::FailureReason::ThresholdWarning) => {
                    ControlError::ThresholdAssertion {
                        sensor: name.to_string(),
                        reason: "warning".to_string(),
                    }
                    .to_string()
                }
                Some(r) => format!("{r:?}"),
                None => "unknown".to_string(),
            };
            self.failsafe_sensors.insert(name.to_string());
            self.failsafe_logger.record(
                self.id,
                !self.failsafe_sensors.is_empty(),
                location,
                &format!("sensor `{name}` entered failsafe: {reason}"),
            );
        } else if self.failsafe_sensors.remove(name) {
            self.failsafe_logger.record(
                self.id,
                !self.failsafe_sensors.is_empty(),
                location,
                &format!("sensor `{name}` recovered"),
            );
        }
    }

    /// Reads every fan sensor into the value cache and updates failsafe
    /// membership. Called once per cycle before `process_fans`.
    pub fn update_fan_telemetry(&mut self, now: Instant) {
        let host_off = self.sensors.host_off();
        let names: Vec<String> = self.fan_inputs.clone();
        for name in &names {
            if let Ok(sensor) = self.sensors.get_mut(name) {
                let reading = sensor.read(now, host_off);
                self.value_cache
                    .insert(name.clone(), (reading.value, reading.unscaled));
            }
            self.update_failsafe_membership(name, "update_fan_telemetry");
        }
    }

    /// Reads every thermal/stepwise sensor into the value cache and updates
    /// failsafe membership. Called once per `update_thermals_ms` tick,
    /// which may be a multiple of the base cycle interval.
    pub fn update_thermal_sensors(&mut self, now: Instant) {
        let host_off = self.sensors.host_off();
        let names: Vec<String> = self.thermal_inputs.clone();
        for name in &names {
            if let Ok(sensor) = self.sensors.get_mut(name) {
                let reading = sensor.read(now, host_off);
                self.value_cache
                    .insert(name.clone(), (reading.value, reading.unscaled));
            }
            self.update_failsafe_membership(name, "update_thermal_sensors");
        }
    }

    /// Re-checks every fan sensor's current failed state against
    /// `failsafe_sensors` without re-reading it, independent of the
    /// telemetry pass's cadence. Driven by `check_fan_failures_cycle`.
    pub fn check_fan_failures(&mut self) {
        let names: Vec<String> = self.fan_inputs.clone();
        for name in &names {
            self.update_failsafe_membership(name, "check_fan_failures");
        }
    }

    pub fn clear_setpoints(&mut self) {
        self.setpoint_vector.clear();
    }

    pub fn clear_ceilings(&mut self) {
        self.ceiling_vector.clear();
    }

    /// Runs every non-fan controller. Each controller reads the value cache
    /// and posts into `setpoint_vector`/`ceiling_vector` through the
    /// `ZoneContext` methods below.
    pub fn process_thermals(&mut self) -> ControlResult<()> {
        let mut controllers = std::mem::take(&mut self.controllers);
        for controller in controllers.iter_mut().filter(|c| !c.is_fan()) {
            controller.process(self)?;
        }
        self.controllers = controllers;
        Ok(())
    }

    /// Runs every fan controller. Must be called after `process_thermals`
    /// and `determine_maximum_setpoint` so `max_setpoint()` reflects this
    /// cycle's aggregation.
    pub fn process_fans(&mut self) -> ControlResult<()> {
        let mut controllers = std::mem::take(&mut self.controllers);
        for controller in controllers.iter_mut().filter(|c| c.is_fan()) {
            controller.process(self)?;
        }
        self.controllers = controllers;
        Ok(())
    }

    /// Folds the setpoint vector (plus the configured floor) and the
    /// ceiling vector into `maximum_setpoint`, honoring a best-effort
    /// tuning-file override when one is configured and parseable.
    pub fn determine_maximum_setpoint(&mut self) {
        let mut setpoint = self.min_thermal_output;
        for &v in &self.setpoint_vector {
            if v > setpoint {
                setpoint = v;
            }
        }

        if let Some(ceiling) = self.ceiling_vector.iter().cloned().fold(None, |acc: Option<f64>, v| {
            Some(match acc {
                Some(cur) => cur.min(v),
                None => v,
            })
        }) {
            setpoint = setpoint.min(ceiling);
        }

        if let Some(path) = &self.tuning_file {
            if let Ok(text) = std::fs::read_to_string(path) {
                if let Ok(parsed) = text.trim().parse::<f64>() {
                    setpoint = parsed;
                }
            }
        }

        self.maximum_setpoint = setpoint;
    }

    pub fn manual_mode(&self) -> bool {
        self.manual_mode
    }

    pub fn set_manual_mode(&mut self, manual: bool) {
        self.manual_mode = manual;
    }

    pub fn redundant_write_required(&self) -> bool {
        self.redundant_write
    }

    pub fn min_thermal_output(&self) -> f64 {
        self.min_thermal_output
    }

    pub fn get_sensor(&self, name: &str) -> ControlResult<&Sensor> {
        self.sensors.get(name)
    }

    pub fn set_host_off(&mut self, off: bool) {
        self.sensors.set_host_off(off);
    }

    /// Appends one CSV row to the diagnostic log, if one is configured.
    /// Best-effort: a write failure is logged and otherwise swallowed, per
    /// `DiagLog`'s own contract.
    pub fn log_cycle(&mut self) {
        let Some(mut diag) = self.diag_log.take() else {
            return;
        };
        let epoch_ms = Utc::now().timestamp_millis();
        let result = diag.write_cycle(
            epoch_ms,
            self.maximum_setpoint,
            &self.fan_inputs,
            &self.thermal_inputs,
            &self.value_cache,
            &self.output_cache,
            self.failsafe_mode(),
        );
        if let Err(e) = result {
            warn!("zone `{}`: failed to write diagnostic cycle log: {e}", self.id);
        }
        self.diag_log = Some(diag);
    }
}

impl ZoneContext for Zone {
    fn get_cached(&self, name: &str) -> Option<f64> {
        self.value_cache.get(name).map(|(v, _)| *v)
    }

    fn get_cached_pair(&self, name: &str) -> Option<(f64, f64)> {
        self.value_cache.get(name).copied()
    }

    fn add_setpoint(&mut self, v: f64) {
        self.setpoint_vector.push(v);
    }

    fn add_ceiling(&mut self, v: f64) {
        self.ceiling_vector.push(v);
    }

    fn max_setpoint(&self) -> f64 {
        self.maximum_setpoint
    }

    fn failsafe_mode(&self) -> bool {
        !self.failsafe_sensors.is_empty()
    }

    fn failsafe_percent(&self) -> f64 {
        self.failsafe_percent
    }

    fn strict_failsafe(&self) -> bool {
        self.strict_failsafe
    }

    fn get_sensor_mut(&mut self, name: &str) -> ControlResult<&mut Sensor> {
        self.sensors.get_mut(name)
    }

    fn set_output_cache(&mut self, name: &str, pair: (f64, f64)) {
        self.output_cache.insert(name.to_string(), pair);
    }

    fn log_pid_core(&mut self, name: &str, input: f64, setpoint: f64, output: f64) {
        if !self.corelogging {
            return;
        }
        let Some(mut diag) = self.diag_log.take() else {
            return;
        };
        if let Err(e) = diag.write_pid_core(name, Utc::now(), input, setpoint, output) {
            warn!("zone `{}`: failed to write pidcore log for `{name}`: {e}", self.id);
        }
        self.diag_log = Some(diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{fan::FanController, Controller};
    use crate::sensor::{fs::FsReader, fs::FsWriter, fs::FsWriteMode, ReadTransport, Sensor, SensorKind, WriteTransport};

    fn zone_with_one_fan() -> Zone {
        let mut sensors = SensorManager::new();
        sensors.insert(Sensor::new(
            "fan0",
            SensorKind::Fan,
            ReadTransport::FileSystem(FsReader::new("/nonexistent/fan0/input")),
            Some(WriteTransport::FileSystem(FsWriter::new(
                "/nonexistent/fan0/target",
                FsWriteMode::Raw,
            ))),
            0.0,
            0.0,
            0,
            false,
            true,
            false,
        ));
        let mut zone = Zone::new(0, 30.0, 40.0, false, false, vec!["fan0".into()], vec![], sensors);
        zone.push_controller(Controller::Fan(FanController::new(
            "fc0",
            vec!["fan0".into()],
            vec!["fan0".into()],
        )));
        zone
    }

    #[test]
    fn init_state_seeds_failsafe_with_all_inputs() {
        let zone = zone_with_one_fan();
        assert!(zone.failsafe_mode());
        assert!(zone.failsafe_sensors.contains("fan0"));
    }

    #[test]
    fn unreadable_sensor_stays_in_failsafe_after_telemetry() {
        let mut zone = zone_with_one_fan();
        zone.update_fan_telemetry(Instant::now());
        assert!(zone.failsafe_mode());
    }

    #[test]
    fn missing_is_acceptable_sensor_never_enters_failsafe_set() {
        let mut zone = zone_with_one_fan();
        zone.mark_missing_acceptable("fan0", true);
        zone.failsafe_sensors.clear();
        zone.update_fan_telemetry(Instant::now());
        assert!(!zone.failsafe_sensors.contains("fan0"));
    }

    #[test]
    fn determine_maximum_setpoint_floors_at_min_thermal_output() {
        let mut zone = zone_with_one_fan();
        zone.clear_setpoints();
        zone.determine_maximum_setpoint();
        assert_eq!(zone.max_setpoint(), 30.0);
    }

    #[test]
    fn ceiling_clamps_setpoint_below_floor_candidate() {
        let mut zone = zone_with_one_fan();
        zone.add_setpoint(80.0);
        zone.add_ceiling(50.0);
        zone.determine_maximum_setpoint();
        assert_eq!(zone.max_setpoint(), 50.0);
    }

    #[test]
    fn setpoint_vector_picks_maximum_candidate() {
        let mut zone = zone_with_one_fan();
        zone.add_setpoint(40.0);
        zone.add_setpoint(90.0);
        zone.determine_maximum_setpoint();
        assert_eq!(zone.max_setpoint(), 90.0);
    }
}
