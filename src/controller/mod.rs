//! Controllers: the three concrete behaviors (`fan`, `thermal`, `stepwise`)
//! dispatched through one tagged enum rather than a trait-object
//! hierarchy, per the "no deep hierarchy" design note.

pub mod fan;
pub mod stepwise;
pub mod thermal;

pub use fan::FanController;
pub use stepwise::StepwiseController;
pub use thermal::ThermalController;

use crate::error::ControlResult;
use crate::sensor::Sensor;
use serde::{Deserialize, Serialize};

/// A controller's declared reference to one of its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub name: String,
    /// When present, the cache value is converted via `margin = zero - temp`
    /// before the controller sees it.
    pub temp_to_margin: Option<f64>,
    pub missing_is_acceptable: bool,
}

impl InputSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            temp_to_margin: None,
            missing_is_acceptable: false,
        }
    }
}

/// The seam a `Controller` uses to reach its owning `Zone` without holding
/// an owning reference back to it -- an explicit context passed into
/// `process()`, per the design notes, instead of a cyclic handle graph.
pub trait ZoneContext {
    fn get_cached(&self, name: &str) -> Option<f64>;
    fn get_cached_pair(&self, name: &str) -> Option<(f64, f64)>;
    fn add_setpoint(&mut self, v: f64);
    fn add_ceiling(&mut self, v: f64);
    fn max_setpoint(&self) -> f64;
    fn failsafe_mode(&self) -> bool;
    fn failsafe_percent(&self) -> f64;
    fn strict_failsafe(&self) -> bool;
    fn get_sensor_mut(&mut self, name: &str) -> ControlResult<&mut Sensor>;
    fn set_output_cache(&mut self, name: &str, pair: (f64, f64));

    /// Per-PID diagnostic hook, called once per evaluation with the raw
    /// input/setpoint/output triple. No-op unless overridden; `Zone` gates
    /// its override on `corelogging`.
    fn log_pid_core(&mut self, _name: &str, _input: f64, _setpoint: f64, _output: f64) {}
}

/// The tagged variant of controller behaviors, dispatched with a plain
/// `match` rather than dynamic dispatch.
pub enum Controller {
    Fan(FanController),
    Thermal(ThermalController),
    Stepwise(StepwiseController),
}

impl Controller {
    pub fn name(&self) -> &str {
        match self {
            Controller::Fan(c) => c.name(),
            Controller::Thermal(c) => c.name(),
            Controller::Stepwise(c) => c.name(),
        }
    }

    pub fn is_fan(&self) -> bool {
        matches!(self, Controller::Fan(_))
    }

    /// Run one pass: gather inputs from the zone's cache, compute, emit
    /// output back into the zone. Called by `Zone::process_fans` for fan
    /// controllers and `Zone::process_thermals` for the other two.
    pub fn process(&mut self, zone: &mut dyn ZoneContext) -> ControlResult<()> {
        match self {
            Controller::Fan(c) => c.process(zone),
            Controller::Thermal(c) => c.process(zone),
            Controller::Stepwise(c) => c.process(zone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_spec_defaults_have_no_conversion() {
        let spec = InputSpec::new("temp0");
        assert!(spec.temp_to_margin.is_none());
        assert!(!spec.missing_is_acceptable);
    }
}
