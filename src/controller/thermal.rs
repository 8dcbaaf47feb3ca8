//! Thermal controller: single declared setpoint, one or more raw inputs
//! combined by a configurable rule, driving a PID kernel whose output
//! lands in the zone's setpoint or ceiling vector.

use super::{InputSpec, ZoneContext};
use crate::ec::{pid, pid_standard, PidInfo, PidState};
use crate::error::ControlResult;
use log::warn;

/// How multiple raw inputs combine into the single value the PID kernel
/// sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineRule {
    /// Picks the worst reading (highest temperature / lowest margin).
    #[default]
    Absolute,
    /// Adds every converted reading together.
    Summation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidVariant {
    Google,
    Standard,
}

pub struct ThermalController {
    name: String,
    inputs: Vec<InputSpec>,
    setpoint: f64,
    combine: CombineRule,
    variant: PidVariant,
    info: PidInfo,
    state: PidState,
    is_ceiling: bool,
}

impl ThermalController {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<InputSpec>,
        setpoint: f64,
        combine: CombineRule,
        variant: PidVariant,
        info: PidInfo,
        is_ceiling: bool,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            setpoint,
            combine,
            variant,
            info,
            state: PidState::default(),
            is_ceiling,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Converts a raw cache value per its input's `temp_to_margin`
    /// declaration, returning `(converted, is_margin)`. `is_margin` marks
    /// which direction counts as "worse" for `CombineRule::Absolute`.
    fn convert(input: &InputSpec, raw: f64) -> (f64, bool) {
        match input.temp_to_margin {
            Some(zero) => (zero - raw, true),
            None => (raw, false),
        }
    }

    fn gather(&self, zone: &dyn ZoneContext) -> Option<f64> {
        let mut combined: Option<f64> = None;
        let mut worst_badness = f64::NEG_INFINITY;

        for input in &self.inputs {
            let raw = match zone.get_cached(&input.name) {
                Some(v) => v,
                None => {
                    if input.missing_is_acceptable {
                        continue;
                    }
                    return None;
                }
            };
            let (converted, is_margin) = Self::convert(input, raw);

            match self.combine {
                CombineRule::Summation => {
                    combined = Some(combined.unwrap_or(0.0) + converted);
                }
                CombineRule::Absolute => {
                    // Negate margin values so "worse" is always the
                    // maximum in this shared badness space.
                    let badness = if is_margin { -converted } else { converted };
                    if badness > worst_badness {
                        worst_badness = badness;
                        combined = Some(converted);
                    }
                }
            }
        }

        combined
    }

    pub fn process(&mut self, zone: &mut dyn ZoneContext) -> ControlResult<()> {
        let Some(input_value) = self.gather(zone) else {
            warn!("thermal controller `{}`: a required input is missing", self.name);
            return Ok(());
        };

        let output = match self.variant {
            PidVariant::Google => pid(&self.info, &mut self.state, input_value, self.setpoint),
            PidVariant::Standard => {
                pid_standard(&self.info, &mut self.state, input_value, self.setpoint)
            }
        };

        zone.log_pid_core(&self.name, input_value, self.setpoint, output);

        if self.is_ceiling {
            zone.add_ceiling(output);
        } else {
            zone.add_setpoint(output);
        }

        Ok(())
    }
}
