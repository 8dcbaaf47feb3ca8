//! Stepwise controller: single input, table-driven output via the
//! stepwise kernel, optionally declared as a ceiling.

use super::{InputSpec, ZoneContext};
use crate::ec::{stepwise, StepwiseInfo};
use crate::error::ControlResult;
use log::warn;

pub struct StepwiseController {
    name: String,
    input: InputSpec,
    info: StepwiseInfo,
    previous: Option<(f64, f64)>,
}

impl StepwiseController {
    pub fn new(name: impl Into<String>, input: InputSpec, info: StepwiseInfo) -> Self {
        Self {
            name: name.into(),
            input,
            info,
            previous: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ceiling(&self) -> bool {
        self.info.is_ceiling
    }

    pub fn process(&mut self, zone: &mut dyn ZoneContext) -> ControlResult<()> {
        let Some(input_value) = zone.get_cached(&self.input.name) else {
            if !self.input.missing_is_acceptable {
                warn!("stepwise controller `{}`: input `{}` missing", self.name, self.input.name);
            }
            return Ok(());
        };

        let output = stepwise(&self.info, input_value, self.previous);
        self.previous = Some((input_value, output));

        if self.info.is_ceiling {
            zone.add_ceiling(output);
        } else {
            zone.add_setpoint(output);
        }

        Ok(())
    }
}
