//! Stepwise lookup kernel: a non-decreasing step function from input to
//! output, with optional hysteresis gating and an optional "ceiling"
//! semantic flip.

use serde::{Deserialize, Serialize};

/// Maximum number of `(reading, output)` pairs a stepwise table may carry.
pub const MAX_STEPWISE_POINTS: usize = 20;

/// Declarative stepwise table. `reading` must be non-decreasing; unused
/// trailing slots carry `f64::NAN` and are skipped by the lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepwiseInfo {
    pub reading: [f64; MAX_STEPWISE_POINTS],
    pub output: [f64; MAX_STEPWISE_POINTS],
    pub is_ceiling: bool,
    pub positive_hysteresis: f64,
    pub negative_hysteresis: f64,
}

impl Default for StepwiseInfo {
    fn default() -> Self {
        Self {
            reading: [f64::NAN; MAX_STEPWISE_POINTS],
            output: [f64::NAN; MAX_STEPWISE_POINTS],
            is_ceiling: false,
            positive_hysteresis: 0.0,
            negative_hysteresis: 0.0,
        }
    }
}

/// Walk `reading[]` in order; return the highest `output[i]` whose
/// `reading[i] <= input`. Below `reading[0]`, return `output[0]`.
fn lookup(info: &StepwiseInfo, input: f64) -> f64 {
    let mut result = info.output[0];
    for i in 0..MAX_STEPWISE_POINTS {
        if info.reading[i].is_nan() {
            break;
        }
        if info.reading[i] <= input {
            result = info.output[i];
        } else {
            break;
        }
    }
    result
}

/// Evaluate the stepwise kernel, applying hysteresis against the previous
/// output: re-evaluation only moves the output once `input` crosses the
/// previous bin boundary by more than the applicable hysteresis amount.
///
/// `previous_input` and `previous_output` are `None` on the first
/// evaluation, in which case hysteresis has nothing to gate against and the
/// raw lookup is returned directly.
pub fn stepwise(
    info: &StepwiseInfo,
    input: f64,
    previous: Option<(f64, f64)>,
) -> f64 {
    let raw = lookup(info, input);

    let Some((prev_input, prev_output)) = previous else {
        return raw;
    };

    if raw == prev_output {
        return prev_output;
    }

    let delta = input - prev_input;
    if delta > 0.0 && delta <= info.positive_hysteresis {
        return prev_output;
    }
    if delta < 0.0 && -delta <= info.negative_hysteresis {
        return prev_output;
    }

    raw
}
