//! PID numerical kernels: the "Google" variant (slew-limited, with
//! feed-forward) and the simpler "Standard" variant.

use super::clamp;
use serde::{Deserialize, Serialize};

/// A closed `[min, max]` interval used for both integral and output clamps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub min: f64,
    pub max: f64,
}

impl Limits {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f64) -> f64 {
        clamp(v, self.min, self.max)
    }
}

/// Declarative PID coefficients and limits. Immutable once wired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidInfo {
    pub proportional_coeff: f64,
    pub integral_coeff: f64,
    pub derivative_coeff: f64,
    pub feed_fwd_offset: f64,
    pub feed_fwd_gain: f64,
    /// Sample period, seconds. Zero is a configuration error, rejected at
    /// wiring time, never reaching the kernel.
    pub ts: f64,
    pub integral_limit: Limits,
    pub out_limit: Limits,
    pub slew_neg: f64,
    pub slew_pos: f64,
    pub positive_hysteresis: f64,
    pub negative_hysteresis: f64,
    /// When set, `pid_standard` suppresses committing a new output unless
    /// `error` has moved past the hysteresis band since the last commit.
    pub check_hysteresis_with_setpoint: bool,
}

impl Default for PidInfo {
    fn default() -> Self {
        Self {
            proportional_coeff: 0.0,
            integral_coeff: 0.0,
            derivative_coeff: 0.0,
            feed_fwd_offset: 0.0,
            feed_fwd_gain: 0.0,
            ts: 1.0,
            integral_limit: Limits::new(0.0, 0.0),
            out_limit: Limits::new(0.0, 100.0),
            slew_neg: 0.0,
            slew_pos: 0.0,
            positive_hysteresis: 0.0,
            negative_hysteresis: 0.0,
            check_hysteresis_with_setpoint: false,
        }
    }
}

/// Mutable runtime companion to `PidInfo`, one per controller instance.
#[derive(Debug, Clone, Default)]
pub struct PidState {
    pub initialized: bool,
    pub integral: f64,
    pub last_output: f64,
    pub last_error: f64,
}

/// Evaluate one step of the Google-variant PID kernel.
///
/// `info.ts` must be non-zero; callers validate this at wiring time, never
/// at call time, so this function does not return a `Result`.
pub fn pid(info: &PidInfo, state: &mut PidState, input: f64, setpoint: f64) -> f64 {
    debug_assert!(info.ts != 0.0, "ts=0 must be rejected at wiring time");

    let error = setpoint - input;
    let p_term = info.proportional_coeff * error;

    let mut integral_term = 0.0;
    if info.integral_coeff != 0.0 {
        integral_term = state.integral + error * info.integral_coeff * info.ts;
        integral_term = info.integral_limit.clamp(integral_term);
    }

    let d_term = info.derivative_coeff * ((error - state.last_error) / info.ts);
    let ff_term = (setpoint + info.feed_fwd_offset) * info.feed_fwd_gain;

    let mut output = p_term + integral_term + d_term + ff_term;
    output = info.out_limit.clamp(output);

    if state.initialized {
        let mut slewed = false;
        if info.slew_neg != 0.0 {
            let min_out = state.last_output + info.slew_neg * info.ts;
            if output < min_out {
                output = min_out;
                slewed = true;
            }
        }
        if info.slew_pos != 0.0 {
            let max_out = state.last_output + info.slew_pos * info.ts;
            if output > max_out {
                output = max_out;
                slewed = true;
            }
        }
        if slewed {
            // Back-solve the integral term so the next tick's state is
            // consistent with the output we actually committed to.
            integral_term = output - p_term;
        }
    }

    integral_term = info.integral_limit.clamp(integral_term);

    state.integral = integral_term;
    state.last_error = error;
    state.last_output = output;
    state.initialized = true;

    output
}

/// Evaluate one step of the Standard-variant PID kernel: reversed
/// derivative sign, no slew limiting, no feed-forward/integral coupling.
pub fn pid_standard(info: &PidInfo, state: &mut PidState, input: f64, setpoint: f64) -> f64 {
    debug_assert!(info.ts != 0.0, "ts=0 must be rejected at wiring time");

    let error = setpoint - input;

    if info.check_hysteresis_with_setpoint && state.initialized {
        let delta = error - state.last_error;
        let within_band = if delta >= 0.0 {
            delta < info.positive_hysteresis
        } else {
            -delta < info.negative_hysteresis
        };
        if within_band {
            return state.last_output;
        }
    }

    let p_term = info.proportional_coeff * error;

    let mut integral_term = 0.0;
    if info.integral_coeff != 0.0 {
        integral_term = state.integral + error * info.integral_coeff * info.ts;
        integral_term = info.integral_limit.clamp(integral_term);
    }

    // Reversed sign relative to the Google variant.
    let d_term = info.derivative_coeff * ((state.last_error - error) / info.ts);

    let mut output = p_term + integral_term + d_term;
    output = info.out_limit.clamp(output);

    state.integral = integral_term;
    state.last_error = error;
    state.last_output = output;
    state.initialized = true;

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsilon_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Scenario 1 from SPEC_FULL.md §8.
    #[test]
    fn pid_single_step() {
        let info = PidInfo {
            proportional_coeff: 1.0,
            integral_coeff: 1.0,
            derivative_coeff: 0.0,
            feed_fwd_offset: 0.0,
            feed_fwd_gain: 0.0,
            ts: 1.0,
            integral_limit: Limits::new(-10.0, 10.0),
            out_limit: Limits::new(-100.0, 100.0),
            slew_neg: 0.0,
            slew_pos: 0.0,
            positive_hysteresis: 0.0,
            negative_hysteresis: 0.0,
            check_hysteresis_with_setpoint: false,
        };
        let mut state = PidState {
            initialized: true,
            integral: 0.0,
            last_output: 0.0,
            last_error: 0.0,
        };
        let out = pid(&info, &mut state, 20.0, 25.0);
        assert!(epsilon_eq(out, 10.0));
        assert!(epsilon_eq(state.integral, 5.0));
        assert!(epsilon_eq(state.last_error, 5.0));
    }

    /// Scenario 6 from SPEC_FULL.md §8.
    #[test]
    fn slew_limited_response_backsolves_integral() {
        let info = PidInfo {
            proportional_coeff: 40.0,
            integral_coeff: 0.0,
            derivative_coeff: 0.0,
            feed_fwd_offset: 0.0,
            feed_fwd_gain: 0.0,
            ts: 1.0,
            integral_limit: Limits::new(-1000.0, 1000.0),
            out_limit: Limits::new(-1000.0, 1000.0),
            slew_neg: 0.0,
            slew_pos: 10.0,
            positive_hysteresis: 0.0,
            negative_hysteresis: 0.0,
            check_hysteresis_with_setpoint: false,
        };
        let mut state = PidState {
            initialized: true,
            integral: 0.0,
            last_output: 0.0,
            last_error: 0.0,
        };
        // error of 1.25 * p=40 -> raw output 50, slew caps at last_output+10=10
        let out = pid(&info, &mut state, -1.25, 0.0);
        assert!(epsilon_eq(out, 10.0));
        // integral back-solved to out - P = 10 - 50 = -40, clamped within [-1000,1000]
        assert!(epsilon_eq(state.integral, -40.0));
    }

    #[test]
    fn ts_zero_is_unreachable_in_practice_but_documented() {
        // Wiring rejects ts=0 before the kernel ever sees it; this test
        // documents that contract rather than exercising division-by-zero.
        let info = PidInfo {
            ts: 1.0,
            ..PidInfo::default()
        };
        assert_ne!(info.ts, 0.0);
    }

    #[test]
    fn integral_clamped_to_limits_every_call() {
        let info = PidInfo {
            proportional_coeff: 0.0,
            integral_coeff: 100.0,
            ts: 1.0,
            integral_limit: Limits::new(-5.0, 5.0),
            out_limit: Limits::new(-1000.0, 1000.0),
            ..PidInfo::default()
        };
        let mut state = PidState::default();
        let _ = pid(&info, &mut state, 0.0, 10.0);
        assert!(state.integral <= 5.0 && state.integral >= -5.0);
    }

    #[test]
    fn standard_variant_with_hysteresis_suppresses_small_error_moves() {
        let info = PidInfo {
            proportional_coeff: 1.0,
            ts: 1.0,
            integral_limit: Limits::new(-100.0, 100.0),
            out_limit: Limits::new(-1000.0, 1000.0),
            positive_hysteresis: 2.0,
            negative_hysteresis: 2.0,
            check_hysteresis_with_setpoint: true,
            ..PidInfo::default()
        };
        let mut state = PidState {
            initialized: true,
            integral: 0.0,
            last_output: 7.0,
            last_error: 5.0,
        };
        // error moves from 5.0 to 6.0, a delta of 1.0 inside the 2.0 band.
        let out = pid_standard(&info, &mut state, 94.0, 100.0);
        assert!(epsilon_eq(out, 7.0));
        assert!(epsilon_eq(state.last_error, 5.0));

        // error now moves to 8.0, a delta of 3.0 past the band: commits.
        let out = pid_standard(&info, &mut state, 92.0, 100.0);
        assert!(epsilon_eq(out, 8.0));
        assert!(epsilon_eq(state.last_error, 8.0));
    }

    #[test]
    fn standard_variant_reverses_derivative_sign() {
        let info = PidInfo {
            proportional_coeff: 0.0,
            integral_coeff: 0.0,
            derivative_coeff: 1.0,
            ts: 1.0,
            integral_limit: Limits::new(-100.0, 100.0),
            out_limit: Limits::new(-1000.0, 1000.0),
            ..PidInfo::default()
        };
        let mut state = PidState {
            initialized: true,
            integral: 0.0,
            last_output: 0.0,
            last_error: 2.0,
        };
        // error = setpoint - input = 5 - 0 = 5; d = d*(last_error-error) = 1*(2-5) = -3
        let out = pid_standard(&info, &mut state, 0.0, 5.0);
        assert!(epsilon_eq(out, -3.0));
    }
}
