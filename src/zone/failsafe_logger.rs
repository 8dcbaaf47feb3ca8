//! Per-zone, rate-limited failsafe transition logger. Diagnostic-only: no
//! program logic ever reads these entries back.

use log::{info, warn};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

pub struct FailsafeLogger {
    log_max_count_per_second: usize,
    current_failsafe_state: bool,
    log_timestamps: VecDeque<Instant>,
    logs_in_current_state: HashSet<String>,
}

impl FailsafeLogger {
    pub fn new(log_max_count_per_second: usize) -> Self {
        Self {
            log_max_count_per_second,
            current_failsafe_state: false,
            log_timestamps: VecDeque::new(),
            logs_in_current_state: HashSet::new(),
        }
    }

    /// Attempt to output an entering/leaving-failsafe-mode log. `location`
    /// identifies the calling pass (e.g. `update_fan_telemetry`); `reason`
    /// names the sensor and condition that changed. Entries are keyed by
    /// `(location, reason)` and deduplicated within the current failsafe
    /// state; the dedup memo is cleared on every transition.
    pub fn record(&mut self, zone_id: i64, new_failsafe_state: bool, location: &str, reason: &str) {
        let now = Instant::now();
        while let Some(front) = self.log_timestamps.front() {
            if now.duration_since(*front) >= Duration::from_secs(1) {
                self.log_timestamps.pop_front();
            } else {
                break;
            }
        }

        let origin_state = self.current_failsafe_state;
        if new_failsafe_state != self.current_failsafe_state {
            self.logs_in_current_state.clear();
            self.current_failsafe_state = new_failsafe_state;
        }

        let key = format!("{location} @ {reason}");
        if self.log_timestamps.len() >= self.log_max_count_per_second
            || self.logs_in_current_state.contains(&key)
        {
            return;
        }
        self.logs_in_current_state.insert(key);

        if new_failsafe_state {
            warn!("zone `{zone_id}` is in failsafe mode.\t\tWith update at `{location}`: {reason}");
        } else if origin_state {
            info!("zone `{zone_id}` leaves failsafe mode.\t\tWith update at `{location}`: {reason}");
        }

        self.log_timestamps.push_back(now);
    }
}

impl Default for FailsafeLogger {
    fn default() -> Self {
        Self::new(20)
    }
}
