//! Per-zone diagnostic logging: a CSV trace of every cached value and
//! output, plus one `pidcore.<name>`/`pidcoeffs.<name>` pair per PID
//! controller for offline tuning. Enabled only when `--corelogging` is
//! passed; best-effort (a write failure here never aborts a cycle).

use crate::ec::PidInfo;
use crate::error::ControlResult;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const CORE_STALENESS: Duration = Duration::from_secs(60);

pub struct DiagLog {
    csv_file: File,
    csv_header_written: bool,
    core_dir: PathBuf,
    core_files: HashMap<String, File>,
    coeffs_written: HashSet<String>,
    last_core: HashMap<String, (f64, f64, f64, Instant)>,
}

impl DiagLog {
    pub fn new(csv_path: impl AsRef<Path>, core_dir: impl Into<PathBuf>) -> ControlResult<Self> {
        let csv_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(csv_path.as_ref())?;
        let core_dir = core_dir.into();
        std::fs::create_dir_all(&core_dir)?;
        Ok(Self {
            csv_file,
            csv_header_written: false,
            core_dir,
            core_files: HashMap::new(),
            coeffs_written: HashSet::new(),
            last_core: HashMap::new(),
        })
    }

    /// One CSV row per cycle in a fixed column order: `epoch_ms, setpt`,
    /// then `f, f_raw, f_pwm, f_pwm_raw` per fan name, then `t, t_raw` per
    /// thermal name, then `failsafe`. `fan_names`/`thermal_names` fix both
    /// the header and every row to the same order regardless of what the
    /// caches currently hold; a name absent from a cache contributes zeros.
    pub fn write_cycle(
        &mut self,
        epoch_ms: i64,
        setpt: f64,
        fan_names: &[String],
        thermal_names: &[String],
        value_cache: &HashMap<String, (f64, f64)>,
        output_cache: &HashMap<String, (f64, f64)>,
        failsafe: bool,
    ) -> ControlResult<()> {
        if !self.csv_header_written {
            let mut header = String::from("epoch_ms,setpt");
            for name in fan_names {
                header.push_str(&format!(",{name},{name}_raw,{name}_pwm,{name}_pwm_raw"));
            }
            for name in thermal_names {
                header.push_str(&format!(",{name},{name}_raw"));
            }
            header.push_str(",failsafe");
            writeln!(self.csv_file, "{header}")?;
            self.csv_header_written = true;
        }

        let mut row = format!("{epoch_ms},{setpt}");
        for name in fan_names {
            let (f, f_raw) = value_cache.get(name).copied().unwrap_or((0.0, 0.0));
            let (f_pwm, f_pwm_raw) = output_cache.get(name).copied().unwrap_or((0.0, 0.0));
            row.push_str(&format!(",{f},{f_raw},{f_pwm},{f_pwm_raw}"));
        }
        for name in thermal_names {
            let (t, t_raw) = value_cache.get(name).copied().unwrap_or((0.0, 0.0));
            row.push_str(&format!(",{t},{t_raw}"));
        }
        row.push_str(if failsafe { ",1" } else { ",0" });
        writeln!(self.csv_file, "{row}")?;
        Ok(())
    }

    fn core_file(&mut self, name: &str) -> ControlResult<&mut File> {
        if !self.core_files.contains_key(name) {
            let path = self.core_dir.join(format!("pidcore.{name}"));
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            self.core_files.insert(name.to_string(), file);
        }
        Ok(self.core_files.get_mut(name).expect("just inserted"))
    }

    /// Writes `timestamp, input, setpoint, output` for controller `name`,
    /// but only when the triple changed since the last write or the
    /// previous write is stale by `CORE_STALENESS`.
    pub fn write_pid_core(
        &mut self,
        name: &str,
        timestamp: DateTime<Utc>,
        input: f64,
        setpoint: f64,
        output: f64,
    ) -> ControlResult<()> {
        let now = Instant::now();
        let stale_or_changed = match self.last_core.get(name) {
            Some((last_input, last_setpoint, last_output, last_at)) => {
                *last_input != input
                    || *last_setpoint != setpoint
                    || *last_output != output
                    || now.duration_since(*last_at) >= CORE_STALENESS
            }
            None => true,
        };
        if !stale_or_changed {
            return Ok(());
        }

        let line = format!("{},{input},{setpoint},{output}", timestamp.to_rfc3339());
        let file = self.core_file(name)?;
        writeln!(file, "{line}")?;
        self.last_core.insert(name.to_string(), (input, setpoint, output, now));
        Ok(())
    }

    /// Writes the coefficient line for controller `name`, once at wiring
    /// time and again on every reload.
    pub fn write_pid_coeffs(&mut self, name: &str, info: &PidInfo) -> ControlResult<()> {
        let path = self.core_dir.join(format!("pidcoeffs.{name}"));
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{}",
            info.proportional_coeff,
            info.integral_coeff,
            info.derivative_coeff,
            info.feed_fwd_offset,
            info.feed_fwd_gain,
            info.integral_limit.min,
            info.integral_limit.max,
            info.out_limit.min,
            info.out_limit.max,
            info.slew_neg,
            info.slew_pos,
        )?;
        self.coeffs_written.insert(name.to_string());
        Ok(())
    }
}
