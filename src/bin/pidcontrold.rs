//! Daemon entry point: parse flags, load and validate configuration, wire
//! zones, spawn one task per zone, and run until a terminating signal
//! arrives. SIGHUP triggers a cancel-rewire-restart reload cycle.

use clap::Parser;
use pid_control::cli::Cli;
use pid_control::config::{load_file, raw::RawConfig};
use pid_control::daemon::{next_signal, Daemon, SignalEvent};
use pid_control::error::ControlResult;
use pid_control::runtime::{self, RuntimeFlags, Wired, ZoneHandle};
use std::process::ExitCode;
use std::time::Duration;

const RELOAD_MAX_ATTEMPTS: u32 = 5;
const RELOAD_BACKOFF: Duration = Duration::from_secs(10);

fn build_flags(cli: &Cli) -> RuntimeFlags {
    let mut flags = RuntimeFlags {
        tuning_enabled: cli.tuning.is_some(),
        tuning_dir: cli.tuning.clone(),
        logging_enabled: cli.log.is_some(),
        corelogging: cli.corelogging,
        log_dir: cli.log.clone().unwrap_or_else(|| std::path::PathBuf::from("/var/log/pid-control")),
        debug: cli.debug,
    };
    let sentinel_dir = flags.log_dir.clone();
    flags.apply_sentinels(&sentinel_dir);
    flags
}

fn spawn_all(wired: Wired, flags: &RuntimeFlags) -> Vec<ZoneHandle> {
    wired
        .zones
        .into_iter()
        .zip(wired.zone_intervals.into_iter())
        .map(|(zone, (cycle_ms, thermals_ms, fan_check_cycle))| {
            let id = zone.id();
            log::info!(
                "zone `{id}`: cycle={cycle_ms}ms thermals={thermals_ms}ms fan_check_cycle={fan_check_cycle}"
            );
            runtime::spawn(zone, cycle_ms, thermals_ms, fan_check_cycle, flags.clone())
        })
        .collect()
}

async fn cancel_and_join(handles: Vec<ZoneHandle>) {
    for handle in &handles {
        handle.cancel();
    }
    for handle in handles {
        let _ = handle.join.await;
    }
}

/// Cancels every running zone, then attempts to re-read and re-wire the
/// configuration up to `RELOAD_MAX_ATTEMPTS` times, sleeping
/// `RELOAD_BACKOFF` between failures. Returns the freshly spawned handles on
/// success, or the last error once every attempt has failed.
async fn reload(cli: &Cli, handles: Vec<ZoneHandle>) -> ControlResult<Vec<ZoneHandle>> {
    cancel_and_join(handles).await;

    let mut last_err = None;
    for attempt in 1..=RELOAD_MAX_ATTEMPTS {
        match reload_attempt(cli) {
            Ok((wired, flags)) => {
                log::info!("reload succeeded on attempt {attempt}");
                return Ok(spawn_all(wired, &flags));
            }
            Err(e) => {
                log::warn!("reload attempt {attempt}/{RELOAD_MAX_ATTEMPTS} failed: {e}");
                last_err = Some(e);
                if attempt < RELOAD_MAX_ATTEMPTS {
                    tokio::time::sleep(RELOAD_BACKOFF).await;
                }
            }
        }
    }
    Err(last_err.expect("at least one attempt recorded an error"))
}

fn reload_attempt(cli: &Cli) -> ControlResult<(Wired, RuntimeFlags)> {
    let flags = build_flags(cli);
    let raw_config: RawConfig = load_file(&cli.conf)?;
    let wired = runtime::wire(&raw_config, &flags)?;
    Ok((wired, flags))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let flags = build_flags(&cli);

    let raw_config = match load_file(&cli.conf) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("failed to load configuration `{}`: {e}", cli.conf.display());
            return ExitCode::FAILURE;
        }
    };

    let wired = match runtime::wire(&raw_config, &flags) {
        Ok(w) => w,
        Err(e) => {
            log::error!("failed to wire configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let daemon = Daemon::new(cli.pidfile.clone());
    if let Err(e) = daemon.write_pid_file() {
        log::error!("{e}");
        return ExitCode::FAILURE;
    }

    log::info!("pidcontrold starting {} zone(s)", wired.zones.len());

    let mut handles = spawn_all(wired, &flags);

    loop {
        match next_signal().await {
            SignalEvent::Shutdown => {
                log::info!("shutdown requested, stopping all zones");
                cancel_and_join(handles).await;
                break;
            }
            SignalEvent::Reload => {
                log::info!("SIGHUP received, reloading configuration");
                match reload(&cli, handles).await {
                    Ok(new_handles) => handles = new_handles,
                    Err(e) => {
                        log::error!("reload exhausted {RELOAD_MAX_ATTEMPTS} attempts, exiting: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
        }
    }

    ExitCode::SUCCESS
}
