//! The cooperative, single-threaded-per-zone periodic control loop: one
//! `tokio::spawn`'d task per `Zone`, ticked by `tokio::time::interval`,
//! cancelled via a shared flag plus `Notify`, with external mode commands
//! drained at the start of every tick.

use crate::runtime::flags::RuntimeFlags;
use crate::runtime::mode::{self, ModeCommand, ModeReceiver, ModeSender};
use crate::zone::Zone;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// The caller's handle onto a running zone task: cancellation flag, the
/// `Notify` used to wake it promptly on shutdown, the channel for mode
/// commands, and the join handle itself.
pub struct ZoneHandle {
    pub cancel: Arc<AtomicBool>,
    pub notify: Arc<Notify>,
    pub mode_tx: ModeSender,
    pub join: JoinHandle<()>,
}

impl ZoneHandle {
    /// Requests cooperative shutdown and wakes the task immediately rather
    /// than waiting for its next tick.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

pub fn spawn(
    mut zone: Zone,
    cycle_interval_ms: u64,
    update_thermals_ms: u64,
    check_fan_failures_cycle: u64,
    flags: RuntimeFlags,
) -> ZoneHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let notify = Arc::new(Notify::new());
    let (mode_tx, mode_rx) = mode::channel();

    let task_cancel = cancel.clone();
    let task_notify = notify.clone();
    let join = tokio::spawn(async move {
        run(
            &mut zone,
            cycle_interval_ms,
            update_thermals_ms,
            check_fan_failures_cycle,
            &flags,
            task_cancel,
            task_notify,
            mode_rx,
        )
        .await;
    });

    ZoneHandle { cancel, notify, mode_tx, join }
}

/// The thermal pass: clear setpoints/ceilings, run every non-fan
/// controller, fold the result into the maximum setpoint. Gated behind
/// `refresh_thermals` -- unlike the fan pass, which runs every tick -- so a
/// ThermalController's `ts` is not re-integrated against an unchanged input.
fn run_thermal_pass(zone: &mut Zone) {
    zone.clear_setpoints();
    zone.clear_ceilings();
    if let Err(e) = zone.process_thermals() {
        warn!("zone `{}`: thermal pass failed: {e}", zone.id());
    }
    zone.determine_maximum_setpoint();
}

fn run_fan_pass(zone: &mut Zone) {
    if let Err(e) = zone.process_fans() {
        warn!("zone `{}`: fan pass failed: {e}", zone.id());
    }
}

async fn run(
    zone: &mut Zone,
    cycle_interval_ms: u64,
    update_thermals_ms: u64,
    check_fan_failures_cycle: u64,
    flags: &RuntimeFlags,
    cancel: Arc<AtomicBool>,
    notify: Arc<Notify>,
    mut mode_rx: ModeReceiver,
) {
    // First-fire init: populate both caches, then run the thermal and fan
    // passes once so `maximum_setpoint`/output cache are never empty on
    // cycle zero.
    let start = Instant::now();
    zone.update_thermal_sensors(start);
    zone.update_fan_telemetry(start);
    if !zone.manual_mode() {
        run_thermal_pass(zone);
        run_fan_pass(zone);
    }
    zone.log_cycle();

    let mut ticker = tokio::time::interval(Duration::from_millis(cycle_interval_ms.max(1)));
    let mut since_thermal_update_ms: u64 = 0;
    let mut since_fan_check: u64 = 0;
    let check_fan_failures_cycle = check_fan_failures_cycle.max(1);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = notify.notified() => {}
        }
        if cancel.load(Ordering::SeqCst) {
            break;
        }

        drain_mode_commands(zone, &mut mode_rx);

        let now = Instant::now();
        since_thermal_update_ms += cycle_interval_ms;
        let refresh_thermals = since_thermal_update_ms >= update_thermals_ms;

        zone.update_fan_telemetry(now);

        since_fan_check += 1;
        if since_fan_check >= check_fan_failures_cycle {
            zone.check_fan_failures();
            since_fan_check = 0;
        }

        if zone.manual_mode() {
            // Manual mode still refreshes telemetry (above) so external
            // observers see live readings, but the controller passes and
            // aggregation are skipped entirely.
            zone.log_cycle();
            continue;
        }

        if refresh_thermals {
            zone.update_thermal_sensors(now);
            since_thermal_update_ms = 0;
            run_thermal_pass(zone);
        }
        run_fan_pass(zone);

        if flags.debug {
            debug!("zone `{}` tick: max_setpoint={}", zone.id(), zone.max_setpoint());
        }

        zone.log_cycle();
    }
}

fn drain_mode_commands(zone: &mut Zone, mode_rx: &mut ModeReceiver) {
    while let Ok(cmd) = mode_rx.try_recv() {
        match cmd {
            ModeCommand::GetManual { zone: zid, respond } => {
                let result = if zid == zone.id() {
                    Ok(zone.manual_mode())
                } else {
                    Err(mode::invalid_zone(zid))
                };
                let _ = respond.send(result);
            }
            ModeCommand::SetManual { zone: zid, value, respond } => {
                let result = if zid == zone.id() {
                    zone.set_manual_mode(value);
                    Ok(())
                } else {
                    Err(mode::invalid_zone(zid))
                };
                let _ = respond.send(result);
            }
            ModeCommand::GetFailsafe { zone: zid, respond } => {
                let result = if zid == zone.id() {
                    Ok(zone.failsafe_mode())
                } else {
                    Err(mode::invalid_zone(zid))
                };
                let _ = respond.send(result);
            }
        }
    }
}
