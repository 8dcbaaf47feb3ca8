//! External mode interface: the command channel an outside collaborator
//! (a D-Bus shim, a REST handler, a test harness) uses to read or change a
//! zone's manual-mode flag or query its current failsafe state, without
//! reaching across the per-zone task boundary directly.

use crate::error::{ControlError, ControlResult};
use tokio::sync::{mpsc, oneshot};

/// One request sent to a zone's periodic loop, answered over a one-shot
/// reply channel. Commands are drained at the start of every tick.
pub enum ModeCommand {
    GetManual {
        zone: i64,
        respond: oneshot::Sender<ControlResult<bool>>,
    },
    SetManual {
        zone: i64,
        value: bool,
        respond: oneshot::Sender<ControlResult<()>>,
    },
    GetFailsafe {
        zone: i64,
        respond: oneshot::Sender<ControlResult<bool>>,
    },
}

pub type ModeSender = mpsc::Sender<ModeCommand>;
pub type ModeReceiver = mpsc::Receiver<ModeCommand>;

/// Creates the channel pair used to wire one zone's mode interface. The
/// bound is small: mode changes are rare, interactive operations, never a
/// hot path.
pub fn channel() -> (ModeSender, ModeReceiver) {
    mpsc::channel(8)
}

pub fn invalid_zone(zone: i64) -> ControlError {
    ControlError::Wiring {
        zone: zone.to_string(),
        reason: "invalid-zone".to_string(),
    }
}

pub fn transport_failure(reason: impl Into<String>) -> ControlError {
    ControlError::Internal(format!("transport-failure: {}", reason.into()))
}

/// Sends `GetManual` and awaits the reply, surfacing a dropped receiver or
/// a dropped reply channel as `transport_failure` rather than panicking.
pub async fn get_manual(tx: &ModeSender, zone: i64) -> ControlResult<bool> {
    let (respond, rx) = oneshot::channel();
    tx.send(ModeCommand::GetManual { zone, respond })
        .await
        .map_err(|e| transport_failure(e.to_string()))?;
    rx.await.map_err(|e| transport_failure(e.to_string()))?
}

/// Sends `SetManual` and awaits the reply.
pub async fn set_manual(tx: &ModeSender, zone: i64, value: bool) -> ControlResult<()> {
    let (respond, rx) = oneshot::channel();
    tx.send(ModeCommand::SetManual { zone, value, respond })
        .await
        .map_err(|e| transport_failure(e.to_string()))?;
    rx.await.map_err(|e| transport_failure(e.to_string()))?
}

/// Sends `GetFailsafe` and awaits the reply.
pub async fn get_failsafe(tx: &ModeSender, zone: i64) -> ControlResult<bool> {
    let (respond, rx) = oneshot::channel();
    tx.send(ModeCommand::GetFailsafe { zone, respond })
        .await
        .map_err(|e| transport_failure(e.to_string()))?;
    rx.await.map_err(|e| transport_failure(e.to_string()))?
}
