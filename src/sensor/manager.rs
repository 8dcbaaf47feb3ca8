//! Owns every wired `Sensor` by name. Zones borrow sensors through the
//! manager rather than owning them directly, since a sensor name is
//! guaranteed unique across the whole daemon even though it appears in
//! exactly one zone's input list.

use super::Sensor;
use crate::error::{ControlError, ControlResult};
use std::collections::HashMap;

#[derive(Default)]
pub struct SensorManager {
    sensors: HashMap<String, Sensor>,
    /// Whether the host this daemon manages is currently powered off,
    /// consulted by sensors with `ignore_fail_if_host_off` set. Updated by
    /// an external collaborator (host-state monitoring is out of scope
    /// for this crate); defaults to "on".
    host_off: bool,
}

impl SensorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor: Sensor) {
        self.sensors.insert(sensor.name().to_string(), sensor);
    }

    pub fn get(&self, name: &str) -> ControlResult<&Sensor> {
        self.sensors.get(name).ok_or_else(|| ControlError::Wiring {
            zone: "-".into(),
            reason: format!("unknown sensor `{name}`"),
        })
    }

    pub fn get_mut(&mut self, name: &str) -> ControlResult<&mut Sensor> {
        self.sensors
            .get_mut(name)
            .ok_or_else(|| ControlError::Wiring {
                zone: "-".into(),
                reason: format!("unknown sensor `{name}`"),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sensors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sensors.keys().map(|s| s.as_str())
    }

    pub fn set_host_off(&mut self, off: bool) {
        self.host_off = off;
    }

    pub fn host_off(&self) -> bool {
        self.host_off
    }
}
