//! Passive reader: caches the most recent value pushed by an external
//! collaborator (e.g. a message-bus property listener, out of scope for
//! this crate), scaled by a fixed power of ten at push time.

use super::RawSample;
use crate::error::ControlResult;
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct Cache {
    value: f64,
    updated_at: Instant,
}

/// Clonable handle given to the external pusher; the `PassiveReader` held
/// by the `Sensor` shares the same backing cell.
#[derive(Clone)]
pub struct PassiveHandle {
    cache: Arc<Mutex<Cache>>,
    scale: i32,
}

impl PassiveHandle {
    /// Push a new raw value. Scaled by `10^scale` before being cached, as
    /// the original dbus-passive transport does at construction and on
    /// every subsequent push.
    pub fn push(&self, raw_value: f64) {
        let scaled = raw_value * 10f64.powi(self.scale);
        let mut guard = self.cache.lock().expect("passive cache poisoned");
        guard.value = scaled;
        guard.updated_at = Instant::now();
    }
}

pub struct PassiveReader {
    cache: Arc<Mutex<Cache>>,
}

impl PassiveReader {
    /// Construct a reader/handle pair sharing one cache cell, scaled by
    /// `10^scale`. `scale` is typically negative (e.g. millidegrees).
    pub fn new(scale: i32) -> (PassiveHandle, PassiveReader) {
        let cache = Arc::new(Mutex::new(Cache {
            value: 0.0,
            updated_at: Instant::now(),
        }));
        (
            PassiveHandle {
                cache: cache.clone(),
                scale,
            },
            PassiveReader { cache },
        )
    }

    pub fn handle_scale(&self, scale: i32) -> PassiveHandle {
        PassiveHandle {
            cache: self.cache.clone(),
            scale,
        }
    }

    pub(crate) fn poll(&mut self) -> ControlResult<(RawSample, Instant)> {
        let guard = self.cache.lock().expect("passive cache poisoned");
        Ok((
            RawSample {
                value: guard.value,
                unscaled: guard.value,
            },
            guard.updated_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_scales_by_power_of_ten() {
        let (handle, mut reader) = PassiveReader::new(-3);
        handle.push(36500.0);
        let (sample, _) = reader.poll().unwrap();
        assert!((sample.value - 36.5).abs() < 1e-9);
    }

    #[test]
    fn reader_reflects_latest_push() {
        let (handle, mut reader) = PassiveReader::new(0);
        handle.push(1.0);
        handle.push(2.0);
        let (sample, _) = reader.poll().unwrap();
        assert_eq!(sample.value, 2.0);
    }
}
