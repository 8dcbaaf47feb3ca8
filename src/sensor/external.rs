//! External reader: a sensor written to by other processes and read back
//! as an absolute value (e.g. a host-pushed temperature). Mechanically
//! the same cache-and-handoff as the passive reader, but with no
//! power-of-ten scaling applied -- the pushed value is already in final
//! units.

use super::RawSample;
use crate::error::ControlResult;
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct Cache {
    value: f64,
    updated_at: Instant,
}

#[derive(Clone)]
pub struct ExternalHandle {
    cache: Arc<Mutex<Cache>>,
}

impl ExternalHandle {
    pub fn push(&self, value: f64) {
        let mut guard = self.cache.lock().expect("external cache poisoned");
        guard.value = value;
        guard.updated_at = Instant::now();
    }
}

pub struct ExternalReader {
    cache: Arc<Mutex<Cache>>,
}

impl ExternalReader {
    pub fn new() -> (ExternalHandle, ExternalReader) {
        let cache = Arc::new(Mutex::new(Cache {
            value: 0.0,
            updated_at: Instant::now(),
        }));
        (
            ExternalHandle {
                cache: cache.clone(),
            },
            ExternalReader { cache },
        )
    }

    pub(crate) fn poll(&mut self) -> ControlResult<(RawSample, Instant)> {
        let guard = self.cache.lock().expect("external cache poisoned");
        Ok((
            RawSample {
                value: guard.value,
                unscaled: guard.value,
            },
            guard.updated_at,
        ))
    }
}

impl Default for ExternalReader {
    fn default() -> Self {
        Self::new().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_is_reflected_unscaled() {
        let (handle, mut reader) = ExternalReader::new();
        handle.push(72.5);
        let (sample, _) = reader.poll().unwrap();
        assert_eq!(sample.value, 72.5);
        assert_eq!(sample.unscaled, 72.5);
    }
}
