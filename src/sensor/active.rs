//! Active reader/writer: pulls or pushes through a caller-supplied
//! endpoint rather than a cache or a filesystem path. The endpoint itself
//! (a message-bus property call, a remote RPC, ...) is an external
//! collaborator; this module only defines the seam it plugs into.

use super::RawSample;
use crate::error::ControlResult;
use std::time::Instant;

/// Something that can be polled synchronously for a fresh value. Bound to
/// `Send` so zones (and their sensors) can be moved across the `tokio`
/// task that drives a zone's periodic loop.
pub trait ActiveEndpoint: Send {
    fn poll(&mut self) -> ControlResult<f64>;
}

/// Something that can be written to synchronously.
pub trait ActiveSink: Send {
    fn write(&mut self, raw_value: i64) -> ControlResult<()>;
}

pub struct ActiveReader {
    endpoint: Box<dyn ActiveEndpoint>,
}

impl ActiveReader {
    pub fn new(endpoint: Box<dyn ActiveEndpoint>) -> Self {
        Self { endpoint }
    }

    pub(crate) fn poll(&mut self) -> ControlResult<(RawSample, Instant)> {
        let value = self.endpoint.poll()?;
        Ok((
            RawSample {
                value,
                unscaled: value,
            },
            Instant::now(),
        ))
    }
}

pub struct ActiveWriter {
    sink: Box<dyn ActiveSink>,
    min: f64,
    max: f64,
}

impl ActiveWriter {
    pub fn new(sink: Box<dyn ActiveSink>, min: f64, max: f64) -> Self {
        Self { sink, min, max }
    }

    pub(crate) fn write(&mut self, value: f64) -> ControlResult<i64> {
        let raw = (self.min + value * (self.max - self.min)).round() as i64;
        self.sink.write(raw)?;
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FixedEndpoint(f64);
    impl ActiveEndpoint for FixedEndpoint {
        fn poll(&mut self) -> ControlResult<f64> {
            Ok(self.0)
        }
    }

    struct RecordingSink(Arc<Mutex<Vec<i64>>>);
    impl ActiveSink for RecordingSink {
        fn write(&mut self, raw_value: i64) -> ControlResult<()> {
            self.0.lock().unwrap().push(raw_value);
            Ok(())
        }
    }

    #[test]
    fn active_reader_pulls_from_endpoint() {
        let mut reader = ActiveReader::new(Box::new(FixedEndpoint(42.0)));
        let (sample, _) = reader.poll().unwrap();
        assert_eq!(sample.value, 42.0);
    }

    #[test]
    fn active_writer_scales_into_min_max() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut writer = ActiveWriter::new(Box::new(RecordingSink(log.clone())), 0.0, 255.0);
        let raw = writer.write(1.0).unwrap();
        assert_eq!(raw, 255);
        assert_eq!(log.lock().unwrap().as_slice(), &[255]);
    }
}
