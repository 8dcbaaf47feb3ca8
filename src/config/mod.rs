//! Configuration loading and validation. Everything downstream of the
//! builder sees only `Zone`/`Sensor` objects, never raw config structures.

pub mod loader;
pub mod raw;
pub mod validate;

pub use loader::load_file;
pub use raw::{RawConfig, RawControllerConfig, RawInputConfig, RawPidConfig, RawSensorConfig, RawZoneConfig};
pub use validate::validate;
