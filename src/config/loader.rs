//! Loads a `RawConfig` from disk, choosing JSON or TOML by file extension.

use super::raw::RawConfig;
use crate::error::{ControlError, ControlResult};
use std::path::Path;

pub fn load_file(path: impl AsRef<Path>) -> ControlResult<RawConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(toml::from_str(&content)?),
        Some("json") | None => Ok(serde_json::from_str(&content)?),
        Some(other) => Err(ControlError::Config(format!(
            "unrecognized config extension `{other}` (expected json or toml)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str, ext: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pid-control-cfg-{label}-{}.{ext}", std::process::id()))
    }

    #[test]
    fn loads_json_by_extension() {
        let path = temp_path("json", "json");
        std::fs::write(&path, r#"{"sensors":[],"zones":[]}"#).unwrap();
        let cfg = load_file(&path).unwrap();
        assert!(cfg.sensors.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loads_toml_by_extension() {
        let path = temp_path("toml", "toml");
        std::fs::write(&path, "sensors = []\nzones = []\n").unwrap();
        let cfg = load_file(&path).unwrap();
        assert!(cfg.zones.is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let path = temp_path("bad", "yaml");
        std::fs::write(&path, "sensors: []").unwrap();
        assert!(load_file(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
