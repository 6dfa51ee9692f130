use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::config::DeviceConfig;

/// Key appended to saved configuration files.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Read a device configuration from a JSON file.
///
/// The file must contain a JSON object. A top-level `timestamp` written by
/// [`save_config`] is dropped so it never reaches the device parameters.
pub fn load_config(path: &Path) -> Result<DeviceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {:?}", path))?;
    let mut data: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Configuration {:?} is not a JSON object", path))?;
    data.shift_remove(TIMESTAMP_KEY);

    debug!("Read configuration with {} parameters from {:?}", data.len(), path);
    Ok(DeviceConfig::from_map(data))
}

/// Write a device configuration as pretty JSON with a `timestamp` field.
///
/// Uses a temporary file in the same directory as `path` and renames it
/// into place, so an interrupted write never leaves a partial file.
pub fn save_config(config: &DeviceConfig, path: &Path) -> Result<()> {
    let mut data = config.raw().clone();
    data.insert(
        TIMESTAMP_KEY.to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    let json = serde_json::to_string_pretty(&data)?;
    write_atomic(path, json.as_bytes())?;

    info!("Saved configuration with {} parameters to {:?}", config.len(), path);
    Ok(())
}

/// Write bytes to `target_path` through a temp file + rename.
pub fn write_atomic(target_path: &Path, content: &[u8]) -> Result<()> {
    let parent = match target_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => return Err(anyhow!("Target path has no parent directory: {:?}", target_path)),
    };

    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.flush()?;
    temp.persist(target_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moxa.json");
        let config = DeviceConfig::moxa_defaults();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_saved_file_has_timestamp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moxa.json");
        save_config(&DeviceConfig::moxa_defaults(), &path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let stamp = raw[TIMESTAMP_KEY].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        assert_eq!(raw["rts_threshold"], json!(512));
    }

    #[test]
    fn test_saved_file_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("moxa.json");
        save_config(&DeviceConfig::moxa_defaults(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"min_transmission_rate\": 6,"));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_write_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.txt");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
