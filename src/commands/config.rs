//! Device configuration commands. The current configuration lives in the
//! data directory and is what analyses run against by default.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::analyzer::prompts::ideal_configuration;
use crate::device::{load_config, save_config, DeviceConfig};
use crate::error::AnalyzerError;
use crate::settings::AppPaths;

fn config_error(err: anyhow::Error) -> String {
    AnalyzerError::Config(format!("{:#}", err)).into()
}

/// Configuration to analyze against: an explicit file, else the stored
/// current configuration, else the Moxa defaults.
pub fn resolve_device_config(
    paths: &AppPaths,
    explicit: Option<&Path>,
) -> Result<DeviceConfig, String> {
    if let Some(path) = explicit {
        info!("Using configuration from {:?}", path);
        return load_config(path).map_err(config_error);
    }
    let stored = paths.device_config_file();
    if stored.exists() {
        return load_config(&stored).map_err(config_error);
    }
    info!("No stored configuration, using Moxa defaults");
    Ok(DeviceConfig::moxa_defaults())
}

/// Persist `config` as the current configuration.
pub fn store_current_config(paths: &AppPaths, config: &DeviceConfig) -> Result<(), String> {
    save_config(config, &paths.device_config_file()).map_err(config_error)
}

pub fn show_config(paths: &AppPaths) -> Result<DeviceConfig, String> {
    resolve_device_config(paths, None)
}

/// Replace the current configuration with the defaults.
pub fn reset_config(paths: &AppPaths) -> Result<DeviceConfig, String> {
    let defaults = DeviceConfig::moxa_defaults();
    store_current_config(paths, &defaults)?;
    info!("Reset current configuration to defaults");
    Ok(defaults)
}

/// Edit one parameter of the current configuration.
pub fn set_config_value(paths: &AppPaths, assignment: &str) -> Result<(String, Value), String> {
    let mut config = resolve_device_config(paths, None)?;
    let (key, value) = config.apply_assignment(assignment).map_err(config_error)?;
    store_current_config(paths, &config)?;
    info!("Set configuration parameter {} = {}", key, value);
    Ok((key, value))
}

/// Import a configuration file as the current configuration.
pub fn import_config(paths: &AppPaths, source: &Path) -> Result<DeviceConfig, String> {
    let config = load_config(source).map_err(config_error)?;
    store_current_config(paths, &config)?;
    info!("Imported {} parameters from {:?}", config.len(), source);
    Ok(config)
}

/// Export the current configuration to a file.
pub fn export_config(paths: &AppPaths, target: &Path) -> Result<DeviceConfig, String> {
    let config = resolve_device_config(paths, None)?;
    save_config(&config, target).map_err(config_error)?;
    Ok(config)
}

/// A parameter whose current value differs from the ideal one.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealDifference {
    pub parameter: String,
    /// `None` when the current configuration lacks the parameter
    pub current: Option<Value>,
    pub ideal: Value,
}

/// Compare the current configuration with the ideal parameters.
pub fn ideal_differences(paths: &AppPaths) -> Result<Vec<IdealDifference>, String> {
    let current = resolve_device_config(paths, None)?;
    let differences: Vec<IdealDifference> = ideal_configuration()
        .raw()
        .iter()
        .filter(|(key, ideal)| current.get(key) != Some(*ideal))
        .map(|(key, ideal)| IdealDifference {
            parameter: key.clone(),
            current: current.get(key).cloned(),
            ideal: ideal.clone(),
        })
        .collect();
    info!("{} parameters differ from the ideal values", differences.len());
    Ok(differences)
}
