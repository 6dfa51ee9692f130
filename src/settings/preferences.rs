use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::analyzer::completion::{CompletionSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::analyzer::prompts::DEFAULT_TRUNCATION_LIMIT;
use crate::device::io::write_atomic;

pub const MODEL_KEY: &str = "model";
pub const API_BASE_URL_KEY: &str = "api_base_url";
pub const TIMEOUT_KEY: &str = "timeout_secs";
pub const TRUNCATION_LIMIT_KEY: &str = "truncation_limit";

/// Keys the analyzer reads. Other keys are stored but unused.
pub const KNOWN_KEYS: [&str; 4] = [MODEL_KEY, API_BASE_URL_KEY, TIMEOUT_KEY, TRUNCATION_LIMIT_KEY];

/// String key/value preferences persisted as a JSON object.
pub struct Preferences {
    path: PathBuf,
    values: Map<String, Value>,
}

impl Preferences {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, String> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read preferences {:?}: {}", path, e))?;
            serde_json::from_str(&content)
                .map_err(|e| format!("Preferences file {:?} is not a JSON object: {}", path, e))?
        } else {
            Map::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// String value of `key`. Empty and non-string values read as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::String(_) => None,
            other => {
                if KNOWN_KEYS.contains(&key) {
                    warn!(
                        "Ignoring preference '{}': expected a string, found {} in {:?}",
                        key, other, self.path
                    );
                }
                None
            }
        }
    }

    /// Set a value. Numeric preferences must be positive integers.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        if (key == TIMEOUT_KEY || key == TRUNCATION_LIMIT_KEY) && parse_positive(value).is_none() {
            return Err(format!("'{}' must be a positive integer, got '{}'", key, value));
        }
        if !KNOWN_KEYS.contains(&key) {
            warn!("Setting unknown preference '{}'", key);
        }
        self.values.insert(key.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    pub fn save(&self) -> Result<(), String> {
        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| format!("Failed to serialize preferences: {}", e))?;
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| format!("Failed to save preferences {:?}: {}", self.path, e))?;
        info!("Saved preferences to {:?}", self.path);
        Ok(())
    }

    /// Completion endpoint, model and timeout, falling back to defaults.
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            endpoint: self
                .get(API_BASE_URL_KEY)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: self.get(MODEL_KEY).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: self
                .get(TIMEOUT_KEY)
                .and_then(|v| parse_positive(&v))
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn truncation_limit(&self) -> usize {
        self.get(TRUNCATION_LIMIT_KEY)
            .and_then(|v| parse_positive(&v))
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_TRUNCATION_LIMIT)
    }
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|v| *v > 0)
}
