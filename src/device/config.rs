use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::analyzer::ConfigChange;

/// Configuration of a Moxa wireless client.
///
/// Wraps the raw JSON `Map<String, Value>` so unknown parameters survive
/// load/save and apply untouched. Key order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceConfig {
    data: Map<String, Value>,
}

impl DeviceConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a DeviceConfig from an existing Map.
    pub fn from_map(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Factory settings shown when no configuration was saved yet.
    pub fn moxa_defaults() -> Self {
        let value = serde_json::json!({
            "min_transmission_rate": 6,
            "max_transmission_power": 20,
            "rts_threshold": 512,
            "fragmentation_threshold": 2346,
            "roaming_mechanism": "signal_strength",
            "roaming_difference": 9,
            "roaming_threshold_type": "signal_strength",
            "roaming_threshold_value": -70,
            "ap_candidate_threshold_type": "signal_strength",
            "ap_candidate_threshold_value": -70,
            "remote_connection_check": true,
            "wmm_enabled": true,
            "turbo_roaming": true,
            "ap_alive_check": true
        });
        match value {
            Value::Object(data) => Self { data },
            _ => Self::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying map.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Pretty-printed JSON (2-space indent).
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.data).unwrap_or_else(|_| "{}".to_string())
    }

    /// Derive a new configuration with each change's recommended value
    /// written at its parameter. Changes without a parameter name or without
    /// a recommended value are skipped. Unlisted keys keep their value.
    pub fn with_changes(&self, changes: &[ConfigChange]) -> DeviceConfig {
        let mut next = self.clone();
        for change in changes {
            let Some(recommended) = change.recommended_value.as_ref() else {
                debug!("Skipping change for '{}' without recommended value", change.parameter);
                continue;
            };
            if change.parameter.is_empty() {
                debug!("Skipping change without parameter name");
                continue;
            }
            next.set(&change.parameter, recommended.clone());
        }
        next
    }

    /// Apply a `key=value` edit. Numbers and booleans are stored typed,
    /// anything else as a string.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(String, Value)> {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("Expected KEY=VALUE, got '{}'", assignment);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Parameter name is empty in '{}'", assignment);
        }
        let value = parse_scalar(raw.trim());
        self.set(key, value.clone());
        Ok((key.to_string(), value))
    }
}

fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
