use serde::Serialize;
use tracing::info;

use crate::settings::credentials::{self, API_KEY_ENV};

/// Where an API key is currently available.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStatus {
    pub environment: bool,
    pub keychain: bool,
}

pub fn set_api_key(key: &str) -> Result<(), String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is empty".to_string());
    }
    credentials::set_api_key(key)
}

pub fn api_key_status() -> Result<KeyStatus, String> {
    let environment = std::env::var(API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty());
    let keychain = credentials::get_stored_api_key()?.is_some_and(|v| !v.trim().is_empty());
    info!("API key in environment: {}, in keychain: {}", environment, keychain);
    Ok(KeyStatus {
        environment,
        keychain,
    })
}

pub fn delete_api_key() -> Result<(), String> {
    credentials::delete_api_key()
}

impl KeyStatus {
    pub fn describe(&self) -> String {
        match (self.environment, self.keychain) {
            (true, true) => format!("set ({} overrides the keychain entry)", API_KEY_ENV),
            (true, false) => format!("set via {}", API_KEY_ENV),
            (false, true) => "set in keychain".to_string(),
            (false, false) => "not set".to_string(),
        }
    }
}
