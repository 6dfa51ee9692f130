use keyring::Entry;
use tracing::{info, warn};

use crate::error::AnalyzerError;

pub const KEYRING_SERVICE: &str = "moxa-wifi-analyzer-openai";
pub const KEYRING_USER: &str = "moxa-wifi-analyzer";

/// Takes precedence over the keychain entry.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

fn entry() -> Result<Entry, String> {
    Entry::new(KEYRING_SERVICE, KEYRING_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", KEYRING_SERVICE, e);
        e.to_string()
    })
}

pub fn set_api_key(key: &str) -> Result<(), String> {
    info!("Setting API key for service: {}", KEYRING_SERVICE);
    entry()?.set_password(key).map_err(|e| {
        warn!("Failed to set password for {}: {}", KEYRING_SERVICE, e);
        e.to_string()
    })
}

pub fn get_stored_api_key() -> Result<Option<String>, String> {
    match entry()?.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => {
            info!("No API key found for service: {}", KEYRING_SERVICE);
            Ok(None)
        }
        Err(e) => {
            warn!("Failed to get password for {}: {}", KEYRING_SERVICE, e);
            Err(e.to_string())
        }
    }
}

pub fn delete_api_key() -> Result<(), String> {
    info!("Deleting API key for service: {}", KEYRING_SERVICE);
    match entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete credential for {}: {}", KEYRING_SERVICE, e);
            Err(e.to_string())
        }
    }
}

/// Where the API key used for an analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Keychain,
}

/// The API key for the completion service: `OPENAI_API_KEY`, else the keychain.
pub fn resolve_api_key() -> Result<(String, KeySource), AnalyzerError> {
    resolve_from(std::env::var(API_KEY_ENV).ok(), get_stored_api_key)
}

fn resolve_from(
    env_value: Option<String>,
    stored: impl FnOnce() -> Result<Option<String>, String>,
) -> Result<(String, KeySource), AnalyzerError> {
    if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
        return Ok((key, KeySource::Environment));
    }
    match stored().map_err(AnalyzerError::Keychain)? {
        Some(key) if !key.trim().is_empty() => Ok((key, KeySource::Keychain)),
        _ => Err(AnalyzerError::MissingCredential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_wins() {
        let (key, source) = resolve_from(Some("sk-env".to_string()), || {
            Ok(Some("sk-keychain".to_string()))
        })
        .unwrap();
        assert_eq!(key, "sk-env");
        assert_eq!(source, KeySource::Environment);
    }

    #[test]
    fn test_keychain_used_when_env_blank() {
        let (key, source) =
            resolve_from(Some("  ".to_string()), || Ok(Some("sk-keychain".to_string()))).unwrap();
        assert_eq!(key, "sk-keychain");
        assert_eq!(source, KeySource::Keychain);
    }

    #[test]
    fn test_missing_everywhere() {
        let err = resolve_from(None, || Ok(None)).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingCredential));

        let err = resolve_from(None, || Ok(Some(String::new()))).unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingCredential));
    }

    #[test]
    #[ignore = "needs a real platform keychain"]
    fn test_keychain_set_get_delete_round_trip() {
        set_api_key("sk-round-trip-123").unwrap();
        assert_eq!(
            get_stored_api_key().unwrap().as_deref(),
            Some("sk-round-trip-123")
        );
        delete_api_key().unwrap();
        assert_eq!(get_stored_api_key().unwrap(), None);
    }

    #[test]
    fn test_keychain_failure_surfaces() {
        let err = resolve_from(None, || Err("locked".to_string())).unwrap_err();
        assert!(matches!(err, AnalyzerError::Keychain(msg) if msg == "locked"));
    }
}
