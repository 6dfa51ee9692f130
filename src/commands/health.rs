use serde::Serialize;
use tracing::info;

use super::history::with_history;
use crate::settings::credentials::{self, API_KEY_ENV};
use crate::settings::{AppPaths, Preferences};

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub config_dir: String,
    pub data_dir: String,
    pub preferences_readable: bool,
    pub device_config_stored: bool,
    /// False until the first analysis is recorded
    pub history_present: bool,
    pub history_accessible: bool,
    pub history_entries: usize,
    pub api_key_in_environment: bool,
    pub api_key_in_keychain: bool,
    pub model: String,
    pub endpoint: String,
}

pub async fn run_health_check(paths: &AppPaths) -> Result<HealthReport, String> {
    info!("Running health check");

    let prefs = Preferences::open(&paths.preferences_file());
    let preferences_readable = prefs.is_ok();
    let settings = prefs
        .map(|p| p.completion_settings())
        .unwrap_or_default();
    info!("Preferences readable: {}", preferences_readable);

    let device_config_stored = paths.device_config_file().exists();

    let history_present = paths.history_db().exists();
    let (history_accessible, history_entries) = if history_present {
        match with_history(paths.history_db(), |history| history.count()).await {
            Ok(count) => (true, count),
            Err(_) => (false, 0),
        }
    } else {
        (true, 0)
    };
    info!("History accessible: {} ({} entries)", history_accessible, history_entries);

    let api_key_in_environment = std::env::var(API_KEY_ENV).is_ok_and(|v| !v.trim().is_empty());
    let api_key_in_keychain = credentials::get_stored_api_key()
        .ok()
        .flatten()
        .is_some_and(|v| !v.trim().is_empty());
    info!(
        "API key in environment: {}, in keychain: {}",
        api_key_in_environment, api_key_in_keychain
    );

    Ok(HealthReport {
        config_dir: paths.config_dir.to_string_lossy().to_string(),
        data_dir: paths.data_dir.to_string_lossy().to_string(),
        preferences_readable,
        device_config_stored,
        history_present,
        history_accessible,
        history_entries,
        api_key_in_environment,
        api_key_in_keychain,
        model: settings.model,
        endpoint: settings.endpoint,
    })
}

impl HealthReport {
    pub fn api_key_available(&self) -> bool {
        self.api_key_in_environment || self.api_key_in_keychain
    }

    pub fn is_healthy(&self) -> bool {
        self.preferences_readable && self.history_accessible && self.api_key_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalize_response;
    use crate::device::DeviceConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_health_on_fresh_home() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::under(dir.path());

        let report = run_health_check(&paths).await.unwrap();
        assert!(report.preferences_readable);
        assert!(report.history_accessible);
        assert_eq!(report.history_entries, 0);
        assert!(!report.device_config_stored);
        assert!(!report.history_present);
        assert_eq!(report.model, "gpt-4");
        assert!(!paths.history_db().exists());
        assert!(!paths.data_dir.exists());
    }

    #[tokio::test]
    async fn test_health_counts_existing_history() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::under(dir.path());
        let result = normalize_response(r#"{"score": 90}"#, &DeviceConfig::new());
        with_history(paths.history_db(), move |h| h.record_analysis("ap.log", &result))
            .await
            .unwrap();

        let report = run_health_check(&paths).await.unwrap();
        assert!(report.history_present);
        assert!(report.history_accessible);
        assert_eq!(report.history_entries, 1);
    }

    #[tokio::test]
    async fn test_unreadable_history_reported() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::under(dir.path());
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        std::fs::write(paths.history_db(), "this is not a sqlite database").unwrap();

        let report = run_health_check(&paths).await.unwrap();
        assert!(report.history_present);
        assert!(!report.history_accessible);
    }

    #[tokio::test]
    async fn test_corrupt_preferences_reported() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::under(dir.path());
        std::fs::create_dir_all(&paths.config_dir).unwrap();
        std::fs::write(paths.preferences_file(), "[1, 2").unwrap();

        let report = run_health_check(&paths).await.unwrap();
        assert!(!report.preferences_readable);
        assert!(!report.is_healthy());
    }
}
