use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides both directories with `<root>/config` and `<root>/data`.
pub const HOME_ENV: &str = "MOXA_WIFI_ANALYZER_HOME";

const APP_DIR: &str = "moxa-wifi-analyzer";

/// Resolved locations of the analyzer's own files.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Holds preferences.json (e.g., ~/.config/moxa-wifi-analyzer/)
    pub config_dir: PathBuf,
    /// Holds the current device configuration and history database
    /// (e.g., ~/.local/share/moxa-wifi-analyzer/)
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve paths from `MOXA_WIFI_ANALYZER_HOME`, else the platform dirs.
    pub fn detect() -> Result<Self> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            debug!("Using {} override: {:?}", HOME_ENV, root);
            return Ok(Self::under(Path::new(&root)));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine the user config directory"))?
            .join(APP_DIR);
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine the user data directory"))?
            .join(APP_DIR);
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// All files below a single root directory.
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn preferences_file(&self) -> PathBuf {
        self.config_dir.join("preferences.json")
    }

    /// The configuration analyses run against when no file is given.
    pub fn device_config_file(&self) -> PathBuf {
        self.data_dir.join("device_config.json")
    }

    pub fn history_db(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_root_layout() {
        let paths = AppPaths::under(Path::new("/tmp/moxa"));
        assert_eq!(paths.preferences_file(), PathBuf::from("/tmp/moxa/config/preferences.json"));
        assert_eq!(paths.device_config_file(), PathBuf::from("/tmp/moxa/data/device_config.json"));
        assert_eq!(paths.history_db(), PathBuf::from("/tmp/moxa/data/history.db"));
    }
}
