use tracing::info;

use crate::settings::{AppPaths, Preferences};

pub fn get_preference(paths: &AppPaths, key: &str) -> Result<Option<String>, String> {
    info!("Getting preference: {}", key);
    let prefs = Preferences::open(&paths.preferences_file())?;
    Ok(prefs.get(key))
}

pub fn set_preference(paths: &AppPaths, key: &str, value: &str) -> Result<(), String> {
    info!("Setting preference: {} = {}", key, value);
    let mut prefs = Preferences::open(&paths.preferences_file())?;
    prefs.set(key, value)?;
    prefs.save()
}
