//! Configuration manager for loading and saving settings
//!
//! Settings live in `<config dir>/hapticbind/keybindings.json` and are written
//! atomically (temp file in the same directory, then rename) to prevent
//! corruption.

use crate::config::models::Settings;
use crate::error::{HapticError, Result, StringError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name under the platform config dir
const APP_DIR_NAME: &str = "hapticbind";

/// Settings file name
const SETTINGS_FILE_NAME: &str = "keybindings.json";

/// Configuration manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the application's config directory
    ///
    /// Returns `<platform config dir>/hapticbind`, or `./hapticbind` when the
    /// platform has no config dir.
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// Get the path to the settings file
    pub fn get_config_path() -> PathBuf {
        Self::get_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Load settings from the default location
    pub fn load() -> Result<Settings> {
        Self::load_from(&Self::get_config_path())
    }

    /// Load settings from `path`
    ///
    /// A missing or corrupt file yields default settings; only read errors
    /// other than "not found" are reported.
    pub fn load_from(path: &Path) -> Result<Settings> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Settings file not found at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Settings>(&json) {
            Ok(settings) => {
                info!("Settings loaded from {}", path.display());
                Ok(settings.sanitized())
            }
            Err(e) => {
                warn!("Failed to parse settings, using defaults: {}", e);
                Ok(Settings::default())
            }
        }
    }

    /// Save settings to `path` with an atomic write
    pub fn save_to(settings: &Settings, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(settings)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| {
            HapticError::ConfigError(StringError::new(format!(
                "Failed to replace {}: {}",
                path.display(),
                e.error
            )))
        })?;

        debug!("Settings written to {}", path.display());
        info!("Settings saved successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_dir;

    #[test]
    fn test_config_path() {
        let path = ConfigManager::get_config_path();
        assert!(path.to_string_lossy().contains("hapticbind"));
        assert!(path.to_string_lossy().ends_with("keybindings.json"));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = create_test_dir();
        let settings = ConfigManager::load_from(&dir.path().join("missing.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_corrupt_file_returns_defaults() {
        let dir = create_test_dir();
        let path = dir.path().join("keybindings.json");
        std::fs::write(&path, "{ this is not json").unwrap();

        let settings = ConfigManager::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = create_test_dir();
        let path = dir.path().join("nested").join("keybindings.json");

        let settings = Settings {
            vibration_key: "middle".to_string(),
            intensity_increase_key: "page up".to_string(),
            intensity_decrease_key: "page down".to_string(),
            vibration_intensity: 0.35,
            ..Settings::default()
        };
        ConfigManager::save_to(&settings, &path).unwrap();

        let loaded = ConfigManager::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = create_test_dir();
        let path = dir.path().join("keybindings.json");

        ConfigManager::save_to(&Settings::default(), &path).unwrap();
        ConfigManager::save_to(&Settings::default(), &path).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("keybindings.json")]);
    }

    #[test]
    fn test_load_sanitizes_values() {
        let dir = create_test_dir();
        let path = dir.path().join("keybindings.json");
        std::fs::write(
            &path,
            r#"{"vibration_key": "???", "vibration_intensity": 7.0}"#,
        )
        .unwrap();

        let settings = ConfigManager::load_from(&path).unwrap();
        assert_eq!(settings.vibration_key, "space");
        assert!((settings.vibration_intensity - 1.0).abs() < f64::EPSILON);
    }
}
