use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What is remembered between runs: the last source that loaded successfully
/// and which of its columns was playing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub last_source_identity: Option<String>,
    #[serde(default)]
    pub selected_column: usize,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings could not be serialized: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No configuration directory is available on this platform.")]
    NoConfigDir,
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("loud-numbers").join("settings.json"))
    }

    /// Loads settings from the user config directory, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Loads settings from path. A missing file gives defaults; an unreadable
    /// or malformed one is logged and also gives defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!(target: "settings", "ignoring malformed settings {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!(target: "settings", "could not read settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The remembered source as a path
    pub fn source_path(&self) -> Option<PathBuf> {
        self.last_source_identity.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.source_path(), None);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            last_source_identity: Some("/data/rainfall.csv".into()),
            selected_column: 3,
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn absent_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "selected_column": 2 }"#).unwrap();
        assert_eq!(settings.last_source_identity, None);
        assert_eq!(settings.selected_column, 2);
    }
}
