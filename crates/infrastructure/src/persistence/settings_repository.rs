//! Executor settings persistence.
//!
//! Stores settings in the platform-specific config directory unless an
//! explicit file is given:
//! - Linux/macOS: ~/.config/relay/settings.json
//! - Windows: %APPDATA%/relay/settings.json

use std::path::{Path, PathBuf};

use relay_domain::ExecutorSettings;
use tokio::fs;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Could not determine config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Repository for executor settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsRepository {
    path: Option<PathBuf>,
}

impl SettingsRepository {
    /// Creates a repository at the default location.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Creates a repository reading and writing `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the default settings file path, if available.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("relay").join("settings.json"))
    }

    /// The file this repository uses, if one could be determined.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads settings from disk.
    ///
    /// Returns default settings if the file doesn't exist. Missing fields
    /// take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<ExecutorSettings, SettingsError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(ExecutorSettings::default());
        };

        if !fs::try_exists(path).await? {
            return Ok(ExecutorSettings::default());
        }

        let content = fs::read(path).await?;
        let settings = from_json_bytes(&content)?;
        Ok(settings)
    }

    /// Saves settings to disk, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no location or the file cannot be
    /// written.
    pub async fn save(&self, settings: &ExecutorSettings) -> Result<(), SettingsError> {
        let Some(path) = self.path.as_deref() else {
            return Err(SettingsError::NoConfigDir);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(settings)?;
        fs::write(path, content).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_settings_path_is_valid() {
        if let Some(p) = SettingsRepository::default_path() {
            assert!(p.ends_with("relay/settings.json"));
        }
    }

    #[tokio::test]
    async fn test_load_returns_default_when_no_file() {
        let dir = TempDir::new().expect("temp dir");
        let repo = SettingsRepository::at(dir.path().join("settings.json"));
        assert_eq!(repo.load().await.expect("load"), ExecutorSettings::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "timeout_ms": 500, "script": { "max_operations": 10 } }"#)
            .expect("write");

        let settings = SettingsRepository::at(&path).load().await.expect("load");

        assert_eq!(settings.timeout_ms, 500);
        assert_eq!(settings.script.max_operations, 10);
        assert_eq!(settings.user_agent, ExecutorSettings::default().user_agent);
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = TempDir::new().expect("temp dir");
        let repo = SettingsRepository::at(dir.path().join("nested").join("settings.json"));
        let settings = ExecutorSettings {
            history_limit: 5,
            ..ExecutorSettings::default()
        };

        repo.save(&settings).await.expect("save");

        assert_eq!(repo.load().await.expect("load"), settings);
    }

    #[tokio::test]
    async fn test_save_without_location_fails() {
        let repo = SettingsRepository { path: None };
        let result = repo.save(&ExecutorSettings::default()).await;
        assert!(matches!(result, Err(SettingsError::NoConfigDir)));
    }
}
