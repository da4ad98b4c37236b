//! Reading and writing the configuration file.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::app_config::AppConfig;

/// Errors raised while locating, reading, or writing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform config directory and no explicit path.
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The config could not be serialized.
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Owns the location of the config file.
#[derive(Debug, Clone)]
pub struct StorageManager {
    config_path: PathBuf,
}

impl StorageManager {
    /// Uses `path_override` when given, otherwise `config.toml` in the
    /// platform config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigDirNotFound` if there is no override and
    /// the platform directory cannot be determined.
    pub fn locate(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path_override {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_config_path().ok_or(ConfigError::ConfigDirNotFound)?,
        };
        Ok(Self::at(config_path))
    }

    /// Uses exactly this file.
    #[must_use]
    pub fn at(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Returns the config file path.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the config, writing defaults first if the file does not exist.
    ///
    /// A file that does not parse is left as is and defaults are returned.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or the defaults cannot
    /// be written.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.config_path.display(), "No config file, writing defaults");
                let config = AppConfig::default();
                self.save(&config)?;
                return Ok(config);
            }
            Err(e) => return Err(e.into()),
        };

        match toml::from_str::<AppConfig>(&content) {
            Ok(config) => {
                debug!(path = %self.config_path.display(), "Loaded config");
                Ok(config)
            }
            Err(e) => {
                warn!(path = %self.config_path.display(), error = %e, "Malformed config, using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    /// Writes the config atomically, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on serialization or filesystem failure.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let dir = self
            .config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let content = toml::to_string_pretty(config)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.persist(&self.config_path).map_err(|e| e.error)?;
        Ok(())
    }
}
