//! Configuration handling for kvf
//!
//! Global configuration lives in `config.toml` under the platform config
//! directory (e.g. `~/.config/kvf/config.toml`). Command-line flags and
//! environment variables override it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lock::FileLock;

/// Directory name used under the system temp dir when no lock dir is set
const DEFAULT_LOCK_SUBDIR: &str = "kvf-locks";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory holding lock files
    pub lock_dir: Option<PathBuf>,

    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Effective configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
}

impl Config {
    /// Loads configuration from the default location
    pub fn load() -> Result<Self> {
        let global = match Self::global_config_path() {
            Some(path) => Self::load_from(&path)?,
            None => GlobalConfig::default(),
        };
        Ok(Self { global })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "oxio", "kvf").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Loads a config file, falling back to defaults when it is absent
    pub fn load_from(path: &Path) -> Result<GlobalConfig> {
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: GlobalConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")?;

        if config.lock_dir.as_ref().is_some_and(|dir| dir.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("lock_dir must not be empty".to_string()).into());
        }

        Ok(config)
    }

    /// Lock directory, preferring an explicit override
    pub fn lock_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.global.lock_dir.clone())
            .unwrap_or_else(default_lock_dir)
    }

    pub fn file_lock(&self, override_dir: Option<&Path>) -> FileLock {
        FileLock::new(self.lock_dir(override_dir))
    }
}

/// Lock directory used when nothing is configured
pub fn default_lock_dir() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOCK_SUBDIR)
}

impl Default for FileLock {
    fn default() -> Self {
        FileLock::new(default_lock_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config {
            global: GlobalConfig::default(),
        };

        assert_eq!(config.global.default_format, OutputFormat::Text);
        assert_eq!(config.lock_dir(None), default_lock_dir());
    }

    #[test]
    fn parse_global_config() {
        let toml = r#"
lock_dir = "/var/lock/kvf"
default_format = "json"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
        assert_eq!(config.lock_dir, Some(PathBuf::from("/var/lock/kvf")));
    }

    #[test]
    fn override_beats_config_file() {
        let config = Config {
            global: GlobalConfig {
                lock_dir: Some(PathBuf::from("/from/config")),
                ..Default::default()
            },
        };

        assert_eq!(config.lock_dir(None), PathBuf::from("/from/config"));
        assert_eq!(
            config.lock_dir(Some(Path::new("/from/flag"))),
            PathBuf::from("/from/flag")
        );
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn load_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_format = \"yaml\"").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn load_rejects_empty_lock_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "lock_dir = \"\"").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
