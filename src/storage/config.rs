//! Configuration handling for dstasky
//!
//! Configuration is read from `~/.config/dstasky/config.toml` (or the
//! platform equivalent). `DSTASKY_CONFIG` points at a different file.
//! Command-line flags take precedence over everything stored here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::ColorChoice;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "DSTASKY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Default for `--color`
    pub color: Option<ColorChoice>,

    /// Log file that receives a copy of every log line
    pub log_file: Option<PathBuf>,

    /// Log debug messages
    pub verbose: bool,
}

impl Config {
    /// Location of the config file, if one can be determined
    pub fn path() -> Option<PathBuf> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => ProjectDirs::from("", "", "dstasky")
                .map(|dirs| dirs.config_dir().join("config.toml")),
        }
    }

    /// Loads the configuration, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.color, None);
        assert_eq!(config.log_file, None);
        assert!(!config.verbose);
    }

    #[test]
    fn parse_config() {
        let toml = r#"
color = "always"
log_file = "/tmp/dstasky.log"
verbose = true
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.color, Some(ColorChoice::Always));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/dstasky.log")));
        assert!(config.verbose);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "color = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
