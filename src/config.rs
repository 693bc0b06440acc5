//! Configuration management for resource-coverage

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::parsers::ParseMode;

/// Default number of files parsed concurrently
const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// File name looked up in the user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Import parser configuration
    pub parser: ParserConfig,
    /// Provider tree scan configuration
    pub scan: ScanConfig,
}

/// Import parser configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ParserConfig {
    /// "strict" or "lenient"
    pub mode: ParseMode,
}

/// Provider tree scan configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions to parse (without the dot)
    pub extensions: Vec<String>,
    /// Skip Go test files (`*_test.go`)
    pub skip_tests: bool,
    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
    /// Maximum number of files parsed at once
    pub max_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["go".to_string()],
            skip_tests: true,
            exclude_dirs: vec![
                "vendor".to_string(),
                ".git".to_string(),
                "testdata".to_string(),
            ],
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file \"{}\": {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file \"{}\": {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit config file if given, otherwise the user config
    /// file if it exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/resource-coverage/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("resource-coverage").join(CONFIG_FILE_NAME))
    }
}

impl ScanConfig {
    /// Normalized concurrency (never zero)
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
