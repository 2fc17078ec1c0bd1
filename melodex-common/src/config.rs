//! Client configuration loading
//!
//! Resolution order, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`MELODEX_BASE_URL`, `MELODEX_TOKEN`)
//! 3. TOML config file (`--config`, `MELODEX_CONFIG`, or the platform default)
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_BASE_URL: &str = "MELODEX_BASE_URL";
pub const ENV_TOKEN: &str = "MELODEX_TOKEN";
pub const ENV_CONFIG: &str = "MELODEX_CONFIG";

/// Settings for talking to the catalog backend
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Backend root, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token attached to every request
    #[serde(default)]
    pub token: Option<String>,

    /// Fixed per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub config_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Resolve configuration from all sources
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match config_file_path(overrides.config_file.as_deref())? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            config.token = Some(token);
        }

        if let Some(url) = &overrides.base_url {
            config.base_url = url.clone();
        }
        if let Some(token) = &overrides.token {
            config.token = Some(token.clone());
        }

        config.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()
    }

    /// Check invariants and normalize the base URL
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https:// (got {:?})",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        self.base_url = trimmed;
        self.token = self.token.filter(|t| !t.trim().is_empty());
        Ok(self)
    }
}

/// Pick the TOML file to read, if any
///
/// An explicitly named file must exist; the platform default is optional.
fn config_file_path(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_arg {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return Ok(Some(PathBuf::from(path)));
    }

    Ok(default_config_path().filter(|p| p.exists()))
}

/// Platform config file location: `<config dir>/melodex/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("melodex").join("config.toml"))
}
