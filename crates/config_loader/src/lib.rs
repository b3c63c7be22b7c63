//! # Config Loader
//!
//! Finds, reads and validates the monitor configuration.
//!
//! The file is named by `IAQ_MONITOR_CONFIG` and defaults to
//! `iaq-monitor.toml` in the working directory. A missing file means the
//! built-in defaults. A file that exists must parse and validate. `.json`
//! files are read as JSON; `.toml` files and files without an extension as TOML.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//!
//! let loaded = ConfigLoader::from_env().load().unwrap();
//! println!("Bus: {} ({})", loaded.config.bus.device, loaded.source);
//! ```

mod parser;
mod validator;

pub use contracts::MonitorConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "IAQ_MONITOR_CONFIG";

/// Path used when `IAQ_MONITOR_CONFIG` is unset or empty
pub const DEFAULT_CONFIG_PATH: &str = "iaq-monitor.toml";

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at this path; built-in defaults
    Defaults(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults(path) => write!(f, "defaults ({} not found)", path.display()),
        }
    }
}

/// A validated configuration and its origin
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: MonitorConfig,
    pub source: ConfigSource,
}

/// Configuration file locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Loader for an explicit file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loader for the file named by `IAQ_MONITOR_CONFIG`
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var_os(CONFIG_ENV))
    }

    fn from_env_value(value: Option<OsString>) -> Self {
        let path = value
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the file, or fall back to defaults when it is absent
    ///
    /// # Errors
    /// - Unreadable file
    /// - Unsupported extension
    /// - Parse or validation failure
    pub fn load(&self) -> Result<LoadedConfig, ContractError> {
        if !self.path.exists() {
            return Ok(LoadedConfig {
                config: MonitorConfig::default(),
                source: ConfigSource::Defaults(self.path.clone()),
            });
        }

        let format = ConfigFormat::for_path(&self.path).ok_or_else(|| {
            ContractError::config_parse(format!(
                "unsupported config format: {}",
                self.path.display()
            ))
        })?;
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ContractError::ConfigParse {
                message: format!("cannot read {}: {e}", self.path.display()),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(LoadedConfig {
            config: parse(&content, format)?,
            source: ConfigSource::File(self.path.clone()),
        })
    }
}

/// Parse and validate configuration text
pub fn parse(content: &str, format: ConfigFormat) -> Result<MonitorConfig, ContractError> {
    let config = parser::parse(content, format)?;
    validator::validate(&config)?;
    Ok(config)
}

/// Render a configuration as TOML, the format the monitor reads by default
pub fn to_toml(config: &MonitorConfig) -> Result<String, ContractError> {
    toml::to_string_pretty(config)
        .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
}
