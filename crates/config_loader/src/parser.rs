//! Config parsing
//!
//! TOML (primary) and JSON (optional).

use std::path::Path;

use contracts::{ContractError, MonitorConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Format of a config file; no extension means TOML
    pub fn for_path(path: &Path) -> Option<Self> {
        match path.extension() {
            None => Some(Self::Toml),
            Some(ext) => Self::from_extension(ext.to_str()?),
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<MonitorConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<MonitorConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse config by format
pub fn parse(content: &str, format: ConfigFormat) -> Result<MonitorConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
