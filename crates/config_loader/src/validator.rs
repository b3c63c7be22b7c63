//! Config validation
//!
//! Rules:
//! - field ranges declared on the config types (`validator` derive)
//! - bus device is an absolute device path
//! - state path names a file
//! - log level directive is not empty

use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};
use contracts::{ContractError, MonitorConfig};

/// Validate MonitorConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &MonitorConfig) -> Result<(), ContractError> {
    validate_field_ranges(config)?;
    validate_bus_device(config)?;
    validate_state_path(config)?;
    validate_log_level(config)?;
    Ok(())
}

/// Check derive-declared ranges
fn validate_field_ranges(config: &MonitorConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("<config>".to_string(), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// Flatten nested validation errors into a dotted field path
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                if let Some(err) = list.first() {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} check failed", err.code));
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{index}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// Bus device must be an absolute path (e.g. /dev/i2c-1)
fn validate_bus_device(config: &MonitorConfig) -> Result<(), ContractError> {
    if !config.bus.device.starts_with('/') {
        return Err(ContractError::config_validation(
            "bus.device",
            format!("expected an absolute device path, got '{}'", config.bus.device),
        ));
    }
    Ok(())
}

/// State path must end in a file name
fn validate_state_path(config: &MonitorConfig) -> Result<(), ContractError> {
    if config.state.path.file_name().is_none() {
        return Err(ContractError::config_validation(
            "state.path",
            format!("'{}' does not name a file", config.state.path.display()),
        ));
    }
    Ok(())
}

/// Log level directive must not be blank
fn validate_log_level(config: &MonitorConfig) -> Result<(), ContractError> {
    if config.logging.level.trim().is_empty() {
        return Err(ContractError::config_validation(
            "logging.level",
            "log level must not be empty",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn field_of(err: ContractError) -> String {
        match err {
            ContractError::ConfigValidation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&MonitorConfig::default()).is_ok());
    }

    #[test]
    fn test_address_out_of_range() {
        let mut config = MonitorConfig::default();
        config.bus.address = 0x80;
        assert_eq!(field_of(validate(&config).unwrap_err()), "bus.address");
    }

    #[test]
    fn test_relative_bus_device() {
        let mut config = MonitorConfig::default();
        config.bus.device = "i2c-1".to_string();
        assert_eq!(field_of(validate(&config).unwrap_err()), "bus.device");
    }

    #[test]
    fn test_state_path_without_file_name() {
        let mut config = MonitorConfig::default();
        config.state.path = PathBuf::from("/var/lib/..");
        assert_eq!(field_of(validate(&config).unwrap_err()), "state.path");
    }

    #[test]
    fn test_temperature_offset_range() {
        let mut config = MonitorConfig::default();
        config.engine.temperature_offset = 120.0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "engine.temperature_offset"
        );
    }

    #[test]
    fn test_blank_log_level() {
        let mut config = MonitorConfig::default();
        config.logging.level = "  ".to_string();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.level");
    }
}
