//! Layered error definitions
//!
//! `ContractError` covers config, persistence and sink failures. Bus, sensor
//! and engine failures have their own enums, since startup maps each to a
//! distinct exit code.

use thiserror::Error;

use crate::Timestamp;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Persistence Errors =====
    /// State store read/write error
    #[error("state store '{path}': {message}")]
    Persistence { path: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create persistence error
    pub fn persistence(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

/// Register bus errors
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus device could not be opened
    #[error("failed to open bus '{device}': {message}")]
    Open { device: String, message: String },

    /// Target address outside the 7-bit range
    #[error("invalid target address 0x{address:02x}")]
    InvalidAddress { address: u16 },

    /// A transfer was attempted before `set_target`
    #[error("no target address set")]
    NoTarget,

    /// Register write failed
    #[error("write to register 0x{register:02x} failed: {message}")]
    Write { register: u8, message: String },

    /// Register read failed
    #[error("read of {len} byte(s) from register 0x{register:02x} failed: {message}")]
    Read {
        register: u8,
        len: usize,
        message: String,
    },

    /// Payload exceeds the transfer buffer
    #[error("write of {len} byte(s) exceeds the {max}-byte transfer limit")]
    TooLong { len: usize, max: usize },
}

impl BusError {
    /// Create bus open error
    pub fn open(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create register write error
    pub fn write(register: u8, message: impl Into<String>) -> Self {
        Self::Write {
            register,
            message: message.into(),
        }
    }

    /// Create register read error
    pub fn read(register: u8, len: usize, message: impl Into<String>) -> Self {
        Self::Read {
            register,
            len,
            message: message.into(),
        }
    }
}

/// Sensor driver errors
#[derive(Debug, Error)]
pub enum SensorError {
    /// The chip at the target address is not the expected sensor
    #[error("unexpected chip id 0x{found:02x} (expected 0x{expected:02x})")]
    Identity { expected: u8, found: u8 },

    /// Underlying transfer failed
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The measurement never reported new data
    #[error("no new data after {attempts} poll(s)")]
    NoNewData { attempts: u32 },

    /// Requested configuration cannot be programmed
    #[error("invalid sensor config: {message}")]
    InvalidConfig { message: String },
}

impl SensorError {
    /// Whether the error came from a failed bus transfer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Bus(_))
    }
}

/// Fusion engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine-internal failure during initialisation
    #[error("engine init failed during {step}: code {code}")]
    Init { step: &'static str, code: i32 },

    /// A library call failed after initialisation
    #[error("engine call '{operation}' failed: code {code}")]
    Library { operation: &'static str, code: i32 },

    /// Engine used before `init`
    #[error("engine not initialized")]
    NotInitialized,

    /// Persisted state was not accepted
    #[error("engine rejected state blob ({len} bytes): {message}")]
    RejectedState { len: usize, message: String },

    /// Ingest out of timestamp order
    #[error("non-increasing sample timestamp {current} (previous {previous})")]
    NonMonotonicTimestamp {
        previous: Timestamp,
        current: Timestamp,
    },
}

impl EngineError {
    /// Create rejected state error
    pub fn rejected_state(len: usize, message: impl Into<String>) -> Self {
        Self::RejectedState {
            len,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_names_its_origin() {
        let err = ContractError::persistence("/var/lib/iaq/bsec_state.dat", "disk full");
        assert_eq!(
            err.to_string(),
            "state store '/var/lib/iaq/bsec_state.dat': disk full"
        );
        let err = ContractError::sink_write("stdout", "broken pipe");
        assert_eq!(err.to_string(), "sink 'stdout' write error: broken pipe");
    }

    #[test]
    fn test_bus_error_wraps_into_sensor_error() {
        let err: SensorError = BusError::write(0x74, "remote I/O error").into();
        assert!(matches!(err, SensorError::Bus(BusError::Write { register: 0x74, .. })));
        assert_eq!(
            err.to_string(),
            "bus error: write to register 0x74 failed: remote I/O error"
        );
    }

    #[test]
    fn test_sensor_error_transport_classification() {
        let bus = SensorError::from(BusError::read(0x1d, 15, "nack"));
        assert!(bus.is_transport());
        assert!(!SensorError::NoNewData { attempts: 5 }.is_transport());
    }
}
