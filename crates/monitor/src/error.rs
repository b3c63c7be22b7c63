//! Error types for the monitor process.

use contracts::{BusError, ContractError, EngineError, SensorError, Timestamp};
use thiserror::Error;

/// Process exit codes, one per fatal cause
pub mod exit_code {
    pub const BUS: u8 = 1;
    pub const SENSOR: u8 = 2;
    pub const ENGINE: u8 = 3;
    pub const CONFIG: u8 = 4;
    pub const FAILURE_RUN: u8 = 5;
    pub const LOGGING: u8 = 6;
}

/// Fatal errors; each maps to a distinct exit code
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Bus device could not be opened
    #[error("Failed to open bus {device}: {source}")]
    BusOpen {
        device: String,
        #[source]
        source: BusError,
    },

    /// Target address rejected by the bus
    #[error("Failed to select sensor address {address:#04x}: {source}")]
    BusTarget {
        address: u16,
        #[source]
        source: BusError,
    },

    /// Identity check, reset or calibration read failed
    #[error("Sensor initialization failed: {0}")]
    Sensor(#[source] SensorError),

    #[error("Fusion engine initialization failed: {0}")]
    Engine(#[source] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[source] ContractError),

    /// Too many ticks in a row failed
    #[error("{failures} consecutive ticks failed, last error: {last}")]
    FailureRunExceeded { failures: u32, last: TickError },

    #[error("Logging setup failed: {0}")]
    Logging(#[source] anyhow::Error),
}

impl MonitorError {
    pub fn bus_open(device: impl Into<String>, source: BusError) -> Self {
        Self::BusOpen {
            device: device.into(),
            source,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BusOpen { .. } | Self::BusTarget { .. } => exit_code::BUS,
            Self::Sensor(_) => exit_code::SENSOR,
            Self::Engine(_) => exit_code::ENGINE,
            Self::Config(_) => exit_code::CONFIG,
            Self::FailureRunExceeded { .. } => exit_code::FAILURE_RUN,
            Self::Logging(_) => exit_code::LOGGING,
        }
    }
}

/// Why a single tick was skipped
#[derive(Error, Debug)]
pub enum TickError {
    #[error("engine scheduling failed: {0}")]
    Schedule(#[source] EngineError),

    #[error("capture failed: {0}")]
    Capture(#[source] SensorError),

    /// Capture clock did not move forward; the sample is dropped unseen by the engine
    #[error("capture timestamp {current} does not follow {previous}")]
    NonMonotonic {
        previous: Timestamp,
        current: Timestamp,
    },

    #[error("ingest failed: {0}")]
    Ingest(#[source] EngineError),

    #[error("output failed: {0}")]
    Output(#[source] ContractError),
}

impl TickError {
    pub fn stage(&self) -> observability::TickFailure {
        use observability::TickFailure;

        match self {
            Self::Schedule(_) => TickFailure::Schedule,
            Self::Capture(_) | Self::NonMonotonic { .. } => TickFailure::Capture,
            Self::Ingest(_) => TickFailure::Ingest,
            Self::Output(_) => TickFailure::Output,
        }
    }
}
