//! MonitorConfig - Config Loader output
//!
//! Describes the complete monitor setup: bus wiring, engine mode, state
//! persistence, scheduler failure policy and the ambient logging/metrics knobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{SampleRate, SENSOR_ADDR_SECONDARY};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MonitorConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Bus wiring
    #[serde(default)]
    #[validate(nested)]
    pub bus: BusConfig,

    /// Fusion engine mode
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Calibration state persistence
    #[serde(default)]
    #[validate(nested)]
    pub state: StateConfig,

    /// Tick failure policy
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: SchedulerConfig,

    /// Diagnostic logging (stderr)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prometheus exporter
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Bus device and target address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BusConfig {
    /// Character device of the I2C adapter
    #[serde(default = "default_bus_device")]
    #[validate(length(min = 1))]
    pub device: String,

    /// 7-bit address of the sensor
    #[serde(default = "default_bus_address")]
    #[validate(range(min = 3, max = 119))]
    pub address: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: default_bus_device(),
            address: default_bus_address(),
        }
    }
}

fn default_bus_device() -> String {
    "/dev/i2c-1".to_string()
}

fn default_bus_address() -> u16 {
    SENSOR_ADDR_SECONDARY
}

/// Fusion engine operating mode
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Sampling mode
    #[serde(default)]
    pub sample_rate: SampleRate,

    /// Self-heating offset (°C) subtracted from the sensor temperature
    #[serde(default)]
    #[validate(range(min = -50.0, max = 50.0))]
    pub temperature_offset: f32,
}

/// Where and how often calibration state is saved
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StateConfig {
    /// State file path
    #[serde(default = "default_state_path")]
    pub path: PathBuf,

    /// Completed ticks between snapshots
    #[serde(default = "default_save_interval")]
    #[validate(range(min = 1))]
    pub save_interval: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
            save_interval: default_save_interval(),
        }
    }
}

fn default_state_path() -> PathBuf {
    PathBuf::from("bsec_state.dat")
}

fn default_save_interval() -> u64 {
    3600 // ~1 hour at 1 s cadence
}

/// Transient failure policy
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SchedulerConfig {
    /// Consecutive failed ticks tolerated before the monitor gives up
    #[serde(default = "default_max_consecutive_failures")]
    #[validate(range(min = 1))]
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

fn default_max_consecutive_failures() -> u32 {
    10
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics exporter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus listener port (0 = disabled)
    #[serde(default)]
    pub port: u16,
}

impl MetricsConfig {
    pub fn listener_port(&self) -> Option<u16> {
        (self.port != 0).then_some(self.port)
    }
}
