//! RawSample - Sensor Driver output
//!
//! One forced-mode measurement plus the configuration the engine asked for.

use serde::{Deserialize, Serialize};

use crate::{SensorError, Timestamp};

/// Compensated readings of one capture
///
/// Produced once per scheduler tick, consumed once by the fusion engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Taken immediately after the field data read completed
    pub timestamp: Timestamp,

    /// Temperature (°C)
    pub temperature: f32,

    /// Pressure (Pa)
    pub pressure: f32,

    /// Relative humidity (%)
    pub humidity: f32,

    /// Gas sensor resistance (Ω)
    pub gas_resistance: f32,

    /// Sensor marked the gas conversion valid
    pub gas_valid: bool,

    /// Heater reached its target temperature
    pub heat_stable: bool,
}

/// Oversampling setting, register codes 0..=5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oversampling {
    /// Measurement disabled
    Skipped,
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    /// Decode a register code; codes above 5 mean x16 on the chip
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Skipped,
            1 => Self::X1,
            2 => Self::X2,
            3 => Self::X4,
            4 => Self::X8,
            _ => Self::X16,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 3,
            Self::X8 => 4,
            Self::X16 => 5,
        }
    }

    /// ADC conversion cycles this setting costs
    pub fn cycles(self) -> u32 {
        match self {
            Self::Skipped => 0,
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }
}

/// Sensor settings the engine requires for the next capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Gas heater target (°C)
    pub heater_temperature: u16,

    /// Gas heater on-time (ms)
    pub heater_duration: u16,

    /// Run the gas conversion
    pub run_gas: bool,

    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub humidity_oversampling: Oversampling,
}

impl Default for SensorConfig {
    /// Settings of the vendor's continuous IAQ profile
    fn default() -> Self {
        Self {
            heater_temperature: 320,
            heater_duration: 197,
            run_gas: true,
            temperature_oversampling: Oversampling::X2,
            pressure_oversampling: Oversampling::X1,
            humidity_oversampling: Oversampling::X1,
        }
    }
}

/// When the next capture must happen and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRequest {
    pub deadline: Timestamp,
    pub config: SensorConfig,
    /// `false`: the engine wants no measurement at this deadline
    pub trigger: bool,
}

/// Sensor driver seam
pub trait SensorDriver {
    /// Program `config`, run one measurement and return the sample
    fn capture(&mut self, config: &SensorConfig) -> Result<RawSample, SensorError>;
}

impl<D: SensorDriver + ?Sized> SensorDriver for Box<D> {
    fn capture(&mut self, config: &SensorConfig) -> Result<RawSample, SensorError> {
        (**self).capture(config)
    }
}
