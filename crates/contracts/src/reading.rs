//! DerivedReading - Fusion Engine output

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Confidence the engine attaches to its air-quality outputs
///
/// Low-confidence readings are still emitted, never suppressed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// Stabilizing or run-in
    #[default]
    Unreliable,
    /// Calibration history is short
    Low,
    /// Calibration in progress
    Medium,
    High,
}

impl Accuracy {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Unreliable,
            1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }
}

/// One calibrated metric set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedReading {
    pub timestamp: Timestamp,

    /// Heat-compensated temperature (°C)
    pub temperature: f32,

    /// Heat-compensated relative humidity (%)
    pub humidity: f32,

    /// Pressure (Pa)
    pub pressure: f32,

    /// Sensor temperature before compensation (°C)
    pub raw_temperature: f32,

    /// Sensor humidity before compensation (%)
    pub raw_humidity: f32,

    /// Gas resistance (Ω)
    pub gas_resistance: f32,

    /// Indoor air-quality index (0..500)
    pub iaq: f32,

    pub accuracy: Accuracy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_iaq: Option<f32>,

    /// Equivalent CO2 (ppm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_equivalent: Option<f32>,

    /// Equivalent breath-VOC (ppm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breath_voc_equivalent: Option<f32>,
}
