//! FusionEngine trait - capability interface over the opaque algorithm
//!
//! The monitor relies on exactly these operations; the algorithm behind them
//! is vendor-supplied and never reimplemented here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    ConfigProfile, DerivedReading, EngineError, EngineState, RawSample, SampleRequest, Timestamp,
};

/// Engine sampling mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRate {
    /// One sample every 1 s
    #[default]
    Continuous,
    /// One sample every 3 s
    LowPower,
    /// One sample every 300 s
    UltraLowPower,
}

impl SampleRate {
    /// Nominal period between captures
    pub fn period(self) -> Duration {
        match self {
            Self::Continuous => Duration::from_secs(1),
            Self::LowPower => Duration::from_secs(3),
            Self::UltraLowPower => Duration::from_secs(300),
        }
    }

    /// Rate in Hz as the vendor library expects it
    pub fn hz(self) -> f32 {
        match self {
            Self::Continuous => 1.0,
            Self::LowPower => 1.0 / 3.0,
            Self::UltraLowPower => 1.0 / 300.0,
        }
    }
}

/// One-time engine initialisation parameters
#[derive(Debug, Clone, Default)]
pub struct EngineParams {
    pub profile: ConfigProfile,
    pub sample_rate: SampleRate,

    /// Self-heating offset subtracted from the sensor temperature (°C)
    pub temperature_offset: f32,
}

/// Fusion engine capability
pub trait FusionEngine {
    /// Human-readable engine/library version
    fn version(&self) -> String;

    /// Apply profile, mode and offset; must precede every other call
    fn init(&mut self, params: &EngineParams) -> Result<(), EngineError>;

    /// Seed calibration memory from a previously serialized state
    fn restore_state(&mut self, state: &EngineState) -> Result<(), EngineError>;

    /// When the next capture is due and which sensor settings it needs
    ///
    /// `now` is the caller's current time; the deadline is never earlier.
    fn next_required_sample(&mut self, now: Timestamp) -> Result<SampleRequest, EngineError>;

    /// Feed one sample, returning the readings completed by it (possibly none)
    ///
    /// Sample timestamps must strictly increase across calls.
    fn ingest(&mut self, sample: &RawSample) -> Result<Vec<DerivedReading>, EngineError>;

    /// Current calibration memory, callable at any tick boundary
    fn serialize_state(&mut self) -> Result<EngineState, EngineError>;
}

impl<E: FusionEngine + ?Sized> FusionEngine for Box<E> {
    fn version(&self) -> String {
        (**self).version()
    }

    fn init(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        (**self).init(params)
    }

    fn restore_state(&mut self, state: &EngineState) -> Result<(), EngineError> {
        (**self).restore_state(state)
    }

    fn next_required_sample(&mut self, now: Timestamp) -> Result<SampleRequest, EngineError> {
        (**self).next_required_sample(now)
    }

    fn ingest(&mut self, sample: &RawSample) -> Result<Vec<DerivedReading>, EngineError> {
        (**self).ingest(sample)
    }

    fn serialize_state(&mut self) -> Result<EngineState, EngineError> {
        (**self).serialize_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rate_periods() {
        assert_eq!(SampleRate::Continuous.period(), Duration::from_secs(1));
        assert_eq!(SampleRate::LowPower.period(), Duration::from_secs(3));
        assert_eq!(SampleRate::UltraLowPower.period(), Duration::from_secs(300));
        assert!((SampleRate::LowPower.hz() - 0.333_333).abs() < 1e-5);
    }
}
