//! Pass-through engine for bring-up and tests
//!
//! Follows the sampling cadence of the configured rate and forwards the
//! compensated sensor values. The air-quality outputs are placeholders whose
//! accuracy climbs with the number of samples seen, so calibration state
//! survives restarts the same way the vendor engine's does.

use bytes::{Buf, BufMut, BytesMut};
use contracts::{
    Accuracy, DerivedReading, EngineError, EngineParams, EngineState, FusionEngine, RawSample,
    SampleRequest, SensorConfig, Timestamp,
};
use tracing::{debug, instrument};

const STATE_MAGIC: &[u8; 4] = b"SIM\x01";
const STATE_LEN: usize = 4 + 8; // magic + sample counter

/// Placeholder air-quality outputs
const IAQ: f32 = 25.0;
const CO2_EQUIVALENT: f32 = 500.0;
const BREATH_VOC_EQUIVALENT: f32 = 0.5;

/// Samples after which accuracy reaches Low, Medium and High
const ACCURACY_STEPS: [u64; 3] = [300, 1_800, 14_400];

/// Deterministic stand-in for the vendor fusion engine
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    params: Option<EngineParams>,
    next_call: Option<Timestamp>,
    last_ingest: Option<Timestamp>,
    samples: u64,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples ingested over the engine's whole (persisted) history
    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn params(&self) -> Result<&EngineParams, EngineError> {
        self.params.as_ref().ok_or(EngineError::NotInitialized)
    }

    fn accuracy(&self) -> Accuracy {
        let level = ACCURACY_STEPS
            .iter()
            .filter(|step| self.samples >= **step)
            .count();
        Accuracy::from_level(level as u8)
    }
}

impl FusionEngine for SimulatedEngine {
    fn version(&self) -> String {
        format!("simulated {}", env!("CARGO_PKG_VERSION"))
    }

    fn init(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        debug!(
            profile_len = params.profile.len(),
            sample_rate = ?params.sample_rate,
            temperature_offset = params.temperature_offset,
            "simulated engine initialized"
        );
        self.params = Some(params.clone());
        self.next_call = None;
        self.last_ingest = None;
        Ok(())
    }

    fn restore_state(&mut self, state: &EngineState) -> Result<(), EngineError> {
        self.params()?;
        let bytes = state.as_bytes();
        if bytes.len() != STATE_LEN || !bytes.starts_with(STATE_MAGIC) {
            return Err(EngineError::rejected_state(
                bytes.len(),
                "not a simulated engine state",
            ));
        }
        let mut counter = &bytes[STATE_MAGIC.len()..];
        self.samples = counter.get_u64_le();
        Ok(())
    }

    fn next_required_sample(&mut self, now: Timestamp) -> Result<SampleRequest, EngineError> {
        let period = self.params()?.sample_rate.period();
        let deadline = self.next_call.map_or(now, |due| due.max(now));
        self.next_call = Some(deadline + period);
        Ok(SampleRequest {
            deadline,
            config: SensorConfig::default(),
            trigger: true,
        })
    }

    #[instrument(skip_all, fields(timestamp = %sample.timestamp))]
    fn ingest(&mut self, sample: &RawSample) -> Result<Vec<DerivedReading>, EngineError> {
        let offset = self.params()?.temperature_offset;
        if let Some(previous) = self.last_ingest {
            if sample.timestamp <= previous {
                return Err(EngineError::NonMonotonicTimestamp {
                    previous,
                    current: sample.timestamp,
                });
            }
        }
        self.last_ingest = Some(sample.timestamp);
        self.samples += 1;

        Ok(vec![DerivedReading {
            timestamp: sample.timestamp,
            temperature: sample.temperature - offset,
            humidity: sample.humidity,
            pressure: sample.pressure,
            raw_temperature: sample.temperature,
            raw_humidity: sample.humidity,
            gas_resistance: sample.gas_resistance,
            iaq: IAQ,
            accuracy: self.accuracy(),
            static_iaq: Some(IAQ),
            co2_equivalent: Some(CO2_EQUIVALENT),
            breath_voc_equivalent: Some(BREATH_VOC_EQUIVALENT),
        }])
    }

    fn serialize_state(&mut self) -> Result<EngineState, EngineError> {
        self.params()?;
        let mut buf = BytesMut::with_capacity(STATE_LEN);
        buf.put_slice(STATE_MAGIC);
        buf.put_u64_le(self.samples);
        Ok(EngineState::from(buf.freeze()))
    }
}
