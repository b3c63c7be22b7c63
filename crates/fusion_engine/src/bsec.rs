//! Vendor BSEC library binding
//!
//! `libalgobsec` keeps its state in process globals, so at most one
//! [`BsecEngine`] may exist at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{
    Accuracy, DerivedReading, EngineError, EngineParams, EngineState, FusionEngine, Oversampling,
    RawSample, SampleRequest, SensorConfig, Timestamp,
};
use tracing::{instrument, warn};

mod ffi {
    #![allow(non_camel_case_types)]

    use std::os::raw::c_int;

    pub type bsec_library_return_t = c_int;

    pub const BSEC_MAX_PHYSICAL_SENSOR: usize = 8;
    pub const BSEC_NUMBER_OUTPUTS: usize = 14;
    pub const BSEC_MAX_WORKBUFFER_SIZE: usize = 2048;
    pub const BSEC_MAX_STATE_BLOB_SIZE: usize = 256;

    // physical inputs
    pub const BSEC_INPUT_PRESSURE: u8 = 1;
    pub const BSEC_INPUT_HUMIDITY: u8 = 4;
    pub const BSEC_INPUT_GASRESISTOR: u8 = 5;
    pub const BSEC_INPUT_TEMPERATURE: u8 = 6;
    pub const BSEC_INPUT_HEATSOURCE: u8 = 14;

    // virtual outputs
    pub const BSEC_OUTPUT_IAQ: u8 = 1;
    pub const BSEC_OUTPUT_STATIC_IAQ: u8 = 2;
    pub const BSEC_OUTPUT_CO2_EQUIVALENT: u8 = 3;
    pub const BSEC_OUTPUT_BREATH_VOC_EQUIVALENT: u8 = 4;
    pub const BSEC_OUTPUT_RAW_TEMPERATURE: u8 = 6;
    pub const BSEC_OUTPUT_RAW_PRESSURE: u8 = 7;
    pub const BSEC_OUTPUT_RAW_HUMIDITY: u8 = 8;
    pub const BSEC_OUTPUT_RAW_GAS: u8 = 9;
    pub const BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_TEMPERATURE: u8 = 14;
    pub const BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_HUMIDITY: u8 = 15;

    /// `process_data` bit for a physical input id
    pub const fn process_bit(input: u8) -> u32 {
        1 << (input - 1)
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct bsec_version_t {
        pub major: u8,
        pub minor: u8,
        pub major_bugfix: u8,
        pub minor_bugfix: u8,
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct bsec_sensor_configuration_t {
        pub sensor_id: u8,
        pub sample_rate: f32,
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct bsec_input_t {
        pub time_stamp: i64,
        pub signal: f32,
        pub signal_dimensions: u8,
        pub sensor_id: u8,
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct bsec_output_t {
        pub time_stamp: i64,
        pub signal: f32,
        pub signal_dimensions: u8,
        pub sensor_id: u8,
        pub accuracy: u8,
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct bsec_bme_settings_t {
        pub next_call: i64,
        pub process_data: u32,
        pub heater_temperature: u16,
        pub heating_duration: u16,
        pub run_gas: u8,
        pub pressure_oversampling: u8,
        pub temperature_oversampling: u8,
        pub humidity_oversampling: u8,
        pub trigger_measurement: u8,
    }

    extern "C" {
        pub fn bsec_get_version(version: *mut bsec_version_t) -> bsec_library_return_t;
        pub fn bsec_init() -> bsec_library_return_t;
        pub fn bsec_set_configuration(
            serialized_settings: *const u8,
            n_serialized_settings: u32,
            work_buffer: *mut u8,
            n_work_buffer_size: u32,
        ) -> bsec_library_return_t;
        pub fn bsec_set_state(
            serialized_state: *const u8,
            n_serialized_state: u32,
            work_buffer: *mut u8,
            n_work_buffer_size: u32,
        ) -> bsec_library_return_t;
        pub fn bsec_get_state(
            state_set_id: u8,
            serialized_state: *mut u8,
            n_serialized_state_max: u32,
            work_buffer: *mut u8,
            n_work_buffer: u32,
            n_serialized_state: *mut u32,
        ) -> bsec_library_return_t;
        pub fn bsec_update_subscription(
            requested_virtual_sensors: *const bsec_sensor_configuration_t,
            n_requested_virtual_sensors: u8,
            required_sensor_settings: *mut bsec_sensor_configuration_t,
            n_required_sensor_settings: *mut u8,
        ) -> bsec_library_return_t;
        pub fn bsec_sensor_control(
            time_stamp: i64,
            sensor_settings: *mut bsec_bme_settings_t,
        ) -> bsec_library_return_t;
        pub fn bsec_do_steps(
            inputs: *const bsec_input_t,
            n_inputs: u8,
            outputs: *mut bsec_output_t,
            n_outputs: *mut u8,
        ) -> bsec_library_return_t;
    }
}

use ffi::*;

/// Virtual sensors the monitor subscribes to
const SUBSCRIBED_OUTPUTS: [u8; 10] = [
    BSEC_OUTPUT_IAQ,
    BSEC_OUTPUT_STATIC_IAQ,
    BSEC_OUTPUT_CO2_EQUIVALENT,
    BSEC_OUTPUT_BREATH_VOC_EQUIVALENT,
    BSEC_OUTPUT_RAW_TEMPERATURE,
    BSEC_OUTPUT_RAW_PRESSURE,
    BSEC_OUTPUT_RAW_HUMIDITY,
    BSEC_OUTPUT_RAW_GAS,
    BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_TEMPERATURE,
    BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_HUMIDITY,
];

static IN_USE: AtomicBool = AtomicBool::new(false);

// saved images must load back through the file store's size limit
const _: () = assert!(BSEC_MAX_STATE_BLOB_SIZE <= EngineState::MAX_LEN);

/// Negative codes are errors, positive ones warnings
fn check(code: bsec_library_return_t, operation: &'static str) -> Result<(), EngineError> {
    if code < 0 {
        return Err(EngineError::Library { operation, code });
    }
    if code > 0 {
        warn!(operation, code, "BSEC warning");
    }
    Ok(())
}

fn check_init(code: bsec_library_return_t, step: &'static str) -> Result<(), EngineError> {
    check(code, step).map_err(|_| EngineError::Init { step, code })
}

/// Fusion engine backed by `libalgobsec`
pub struct BsecEngine {
    initialized: bool,
    temperature_offset: f32,
    next_call: Option<Timestamp>,
    process_data: u32,
    last_ingest: Option<Timestamp>,
    work_buffer: Box<[u8; BSEC_MAX_WORKBUFFER_SIZE]>,
}

impl BsecEngine {
    /// Claim the process-wide library instance
    pub fn new() -> Result<Self, EngineError> {
        if IN_USE.swap(true, Ordering::AcqRel) {
            return Err(EngineError::Init {
                step: "claim library",
                code: -1,
            });
        }
        Ok(Self {
            initialized: false,
            temperature_offset: 0.0,
            next_call: None,
            process_data: 0,
            last_ingest: None,
            work_buffer: Box::new([0u8; BSEC_MAX_WORKBUFFER_SIZE]),
        })
    }

    fn ensure_initialized(&self) -> Result<(), EngineError> {
        if self.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn subscribe(&mut self, sample_rate: f32) -> Result<(), EngineError> {
        let requested = SUBSCRIBED_OUTPUTS.map(|sensor_id| bsec_sensor_configuration_t {
            sensor_id,
            sample_rate,
        });
        let mut required = [bsec_sensor_configuration_t::default(); BSEC_MAX_PHYSICAL_SENSOR];
        let mut n_required = BSEC_MAX_PHYSICAL_SENSOR as u8;

        // SAFETY: both arrays outlive the call and their lengths are passed alongside
        let code = unsafe {
            bsec_update_subscription(
                requested.as_ptr(),
                requested.len() as u8,
                required.as_mut_ptr(),
                &mut n_required,
            )
        };
        check_init(code, "bsec_update_subscription")
    }

    fn inputs_for(&self, sample: &RawSample) -> Vec<bsec_input_t> {
        let time_stamp = sample.timestamp.as_nanos();
        let wanted = |input: u8| self.process_data & process_bit(input) != 0;
        let input = |sensor_id: u8, signal: f32| bsec_input_t {
            time_stamp,
            signal,
            signal_dimensions: 1,
            sensor_id,
        };

        let mut inputs = Vec::with_capacity(BSEC_MAX_PHYSICAL_SENSOR);
        if wanted(BSEC_INPUT_PRESSURE) {
            inputs.push(input(BSEC_INPUT_PRESSURE, sample.pressure));
        }
        if wanted(BSEC_INPUT_TEMPERATURE) {
            inputs.push(input(BSEC_INPUT_HEATSOURCE, self.temperature_offset));
            inputs.push(input(BSEC_INPUT_TEMPERATURE, sample.temperature));
        }
        if wanted(BSEC_INPUT_HUMIDITY) {
            inputs.push(input(BSEC_INPUT_HUMIDITY, sample.humidity));
        }
        if wanted(BSEC_INPUT_GASRESISTOR) && sample.gas_valid {
            inputs.push(input(BSEC_INPUT_GASRESISTOR, sample.gas_resistance));
        }
        inputs
    }
}

impl Drop for BsecEngine {
    fn drop(&mut self) {
        IN_USE.store(false, Ordering::Release);
    }
}

fn sample_request(deadline: Timestamp, settings: &bsec_bme_settings_t) -> SampleRequest {
    SampleRequest {
        deadline,
        config: sensor_config(settings),
        trigger: settings.trigger_measurement != 0,
    }
}

/// Requested sensor settings as the driver understands them
fn sensor_config(settings: &bsec_bme_settings_t) -> SensorConfig {
    SensorConfig {
        heater_temperature: settings.heater_temperature,
        heater_duration: settings.heating_duration,
        run_gas: settings.run_gas != 0,
        temperature_oversampling: Oversampling::from_code(settings.temperature_oversampling),
        pressure_oversampling: Oversampling::from_code(settings.pressure_oversampling),
        humidity_oversampling: Oversampling::from_code(settings.humidity_oversampling),
    }
}

/// Fold one `bsec_do_steps` result into a reading
fn reading_from_outputs(sample: &RawSample, outputs: &[bsec_output_t]) -> DerivedReading {
    let mut reading = DerivedReading {
        timestamp: sample.timestamp,
        temperature: sample.temperature,
        humidity: sample.humidity,
        pressure: sample.pressure,
        raw_temperature: sample.temperature,
        raw_humidity: sample.humidity,
        gas_resistance: sample.gas_resistance,
        iaq: 0.0,
        accuracy: Accuracy::Unreliable,
        static_iaq: None,
        co2_equivalent: None,
        breath_voc_equivalent: None,
    };

    for output in outputs {
        match output.sensor_id {
            BSEC_OUTPUT_IAQ => {
                reading.iaq = output.signal;
                reading.accuracy = Accuracy::from_level(output.accuracy);
            }
            BSEC_OUTPUT_STATIC_IAQ => reading.static_iaq = Some(output.signal),
            BSEC_OUTPUT_CO2_EQUIVALENT => reading.co2_equivalent = Some(output.signal),
            BSEC_OUTPUT_BREATH_VOC_EQUIVALENT => {
                reading.breath_voc_equivalent = Some(output.signal)
            }
            BSEC_OUTPUT_RAW_TEMPERATURE => reading.raw_temperature = output.signal,
            BSEC_OUTPUT_RAW_PRESSURE => reading.pressure = output.signal,
            BSEC_OUTPUT_RAW_HUMIDITY => reading.raw_humidity = output.signal,
            BSEC_OUTPUT_RAW_GAS => reading.gas_resistance = output.signal,
            BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_TEMPERATURE => reading.temperature = output.signal,
            BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_HUMIDITY => reading.humidity = output.signal,
            _ => {}
        }
    }
    reading
}

impl FusionEngine for BsecEngine {
    fn version(&self) -> String {
        let mut version = bsec_version_t::default();
        // SAFETY: plain out-parameter
        let code = unsafe { bsec_get_version(&mut version) };
        if code < 0 {
            return "BSEC (unknown version)".to_string();
        }
        format!(
            "BSEC {}.{}.{}.{}",
            version.major, version.minor, version.major_bugfix, version.minor_bugfix
        )
    }

    fn init(&mut self, params: &EngineParams) -> Result<(), EngineError> {
        // SAFETY: no arguments
        check_init(unsafe { bsec_init() }, "bsec_init")?;

        if !params.profile.is_empty() {
            let profile = params.profile.as_bytes();
            // SAFETY: profile and work buffer are valid for the lengths passed
            let code = unsafe {
                bsec_set_configuration(
                    profile.as_ptr(),
                    profile.len() as u32,
                    self.work_buffer.as_mut_ptr(),
                    self.work_buffer.len() as u32,
                )
            };
            check_init(code, "bsec_set_configuration")?;
        }

        self.subscribe(params.sample_rate.hz())?;
        self.temperature_offset = params.temperature_offset;
        self.next_call = None;
        self.last_ingest = None;
        self.initialized = true;
        Ok(())
    }

    fn restore_state(&mut self, state: &EngineState) -> Result<(), EngineError> {
        self.ensure_initialized()?;
        let blob = state.as_bytes();
        // SAFETY: state and work buffer are valid for the lengths passed
        let code = unsafe {
            bsec_set_state(
                blob.as_ptr(),
                blob.len() as u32,
                self.work_buffer.as_mut_ptr(),
                self.work_buffer.len() as u32,
            )
        };
        if code < 0 {
            return Err(EngineError::rejected_state(
                blob.len(),
                format!("bsec_set_state returned {code}"),
            ));
        }
        check(code, "bsec_set_state")
    }

    fn next_required_sample(&mut self, now: Timestamp) -> Result<SampleRequest, EngineError> {
        self.ensure_initialized()?;
        let deadline = self.next_call.map_or(now, |due| due.max(now));

        let mut settings = bsec_bme_settings_t::default();
        // SAFETY: plain out-parameter
        let code = unsafe { bsec_sensor_control(deadline.as_nanos(), &mut settings) };
        check(code, "bsec_sensor_control")?;

        self.next_call = Some(Timestamp::from_nanos(settings.next_call));
        self.process_data = settings.process_data;
        Ok(sample_request(deadline, &settings))
    }

    #[instrument(skip_all, fields(timestamp = %sample.timestamp))]
    fn ingest(&mut self, sample: &RawSample) -> Result<Vec<DerivedReading>, EngineError> {
        self.ensure_initialized()?;
        if let Some(previous) = self.last_ingest {
            if sample.timestamp <= previous {
                return Err(EngineError::NonMonotonicTimestamp {
                    previous,
                    current: sample.timestamp,
                });
            }
        }
        self.last_ingest = Some(sample.timestamp);

        let inputs = self.inputs_for(sample);
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut outputs = [bsec_output_t::default(); BSEC_NUMBER_OUTPUTS];
        let mut n_outputs = BSEC_NUMBER_OUTPUTS as u8;
        // SAFETY: buffers outlive the call; n_outputs carries the output capacity in
        let code = unsafe {
            bsec_do_steps(
                inputs.as_ptr(),
                inputs.len() as u8,
                outputs.as_mut_ptr(),
                &mut n_outputs,
            )
        };
        check(code, "bsec_do_steps")?;

        let produced = usize::from(n_outputs).min(outputs.len());
        if produced == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![reading_from_outputs(sample, &outputs[..produced])])
    }

    fn serialize_state(&mut self) -> Result<EngineState, EngineError> {
        self.ensure_initialized()?;
        let mut blob = vec![0u8; BSEC_MAX_STATE_BLOB_SIZE];
        let mut len: u32 = 0;
        // SAFETY: both buffers are valid for the lengths passed; len is an out-parameter
        let code = unsafe {
            bsec_get_state(
                0,
                blob.as_mut_ptr(),
                blob.len() as u32,
                self.work_buffer.as_mut_ptr(),
                self.work_buffer.len() as u32,
                &mut len,
            )
        };
        check(code, "bsec_get_state")?;
        blob.truncate(len as usize);
        Ok(EngineState::from(blob))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawSample {
        RawSample {
            timestamp: Timestamp::from_nanos(5_000),
            temperature: 25.0,
            pressure: 100_000.0,
            humidity: 40.0,
            gas_resistance: 90_000.0,
            gas_valid: true,
            heat_stable: true,
        }
    }

    #[test]
    fn test_process_bits() {
        assert_eq!(process_bit(BSEC_INPUT_PRESSURE), 0x01);
        assert_eq!(process_bit(BSEC_INPUT_TEMPERATURE), 0x20);
    }

    #[test]
    fn test_sensor_config_from_settings() {
        let settings = bsec_bme_settings_t {
            heater_temperature: 320,
            heating_duration: 197,
            run_gas: 1,
            temperature_oversampling: 2,
            pressure_oversampling: 1,
            humidity_oversampling: 1,
            ..Default::default()
        };
        assert_eq!(sensor_config(&settings), SensorConfig::default());
    }

    #[test]
    fn test_trigger_flag_passes_through() {
        let deadline = Timestamp::from_nanos(3_000_000_000);
        let mut settings = bsec_bme_settings_t {
            trigger_measurement: 1,
            ..Default::default()
        };
        assert!(sample_request(deadline, &settings).trigger);

        settings.trigger_measurement = 0;
        let request = sample_request(deadline, &settings);
        assert!(!request.trigger);
        assert_eq!(request.deadline, deadline);
    }

    #[test]
    fn test_reading_from_outputs() {
        let out = |sensor_id, signal, accuracy| bsec_output_t {
            sensor_id,
            signal,
            accuracy,
            ..Default::default()
        };
        let reading = reading_from_outputs(
            &sample(),
            &[
                out(BSEC_OUTPUT_IAQ, 42.7, 2),
                out(BSEC_OUTPUT_SENSOR_HEAT_COMPENSATED_TEMPERATURE, 23.9, 0),
                out(BSEC_OUTPUT_CO2_EQUIVALENT, 612.0, 2),
            ],
        );
        assert_eq!(reading.iaq, 42.7);
        assert_eq!(reading.accuracy, Accuracy::Medium);
        assert_eq!(reading.temperature, 23.9);
        assert_eq!(reading.raw_temperature, 25.0);
        assert_eq!(reading.co2_equivalent, Some(612.0));
        assert_eq!(reading.breath_voc_equivalent, None);
    }
}
