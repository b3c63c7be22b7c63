//! BME680 forced-mode driver

use contracts::{
    BusTransport, Clock, Oversampling, RawSample, SensorConfig, SensorDriver, SensorError,
    Timestamp,
};
use embedded_hal::delay::DelayNs;
use tracing::{debug, info, instrument, trace};

use crate::calc::{self, Calibration};
use crate::regs;

/// Settle time after a soft reset
const RESET_DELAY_MS: u32 = 10;

/// New-data polling after the nominal measurement time
const POLL_ATTEMPTS: u32 = 5;
const POLL_PERIOD_MS: u32 = 10;

/// Driver for one BME680 behind an already-targeted transport
///
/// Owns the transport for its whole lifetime.
pub struct Bme680<T, D, C> {
    bus: T,
    delay: D,
    clock: C,
    calibration: Calibration,
}

impl<T, D, C> Bme680<T, D, C>
where
    T: BusTransport,
    D: DelayNs,
    C: Clock,
{
    /// Verify the chip identity, soft-reset it and read its calibration
    ///
    /// # Errors
    /// - `SensorError::Identity` when the chip id is not 0x61
    /// - `SensorError::Bus` when any transfer fails
    pub fn init(bus: T, delay: D, clock: C) -> Result<Self, SensorError> {
        let mut driver = Self {
            bus,
            delay,
            clock,
            calibration: Calibration::default(),
        };

        driver.check_identity()?;
        driver.soft_reset()?;
        driver.calibration = driver.read_calibration()?;

        info!("BME680 initialized");
        Ok(driver)
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.bus.read(register, &mut buf)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.bus.write(register, &[value])?;
        Ok(())
    }

    fn check_identity(&mut self) -> Result<(), SensorError> {
        let found = self.read_byte(regs::CHIP_ID)?;
        if found != regs::CHIP_ID_BME680 {
            return Err(SensorError::Identity {
                expected: regs::CHIP_ID_BME680,
                found,
            });
        }
        Ok(())
    }

    fn soft_reset(&mut self) -> Result<(), SensorError> {
        self.write_byte(regs::SOFT_RESET, regs::SOFT_RESET_CMD)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    fn read_calibration(&mut self) -> Result<Calibration, SensorError> {
        let mut coeff = [0u8; regs::CALIB_0_LEN + regs::CALIB_1_LEN];
        self.bus
            .read(regs::CALIB_0, &mut coeff[..regs::CALIB_0_LEN])?;
        self.bus
            .read(regs::CALIB_1, &mut coeff[regs::CALIB_0_LEN..])?;

        let res_heat_val = self.read_byte(regs::RES_HEAT_VAL)?;
        let res_heat_range = self.read_byte(regs::RES_HEAT_RANGE)? & regs::RES_HEAT_RANGE_MASK;
        let range_sw_err = self.read_byte(regs::RANGE_SW_ERR)?;

        let calibration =
            Calibration::from_registers(&coeff, res_heat_val, res_heat_range, range_sw_err);
        debug!(?calibration, "calibration loaded");
        Ok(calibration)
    }

    /// Program heater profile 0, oversampling and filter for `config`
    fn apply_settings(&mut self, config: &SensorConfig) -> Result<(), SensorError> {
        if config.run_gas {
            let res_heat = calc::heater_resistance(&self.calibration, config.heater_temperature);
            let gas_wait = calc::heater_duration(config.heater_duration);
            self.write_byte(regs::RES_HEAT_0, res_heat)?;
            self.write_byte(regs::GAS_WAIT_0, gas_wait)?;
            // run_gas with heater profile 0
            self.write_byte(regs::CTRL_GAS_1, regs::RUN_GAS)?;
        } else {
            self.write_byte(regs::CTRL_GAS_1, 0)?;
        }

        self.write_byte(regs::CTRL_HUM, config.humidity_oversampling.code())?;
        // IIR filter off
        self.write_byte(regs::CONFIG, 0)?;
        Ok(())
    }

    /// Write oversampling together with forced mode, starting one conversion
    fn trigger(&mut self, config: &SensorConfig) -> Result<(), SensorError> {
        let ctrl_meas = (config.temperature_oversampling.code() << 5)
            | (config.pressure_oversampling.code() << 2)
            | regs::MODE_FORCED;
        self.write_byte(regs::CTRL_MEAS, ctrl_meas)
    }

    fn read_field(&mut self) -> Result<[u8; regs::FIELD_LEN], SensorError> {
        let mut field = [0u8; regs::FIELD_LEN];
        for attempt in 1..=POLL_ATTEMPTS {
            self.bus.read(regs::FIELD_0, &mut field)?;
            if field[0] & regs::NEW_DATA != 0 {
                return Ok(field);
            }
            trace!(attempt, "field data not ready");
            if attempt < POLL_ATTEMPTS {
                self.delay.delay_ms(POLL_PERIOD_MS);
            }
        }
        Err(SensorError::NoNewData {
            attempts: POLL_ATTEMPTS,
        })
    }

    fn compensate(
        &self,
        field: &[u8; regs::FIELD_LEN],
        config: &SensorConfig,
        timestamp: Timestamp,
    ) -> RawSample {
        let cal = &self.calibration;
        let adc20 = |msb: u8, lsb: u8, xlsb: u8| {
            (u32::from(msb) << 12) | (u32::from(lsb) << 4) | (u32::from(xlsb) >> 4)
        };
        let press_adc = adc20(field[2], field[3], field[4]);
        let temp_adc = adc20(field[5], field[6], field[7]);
        let hum_adc = (u16::from(field[8]) << 8) | u16::from(field[9]);
        let gas_adc = (u16::from(field[13]) << 2) | u16::from(field[14] >> 6);
        let gas_range = field[14] & regs::GAS_RANGE_MASK;

        let mut sample = RawSample {
            timestamp,
            temperature: 0.0,
            pressure: 0.0,
            humidity: 0.0,
            gas_resistance: 0.0,
            gas_valid: false,
            heat_stable: false,
        };

        // pressure and humidity need t_fine
        if config.temperature_oversampling != Oversampling::Skipped {
            let temp = calc::temperature(cal, temp_adc);
            sample.temperature = temp.centi_celsius as f32 / 100.0;
            if config.pressure_oversampling != Oversampling::Skipped {
                sample.pressure = calc::pressure(cal, temp.t_fine, press_adc) as f32;
            }
            if config.humidity_oversampling != Oversampling::Skipped {
                sample.humidity = calc::humidity(cal, temp.t_fine, hum_adc) as f32 / 1000.0;
            }
        }

        if config.run_gas {
            sample.gas_resistance = calc::gas_resistance(cal, gas_adc, gas_range) as f32;
            sample.gas_valid = field[14] & regs::GAS_VALID != 0;
            sample.heat_stable = field[14] & regs::HEAT_STABLE != 0;
        }

        sample
    }
}

impl<T, D, C> SensorDriver for Bme680<T, D, C>
where
    T: BusTransport,
    D: DelayNs,
    C: Clock,
{
    #[instrument(
        skip_all,
        fields(heater_temperature = config.heater_temperature, run_gas = config.run_gas)
    )]
    fn capture(&mut self, config: &SensorConfig) -> Result<RawSample, SensorError> {
        if config.run_gas && config.heater_duration == 0 {
            return Err(SensorError::InvalidConfig {
                message: "gas conversion requested with zero heater duration".to_string(),
            });
        }

        self.apply_settings(config)?;
        self.trigger(config)?;
        self.delay.delay_ms(calc::measurement_duration_ms(config));

        let field = self.read_field()?;
        let timestamp = self.clock.now();
        let sample = self.compensate(&field, config, timestamp);

        trace!(
            temperature = sample.temperature,
            pressure = sample.pressure,
            humidity = sample.humidity,
            gas = sample.gas_resistance,
            "sample captured"
        );
        Ok(sample)
    }
}
