//! In-memory BME680 register file
//!
//! Emulates enough of the chip for the driver to run unmodified: identity,
//! soft reset, calibration blocks and forced-mode conversions. Writing forced
//! mode to `ctrl_meas` latches the configured [`FieldAdc`] into the field
//! data registers and raises the new-data flag.
//!
//! Multi-byte writes land in consecutive registers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{BusError, BusTransport, SENSOR_ADDR_SECONDARY};

/// Chip identity of a genuine BME680
pub const CHIP_ID: u8 = 0x61;

/// Calibration block at 0x89
pub const CALIB_BLOCK_0: [u8; 25] = [
    0x00, 0x5f, 0x67, 0x03, 0x00, 0xce, 0x8d, 0x0a, 0xd7, 0x58, 0x00, 0x1c, 0x1a, 0x8c, 0xff,
    0x2b, 0x1e, 0x00, 0x00, 0x24, 0xf5, 0x85, 0xf7, 0x1e, 0x00,
];

/// Calibration block at 0xE1
pub const CALIB_BLOCK_1: [u8; 16] = [
    0x3f, 0x73, 0x30, 0x00, 0x2d, 0x14, 0x78, 0x9c, 0xbe, 0x65, 0xe6, 0xd0, 0xe2, 0x12, 0x00, 0x00,
];

/// Heater resistance trim (register 0x00)
pub const RES_HEAT_VAL: u8 = 47;

/// Heater range, bits 4..5 of register 0x02
pub const RES_HEAT_RANGE: u8 = 1;

const REG_RES_HEAT_VAL: usize = 0x00;
const REG_RES_HEAT_RANGE: usize = 0x02;
const REG_FIELD: usize = 0x1d;
const REG_CTRL_MEAS: u8 = 0x74;
const REG_CHIP_ID: usize = 0xd0;
const REG_RESET: u8 = 0xe0;
const REG_CALIB_0: usize = 0x89;
const REG_CALIB_1: usize = 0xe1;

const SOFT_RESET_CMD: u8 = 0xb6;
const MODE_MASK: u8 = 0x03;
const MODE_FORCED: u8 = 0x01;
const NEW_DATA: u8 = 0x80;

/// Raw ADC values the next forced conversion reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAdc {
    /// 20-bit temperature ADC
    pub temperature: u32,
    /// 20-bit pressure ADC
    pub pressure: u32,
    /// 16-bit humidity ADC
    pub humidity: u16,
    /// 10-bit gas ADC
    pub gas: u16,
    pub gas_range: u8,
    pub gas_valid: bool,
    pub heat_stable: bool,
}

impl Default for FieldAdc {
    /// Roughly 26 °C, 1021 hPa, 38 %rH, 504 kΩ with the bundled calibration
    fn default() -> Self {
        Self {
            temperature: 500_000,
            pressure: 350_000,
            humidity: 20_000,
            gas: 500,
            gas_range: 4,
            gas_valid: true,
            heat_stable: true,
        }
    }
}

impl FieldAdc {
    /// Encode as the 15-byte block starting at 0x1D
    fn encode(&self) -> [u8; 15] {
        let mut block = [0u8; 15];
        block[0] = NEW_DATA;
        block[2] = (self.pressure >> 12) as u8;
        block[3] = (self.pressure >> 4) as u8;
        block[4] = ((self.pressure << 4) & 0xf0) as u8;
        block[5] = (self.temperature >> 12) as u8;
        block[6] = (self.temperature >> 4) as u8;
        block[7] = ((self.temperature << 4) & 0xf0) as u8;
        block[8] = (self.humidity >> 8) as u8;
        block[9] = self.humidity as u8;
        block[13] = (self.gas >> 2) as u8;
        block[14] = (((self.gas & 0x03) << 6) as u8)
            | (u8::from(self.gas_valid) << 5)
            | (u8::from(self.heat_stable) << 4)
            | (self.gas_range & 0x0f);
        block
    }
}

struct MockState {
    regs: [u8; 256],
    device_address: u16,
    target: Option<u16>,
    field: FieldAdc,
    read_faults: u32,
    write_faults: u32,
    withhold_new_data: bool,
    conversions: u64,
    resets: u32,
    writes: Vec<(u8, Vec<u8>)>,
}

impl MockState {
    fn new(chip_id: u8) -> Self {
        let mut state = Self {
            regs: [0u8; 256],
            device_address: SENSOR_ADDR_SECONDARY,
            target: None,
            field: FieldAdc::default(),
            read_faults: 0,
            write_faults: 0,
            withhold_new_data: false,
            conversions: 0,
            resets: 0,
            writes: Vec::new(),
        };
        state.regs[REG_CHIP_ID] = chip_id;
        state.regs[REG_CALIB_0..REG_CALIB_0 + CALIB_BLOCK_0.len()].copy_from_slice(&CALIB_BLOCK_0);
        state.regs[REG_CALIB_1..REG_CALIB_1 + CALIB_BLOCK_1.len()].copy_from_slice(&CALIB_BLOCK_1);
        state.regs[REG_RES_HEAT_VAL] = RES_HEAT_VAL;
        state.regs[REG_RES_HEAT_RANGE] = RES_HEAT_RANGE << 4;
        state
    }

    fn acknowledged(&self) -> bool {
        self.target == Some(self.device_address)
    }

    fn soft_reset(&mut self) {
        self.resets += 1;
        for reg in [0x5a, 0x64, 0x70, 0x71, 0x72, 0x74, 0x75] {
            self.regs[reg] = 0;
        }
        self.regs[REG_FIELD] = 0;
    }

    fn convert(&mut self) {
        self.conversions += 1;
        // a new conversion invalidates the previous result
        self.regs[REG_FIELD] &= !NEW_DATA;
        if !self.withhold_new_data {
            let block = self.field.encode();
            self.regs[REG_FIELD..REG_FIELD + block.len()].copy_from_slice(&block);
        }
        // back to sleep once the conversion is done
        self.regs[REG_CTRL_MEAS as usize] &= !MODE_MASK;
    }
}

/// Emulated bus with one BME680 attached
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
}

impl MockBus {
    /// Genuine chip answering at the secondary address
    pub fn new() -> Self {
        Self::with_chip_id(CHIP_ID)
    }

    /// Chip reporting an arbitrary identity
    pub fn with_chip_id(chip_id: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::new(chip_id))),
        }
    }

    /// Move the emulated chip to `address`
    pub fn at_address(self, address: u16) -> Self {
        lock(&self.state).device_address = address;
        self
    }

    /// Observation and fault-injection handle
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for MockBus {
    fn set_target(&mut self, address: u16) -> Result<(), BusError> {
        if address > 0x7f {
            return Err(BusError::InvalidAddress { address });
        }
        lock(&self.state).target = Some(address);
        Ok(())
    }

    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), BusError> {
        let mut state = lock(&self.state);
        if state.target.is_none() {
            return Err(BusError::NoTarget);
        }
        if !state.acknowledged() {
            return Err(BusError::write(register, "no acknowledge"));
        }
        if state.write_faults > 0 {
            state.write_faults -= 1;
            return Err(BusError::write(register, "injected fault"));
        }

        state.writes.push((register, data.to_vec()));
        for (offset, byte) in data.iter().enumerate() {
            let reg = register.wrapping_add(offset as u8);
            match reg {
                REG_RESET if *byte == SOFT_RESET_CMD => state.soft_reset(),
                REG_CTRL_MEAS => {
                    state.regs[reg as usize] = *byte;
                    if byte & MODE_MASK == MODE_FORCED {
                        state.convert();
                    }
                }
                _ => state.regs[reg as usize] = *byte,
            }
        }
        Ok(())
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let mut state = lock(&self.state);
        if state.target.is_none() {
            return Err(BusError::NoTarget);
        }
        if !state.acknowledged() {
            return Err(BusError::read(register, buf.len(), "no acknowledge"));
        }
        if state.read_faults > 0 {
            state.read_faults -= 1;
            return Err(BusError::read(register, buf.len(), "injected fault"));
        }

        for (offset, slot) in buf.iter_mut().enumerate() {
            *slot = state.regs[register.wrapping_add(offset as u8) as usize];
        }
        Ok(())
    }
}

/// Shared view into a [`MockBus`] that stays usable after the bus is moved
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    /// ADC values reported by subsequent conversions
    pub fn set_field(&self, field: FieldAdc) {
        lock(&self.state).field = field;
    }

    /// Fail the next `count` reads
    pub fn fail_reads(&self, count: u32) {
        lock(&self.state).read_faults = count;
    }

    /// Fail the next `count` writes
    pub fn fail_writes(&self, count: u32) {
        lock(&self.state).write_faults = count;
    }

    /// Keep the new-data flag low after forced conversions
    pub fn withhold_new_data(&self, withhold: bool) {
        lock(&self.state).withhold_new_data = withhold;
    }

    /// Forced conversions triggered so far
    pub fn conversions(&self) -> u64 {
        lock(&self.state).conversions
    }

    /// Soft resets received so far
    pub fn resets(&self) -> u32 {
        lock(&self.state).resets
    }

    pub fn register(&self, register: u8) -> u8 {
        lock(&self.state).regs[register as usize]
    }

    pub fn target(&self) -> Option<u16> {
        lock(&self.state).target
    }

    /// Every successful write as (register, payload)
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        lock(&self.state).writes.clone()
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> MockBus {
        let mut bus = MockBus::new();
        bus.set_target(SENSOR_ADDR_SECONDARY).unwrap();
        bus
    }

    #[test]
    fn test_chip_id_and_calibration_readable() {
        let mut bus = attached();
        let mut id = [0u8; 1];
        bus.read(0xd0, &mut id).unwrap();
        assert_eq!(id[0], CHIP_ID);

        let mut calib = [0u8; 25];
        bus.read(0x89, &mut calib).unwrap();
        assert_eq!(calib, CALIB_BLOCK_0);
    }

    #[test]
    fn test_wrong_address_not_acknowledged() {
        let mut bus = MockBus::new();
        bus.set_target(0x76).unwrap();
        let mut id = [0u8; 1];
        assert!(matches!(bus.read(0xd0, &mut id), Err(BusError::Read { .. })));
    }

    #[test]
    fn test_forced_mode_latches_field_data() {
        let mut bus = attached();
        let probe = bus.probe();
        bus.write(0x74, &[0b0100_0101]).unwrap();
        assert_eq!(probe.conversions(), 1);
        // mode bits return to sleep
        assert_eq!(probe.register(0x74), 0b0100_0100);

        let mut field = [0u8; 15];
        bus.read(0x1d, &mut field).unwrap();
        assert_eq!(field[0] & NEW_DATA, NEW_DATA);
        assert_eq!(field[8], 0x4e);
        assert_eq!(field[9], 0x20);
        assert_eq!(field[14], 0x34);
    }

    #[test]
    fn test_withheld_data_keeps_flag_low() {
        let mut bus = attached();
        let probe = bus.probe();
        probe.withhold_new_data(true);
        bus.write(0x74, &[0x01]).unwrap();
        assert_eq!(probe.register(0x1d) & NEW_DATA, 0);
    }

    #[test]
    fn test_withheld_data_clears_previous_flag() {
        let mut bus = attached();
        let probe = bus.probe();
        bus.write(0x74, &[0x01]).unwrap();
        assert_ne!(probe.register(0x1d) & NEW_DATA, 0);

        probe.withhold_new_data(true);
        bus.write(0x74, &[0x01]).unwrap();
        assert_eq!(probe.register(0x1d) & NEW_DATA, 0);
    }

    #[test]
    fn test_soft_reset_clears_controls() {
        let mut bus = attached();
        let probe = bus.probe();
        bus.write(0x72, &[0x01]).unwrap();
        bus.write(0xe0, &[SOFT_RESET_CMD]).unwrap();
        assert_eq!(probe.resets(), 1);
        assert_eq!(probe.register(0x72), 0);
        assert_eq!(probe.register(0xd0), CHIP_ID);
    }

    #[test]
    fn test_injected_faults_are_consumed() {
        let mut bus = attached();
        let probe = bus.probe();
        probe.fail_reads(1);
        probe.fail_writes(1);

        let mut buf = [0u8; 1];
        assert!(bus.read(0xd0, &mut buf).is_err());
        assert!(bus.read(0xd0, &mut buf).is_ok());
        assert!(bus.write(0x72, &[0x01]).is_err());
        assert!(bus.write(0x72, &[0x01]).is_ok());
        assert_eq!(probe.writes(), vec![(0x72, vec![0x01])]);
    }
}
