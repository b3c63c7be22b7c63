//! BME680 register map (datasheet section 5)

pub const RES_HEAT_VAL: u8 = 0x00;
pub const RES_HEAT_RANGE: u8 = 0x02;
pub const RANGE_SW_ERR: u8 = 0x04;

/// Start of the field data block (status, ADCs, gas)
pub const FIELD_0: u8 = 0x1d;
pub const FIELD_LEN: usize = 15;

pub const RES_HEAT_0: u8 = 0x5a;
pub const GAS_WAIT_0: u8 = 0x64;
pub const CTRL_GAS_1: u8 = 0x71;
pub const CTRL_HUM: u8 = 0x72;
pub const CTRL_MEAS: u8 = 0x74;
pub const CONFIG: u8 = 0x75;

pub const CALIB_0: u8 = 0x89;
pub const CALIB_0_LEN: usize = 25;
pub const CHIP_ID: u8 = 0xd0;
pub const SOFT_RESET: u8 = 0xe0;
pub const CALIB_1: u8 = 0xe1;
pub const CALIB_1_LEN: usize = 16;

pub const CHIP_ID_BME680: u8 = 0x61;
pub const SOFT_RESET_CMD: u8 = 0xb6;

pub const MODE_FORCED: u8 = 0x01;
pub const RUN_GAS: u8 = 0x10;
pub const NEW_DATA: u8 = 0x80;
pub const GAS_VALID: u8 = 0x20;
pub const HEAT_STABLE: u8 = 0x10;
pub const GAS_RANGE_MASK: u8 = 0x0f;
pub const RES_HEAT_RANGE_MASK: u8 = 0x30;
