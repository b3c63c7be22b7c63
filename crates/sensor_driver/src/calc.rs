//! Integer compensation (Bosch BME680 reference formulas)
//!
//! Units: temperature in centi-°C, pressure in Pa, humidity in milli-%rH,
//! gas resistance in Ω. Intermediates are widened to i64; the one step the
//! reference performs in unsigned 32-bit arithmetic keeps its wrapping.

use contracts::{Oversampling, SensorConfig};

/// Ambient temperature assumed for the heater set-point (°C)
pub const AMBIENT_TEMPERATURE: i64 = 25;

/// Heater ceiling (°C)
pub const MAX_HEATER_TEMPERATURE: u16 = 400;

const GAS_LOOKUP_1: [i64; 16] = [
    2147483647, 2147483647, 2147483647, 2147483647, 2147483647, 2126008810, 2147483647,
    2130303777, 2147483647, 2147483647, 2143188679, 2136746228, 2147483647, 2126008810,
    2147483647, 2147483647,
];

const GAS_LOOKUP_2: [i64; 16] = [
    4096000000, 2048000000, 1024000000, 512000000, 255744255, 127110228, 64000000, 32258064,
    16016016, 8000000, 4000000, 2000000, 1000000, 500000, 250000, 125000,
];

/// Factory calibration coefficients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
    pub par_gh1: i8,
    pub par_gh2: i16,
    pub par_gh3: i8,
    pub res_heat_val: i8,
    pub res_heat_range: u8,
    pub range_sw_err: i8,
}

impl Calibration {
    /// Decode the two calibration blocks (0x89 then 0xE1, concatenated)
    /// plus the three heater trim registers as read from the chip
    pub fn from_registers(
        coeff: &[u8; 41],
        res_heat_val: u8,
        res_heat_range: u8,
        range_sw_err: u8,
    ) -> Self {
        let word = |lsb: usize, msb: usize| u16::from(coeff[lsb]) | (u16::from(coeff[msb]) << 8);

        Self {
            par_t1: word(33, 34),
            par_t2: word(1, 2) as i16,
            par_t3: coeff[3] as i8,
            par_p1: word(5, 6),
            par_p2: word(7, 8) as i16,
            par_p3: coeff[9] as i8,
            par_p4: word(11, 12) as i16,
            par_p5: word(13, 14) as i16,
            par_p6: coeff[16] as i8,
            par_p7: coeff[15] as i8,
            par_p8: word(19, 20) as i16,
            par_p9: word(21, 22) as i16,
            par_p10: coeff[23],
            par_h1: (u16::from(coeff[27]) << 4) | u16::from(coeff[26] & 0x0f),
            par_h2: (u16::from(coeff[25]) << 4) | u16::from(coeff[26] >> 4),
            par_h3: coeff[28] as i8,
            par_h4: coeff[29] as i8,
            par_h5: coeff[30] as i8,
            par_h6: coeff[31],
            par_h7: coeff[32] as i8,
            par_gh1: coeff[37] as i8,
            par_gh2: word(35, 36) as i16,
            par_gh3: coeff[38] as i8,
            res_heat_val: res_heat_val as i8,
            res_heat_range: (res_heat_range & 0x30) >> 4,
            range_sw_err: (range_sw_err as i8) >> 4,
        }
    }
}

/// Temperature result: fine value for the other channels plus centi-°C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Temperature {
    pub t_fine: i64,
    pub centi_celsius: i64,
}

pub fn temperature(cal: &Calibration, temp_adc: u32) -> Temperature {
    let var1 = (i64::from(temp_adc) >> 3) - (i64::from(cal.par_t1) << 1);
    let var2 = (var1 * i64::from(cal.par_t2)) >> 11;
    let var3 = ((var1 >> 1) * (var1 >> 1)) >> 12;
    let var3 = (var3 * (i64::from(cal.par_t3) << 4)) >> 14;
    let t_fine = var2 + var3;

    Temperature {
        t_fine,
        centi_celsius: ((t_fine * 5) + 128) >> 8,
    }
}

/// Pressure in Pa
pub fn pressure(cal: &Calibration, t_fine: i64, press_adc: u32) -> u32 {
    let mut var1 = (t_fine >> 1) - 64000;
    let mut var2 = ((((var1 >> 2) * (var1 >> 2)) >> 11) * i64::from(cal.par_p6)) >> 2;
    var2 += (var1 * i64::from(cal.par_p5)) << 1;
    var2 = (var2 >> 2) + (i64::from(cal.par_p4) << 16);
    var1 = (((((var1 >> 2) * (var1 >> 2)) >> 13) * (i64::from(cal.par_p3) << 5)) >> 3)
        + ((i64::from(cal.par_p2) * var1) >> 1);
    var1 >>= 18;
    var1 = ((32768 + var1) * i64::from(cal.par_p1)) >> 15;
    if var1 == 0 {
        return 0;
    }

    let base = 1_048_576 - i64::from(press_adc) - (var2 >> 12);
    // reference multiplies in u32 and reinterprets as i32
    let mut comp = i64::from((base as u32).wrapping_mul(3125) as i32);
    comp = if comp >= 0x4000_0000 {
        (comp / var1) << 1
    } else {
        (comp << 1) / var1
    };

    let var1 = (i64::from(cal.par_p9) * (((comp >> 3) * (comp >> 3)) >> 13)) >> 12;
    let var2 = ((comp >> 2) * i64::from(cal.par_p8)) >> 13;
    let var3 = ((comp >> 8) * (comp >> 8) * (comp >> 8) * i64::from(cal.par_p10)) >> 17;
    comp += (var1 + var2 + var3 + (i64::from(cal.par_p7) << 7)) >> 4;

    comp.clamp(0, i64::from(u32::MAX)) as u32
}

/// Relative humidity in milli-%rH, clamped to 0..=100000
pub fn humidity(cal: &Calibration, t_fine: i64, hum_adc: u16) -> u32 {
    let temp_scaled = ((t_fine * 5) + 128) >> 8;
    let var1 = i64::from(hum_adc)
        - i64::from(cal.par_h1) * 16
        - (((temp_scaled * i64::from(cal.par_h3)) / 100) >> 1);
    let var2 = (i64::from(cal.par_h2)
        * (((temp_scaled * i64::from(cal.par_h4)) / 100)
            + (((temp_scaled * ((temp_scaled * i64::from(cal.par_h5)) / 100)) >> 6) / 100)
            + (1 << 14)))
        >> 10;
    let var3 = var1 * var2;
    let var4 = ((i64::from(cal.par_h6) << 7) + ((temp_scaled * i64::from(cal.par_h7)) / 100)) >> 4;
    let var5 = ((var3 >> 14) * (var3 >> 14)) >> 10;
    let var6 = (var4 * var5) >> 1;
    let comp = (((var3 + var6) >> 10) * 1000) >> 12;

    comp.clamp(0, 100_000) as u32
}

/// Gas resistance in Ω
pub fn gas_resistance(cal: &Calibration, gas_adc: u16, gas_range: u8) -> u32 {
    let range = usize::from(gas_range & 0x0f);
    let var1 = ((1340 + 5 * i64::from(cal.range_sw_err)) * GAS_LOOKUP_1[range]) >> 16;
    let var2 = (i64::from(gas_adc) << 15) - 16_777_216 + var1;
    if var2 <= 0 {
        return 0;
    }
    let var3 = (GAS_LOOKUP_2[range] * var1) >> 9;
    ((var3 + (var2 >> 1)) / var2).clamp(0, i64::from(u32::MAX)) as u32
}

/// `res_heat_x` register value for a heater target (°C)
pub fn heater_resistance(cal: &Calibration, target: u16) -> u8 {
    let target = i64::from(target.min(MAX_HEATER_TEMPERATURE));
    let var1 = ((AMBIENT_TEMPERATURE * i64::from(cal.par_gh3)) / 1000) * 256;
    let var2 = (i64::from(cal.par_gh1) + 784)
        * (((((i64::from(cal.par_gh2) + 154_009) * target * 5) / 100) + 3_276_800) / 10);
    let var3 = var1 + var2 / 2;
    let var4 = var3 / (i64::from(cal.res_heat_range) + 4);
    let var5 = 131 * i64::from(cal.res_heat_val) + 65536;
    let res_x100 = ((var4 / var5) - 250) * 34;

    ((res_x100 + 50) / 100).clamp(0, 255) as u8
}

/// `gas_wait_x` register value for a heater on-time (ms)
///
/// Bits 0..5 hold the base count, bits 6..7 a x4 multiplier exponent.
pub fn heater_duration(duration_ms: u16) -> u8 {
    if duration_ms >= 0x0fc0 {
        return 0xff;
    }
    let mut duration = duration_ms;
    let mut factor: u8 = 0;
    while duration > 0x3f {
        duration /= 4;
        factor += 1;
    }
    duration as u8 + factor * 64
}

/// Time from forced-mode trigger until results are ready (ms)
pub fn measurement_duration_ms(config: &SensorConfig) -> u32 {
    let cycles = [
        config.temperature_oversampling,
        config.pressure_oversampling,
        config.humidity_oversampling,
    ]
    .iter()
    .map(|os: &Oversampling| os.cycles())
    .sum::<u32>();

    let mut micros = cycles * 1963;
    micros += 477 * 4; // TPH switching
    micros += 477 * 5; // gas measurement
    micros += 500; // round up
    let mut millis = micros / 1000 + 1; // wake-up

    if config.run_gas {
        millis += u32::from(config.heater_duration);
    }
    millis
}
