//! # Sensor Driver
//!
//! Bosch BME680 over a [`contracts::BusTransport`]: identity check, soft
//! reset, calibration read, forced-mode capture and integer compensation.
//! Each capture programs the heater and oversampling settings the fusion
//! engine asked for and timestamps the sample right after the field read.

mod bme680;
pub mod calc;
mod delay;
mod regs;

pub use bme680::Bme680;
pub use calc::Calibration;
pub use delay::{NoopDelay, StdDelay};
