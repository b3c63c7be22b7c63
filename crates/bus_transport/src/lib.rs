//! # Bus Transport
//!
//! Register-level access to the sensor over I2C.
//!
//! - [`I2cTransport`]: adapts any `embedded-hal` 1.0 I2C bus to [`BusTransport`]
//! - [`open_linux_bus`]: opens `/dev/i2c-N` (feature `linux`)
//! - [`MockBus`]: in-memory BME680 register file with fault injection

mod i2c;
#[cfg(feature = "linux")]
mod linux;
pub mod mock;

pub use contracts::{BusError, BusTransport};
pub use i2c::{I2cTransport, MAX_WRITE_LEN};
#[cfg(feature = "linux")]
pub use linux::{open_linux_bus, LinuxBus};
pub use mock::{FieldAdc, MockBus, MockProbe};
