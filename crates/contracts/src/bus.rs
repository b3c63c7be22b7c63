//! BusTransport trait - register-addressed serial bus
//!
//! The handle is opened once at startup and then owned exclusively by the
//! sensor driver for the process lifetime; it is never cloned or shared.

use crate::BusError;

/// Primary I2C address of the BME680 (SDO tied low)
pub const SENSOR_ADDR_PRIMARY: u16 = 0x76;

/// Secondary address of the BME680 (SDO tied high), the default wiring
pub const SENSOR_ADDR_SECONDARY: u16 = 0x77;

/// Byte-level register access to one target device
pub trait BusTransport {
    /// Select the device all subsequent transfers address
    ///
    /// Called once at startup; failure is fatal.
    fn set_target(&mut self, address: u16) -> Result<(), BusError>;

    /// Write `data` starting at `register`
    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), BusError>;

    /// Fill `buf` with consecutive registers starting at `register`
    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError>;
}

impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    fn set_target(&mut self, address: u16) -> Result<(), BusError> {
        (**self).set_target(address)
    }

    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), BusError> {
        (**self).write(register, data)
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read(register, buf)
    }
}
