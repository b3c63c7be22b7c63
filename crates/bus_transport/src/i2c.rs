//! embedded-hal I2C adapter

use contracts::{BusError, BusTransport};
use embedded_hal::i2c::{Error as _, I2c, SevenBitAddress};

/// Largest payload a single register write may carry
pub const MAX_WRITE_LEN: usize = 16;

/// Register transport over an `embedded-hal` I2C bus
///
/// Owns the bus exclusively. Every transfer addresses the target set by
/// [`BusTransport::set_target`].
pub struct I2cTransport<B> {
    bus: B,
    target: Option<SevenBitAddress>,
}

impl<B> core::fmt::Debug for I2cTransport<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("I2cTransport")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<B> I2cTransport<B>
where
    B: I2c<SevenBitAddress>,
{
    pub fn new(bus: B) -> Self {
        Self { bus, target: None }
    }

    /// Currently selected 7-bit address
    pub fn target(&self) -> Option<u8> {
        self.target
    }

    /// Give the underlying bus back
    pub fn into_inner(self) -> B {
        self.bus
    }

    fn address(&self) -> Result<SevenBitAddress, BusError> {
        self.target.ok_or(BusError::NoTarget)
    }
}

impl<B> BusTransport for I2cTransport<B>
where
    B: I2c<SevenBitAddress>,
{
    fn set_target(&mut self, address: u16) -> Result<(), BusError> {
        let address = u8::try_from(address)
            .ok()
            .filter(|a| *a <= 0x7f)
            .ok_or(BusError::InvalidAddress { address })?;
        self.target = Some(address);
        tracing::debug!(address, "bus target selected");
        Ok(())
    }

    fn write(&mut self, register: u8, data: &[u8]) -> Result<(), BusError> {
        if data.len() > MAX_WRITE_LEN {
            return Err(BusError::TooLong {
                len: data.len(),
                max: MAX_WRITE_LEN,
            });
        }
        let address = self.address()?;

        let mut frame = [0u8; MAX_WRITE_LEN + 1];
        frame[0] = register;
        frame[1..=data.len()].copy_from_slice(data);

        self.bus
            .write(address, &frame[..=data.len()])
            .map_err(|e| BusError::write(register, e.kind().to_string()))
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let address = self.address()?;
        let len = buf.len();
        self.bus
            .write_read(address, &[register], buf)
            .map_err(|e| BusError::read(register, len, e.kind().to_string()))
    }
}
