//! Linux userspace I2C (`/dev/i2c-N`)

use contracts::BusError;
use linux_embedded_hal::I2cdev;

use crate::I2cTransport;

/// Transport over a Linux I2C character device
pub type LinuxBus = I2cTransport<I2cdev>;

/// Open the adapter at `device`
///
/// The returned handle has no target yet; failure here is a startup error.
pub fn open_linux_bus(device: &str) -> Result<LinuxBus, BusError> {
    let dev = I2cdev::new(device).map_err(|e| BusError::open(device, e.to_string()))?;
    tracing::info!(device, "I2C bus opened");
    Ok(I2cTransport::new(dev))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = open_linux_bus("/dev/i2c-does-not-exist").unwrap_err();
        assert!(matches!(err, BusError::Open { .. }));
        assert!(err.to_string().contains("/dev/i2c-does-not-exist"));
    }
}
