//! Linux I2C device as the pump bus

use anyhow::Result;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use linux_embedded_hal::I2cdev;

use electroplater_hal::{BusFault, I2cBus};

/// Map an embedded-hal I2C error kind to a bus fault
pub fn classify(kind: ErrorKind) -> BusFault {
    match kind {
        ErrorKind::NoAcknowledge(_) => BusFault::NoAcknowledge,
        _ => BusFault::Other,
    }
}

/// `/dev/i2c-*` character device
pub struct I2cPort {
    dev: I2cdev,
}

impl I2cPort {
    /// Open an I2C bus device node
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self {
            dev: I2cdev::new(path)?,
        })
    }
}

impl I2cBus for I2cPort {
    type Error = BusFault;

    fn write(&mut self, address: u8, data: &[u8]) -> core::result::Result<(), Self::Error> {
        I2c::write(&mut self.dev, address, data).map_err(|e| classify(e.kind()))
    }
}
