//! I2C bus abstractions
//!
//! Provides traits for I2C master operations.

use crate::BusFault;

/// I2C bus master
///
/// The pump board is write-only from the controller's point of view, so
/// only register writes are required.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error: Into<BusFault>;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write (register followed by payload)
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;
}
