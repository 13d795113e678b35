//! Programmable power supply trait

use core::fmt;

use super::HardwareError;

/// Identity reported by the power supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsuIdentity {
    /// Model number (e.g. 5005)
    pub model: u16,
    /// Firmware version, tenths (e.g. 14 = 1.4)
    pub firmware: u16,
}

impl fmt::Display for PsuIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model {} firmware {}.{}",
            self.model,
            self.firmware / 10,
            self.firmware % 10
        )
    }
}

/// Trait for the plating power supply
///
/// Units are volts and amps. Setpoints take effect on the next output
/// enable; `set_output` switches the plating circuit itself.
pub trait PowerSupply {
    /// Set the output voltage setpoint
    fn set_voltage(&mut self, volts: f32) -> Result<(), HardwareError>;

    /// Set the current limit
    fn set_current_limit(&mut self, amps: f32) -> Result<(), HardwareError>;

    /// Switch the output on or off
    fn set_output(&mut self, on: bool) -> Result<(), HardwareError>;

    /// Read the measured output voltage
    fn read_voltage(&mut self) -> Result<f32, HardwareError>;

    /// Read the measured output current
    fn read_current(&mut self) -> Result<f32, HardwareError>;

    /// Read model and firmware version
    fn identify(&mut self) -> Result<PsuIdentity, HardwareError>;
}
