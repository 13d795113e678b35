//! 4tronix Picon Zero motor board (I2C)
//!
//! The pump is a DC motor on one of the board's two H-bridge outputs.
//! Each output takes a signed byte, -127 full reverse to 127 full forward.
//! Writing 0 to the reset register stops both outputs and returns the board
//! to its power-on state.

use electroplater_core::traits::{HardwareError, Pump};
use electroplater_hal::I2cBus;
use tracing::debug;

use crate::bus_error;

/// Default I2C address
pub const DEFAULT_ADDRESS: u8 = 0x22;

/// Picon Zero register addresses
pub mod reg {
    /// Motor A speed
    pub const MOTOR_A: u8 = 0;
    /// Motor B speed
    pub const MOTOR_B: u8 = 1;
    /// Board reset
    pub const RESET: u8 = 20;
}

/// Full-scale motor value
const MOTOR_MAX: i16 = 127;

/// Picon Zero configuration
#[derive(Debug, Clone)]
pub struct PiconZeroConfig {
    /// I2C address
    pub address: u8,
    /// Output the pump is wired to (0 or 1)
    pub motor: u8,
}

impl Default for PiconZeroConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            motor: reg::MOTOR_B,
        }
    }
}

/// Convert a signed percentage into the board's motor value
///
/// Values beyond ±100 % are clamped.
pub fn motor_value(speed_percent: i8) -> i8 {
    let percent = i16::from(speed_percent).clamp(-100, 100);
    (percent * MOTOR_MAX / 100) as i8
}

/// Picon Zero pump driver
///
/// The board is initialized on the first `start`. `release_resources` always
/// resets it, so a board left running by an earlier process is stopped too.
pub struct PiconZero<B: I2cBus> {
    bus: B,
    config: PiconZeroConfig,
    initialized: bool,
}

impl<B: I2cBus> PiconZero<B> {
    /// Create a driver; the board is not touched until the first start
    pub fn new(bus: B, config: PiconZeroConfig) -> Self {
        Self {
            bus,
            config,
            initialized: false,
        }
    }

    /// Check if the board has been initialized since the last release
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), HardwareError> {
        self.bus
            .write(self.config.address, &[register, value])
            .map_err(|e| bus_error(e.into()))
    }

    fn reset(&mut self) -> Result<(), HardwareError> {
        self.write_register(reg::RESET, 0)
    }
}

impl<B: I2cBus> Pump for PiconZero<B> {
    fn start(&mut self, speed_percent: i8) -> Result<(), HardwareError> {
        if self.config.motor > reg::MOTOR_B {
            return Err(HardwareError::Rejected);
        }
        if !self.initialized {
            self.reset()?;
            self.initialized = true;
            debug!(address = self.config.address, "Picon Zero initialized");
        }
        let value = motor_value(speed_percent);
        self.write_register(self.config.motor, value as u8)
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.write_register(reg::MOTOR_A, 0)?;
        self.write_register(reg::MOTOR_B, 0)
    }

    fn release_resources(&mut self) -> Result<(), HardwareError> {
        self.reset()?;
        self.initialized = false;
        debug!(address = self.config.address, "Picon Zero released");
        Ok(())
    }
}
