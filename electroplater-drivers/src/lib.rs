//! Device driver implementations
//!
//! This crate provides concrete implementations of the hardware traits
//! defined in electroplater-core:
//!
//! - Power supply: DPS5005 over Modbus RTU
//! - Pump: 4tronix Picon Zero motor board over I2C
//! - Motion: G-code over the printer's serial link

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod motion;
pub mod psu;
pub mod pump;

#[cfg(test)]
pub(crate) mod mock;

use electroplater_core::traits::HardwareError;
use electroplater_hal::BusFault;

/// Map a classified bus failure onto the hardware error seen by the core
pub(crate) fn bus_error(fault: BusFault) -> HardwareError {
    match fault {
        BusFault::Timeout => HardwareError::Timeout,
        BusFault::Disconnected | BusFault::NoAcknowledge => HardwareError::Disconnected,
        BusFault::Other => HardwareError::Bus,
    }
}
