//! Bench power supply drivers

pub mod dps5005;
pub mod modbus;

pub use dps5005::{Dps5005, Dps5005Config};
pub use modbus::ModbusError;
