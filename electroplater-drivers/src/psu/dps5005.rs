//! DPS5005 programmable power supply (Modbus RTU)
//!
//! The DPS5005 exposes its setpoints and measurements as holding registers
//! on a 9600 baud serial link:
//!
//! | Register | Meaning | Scale |
//! |---|---|---|
//! | 0x00 U-SET | voltage setpoint | V × 100 |
//! | 0x01 I-SET | current limit | A × 1000 |
//! | 0x02 UOUT | output voltage | V × 100 |
//! | 0x03 IOUT | output current | A × 1000 |
//! | 0x09 ONOFF | output enable | 0 / 1 |
//! | 0x0B MODEL | model number | |
//! | 0x0C VERSION | firmware version | × 10 |

use electroplater_core::traits::{HardwareError, PowerSupply, PsuIdentity};
use electroplater_hal::{Uart, UartRx, UartTx};
use heapless::Vec;
use tracing::debug;

use super::modbus::{self, Response, HEADER_LEN};
use crate::bus_error;

/// DPS5005 register addresses
pub mod reg {
    /// Voltage setpoint
    pub const U_SET: u16 = 0x00;
    /// Current limit
    pub const I_SET: u16 = 0x01;
    /// Measured output voltage
    pub const UOUT: u16 = 0x02;
    /// Measured output current
    pub const IOUT: u16 = 0x03;
    /// Output enable
    pub const ONOFF: u16 = 0x09;
    /// Model number
    pub const MODEL: u16 = 0x0B;
    /// Firmware version
    pub const VERSION: u16 = 0x0C;
}

/// Voltage register units per volt
const VOLTAGE_SCALE: f32 = 100.0;
/// Current register units per amp
const CURRENT_SCALE: f32 = 1000.0;

/// Largest response this driver asks for
const MAX_FRAME: usize = 16;

/// DPS5005 configuration
#[derive(Debug, Clone)]
pub struct Dps5005Config {
    /// Modbus slave address
    pub address: u8,
    /// Highest voltage setpoint accepted (V)
    pub max_voltage: f32,
    /// Highest current limit accepted (A)
    pub max_current: f32,
}

impl Default for Dps5005Config {
    fn default() -> Self {
        Self {
            address: 1,
            max_voltage: 50.0,
            max_current: 5.0,
        }
    }
}

/// Scale a setpoint into register units, refusing values outside `0..=max`
fn to_register(value: f32, scale: f32, max: f32) -> Result<u16, HardwareError> {
    if !value.is_finite() || value < 0.0 || value > max {
        return Err(HardwareError::Rejected);
    }
    let scaled = value * scale + 0.5;
    if scaled > f32::from(u16::MAX) {
        return Err(HardwareError::Rejected);
    }
    Ok(scaled as u16)
}

/// DPS5005 driver
pub struct Dps5005<U: Uart> {
    uart: U,
    config: Dps5005Config,
}

impl<U: Uart> Dps5005<U> {
    /// Create a driver on an open serial link
    pub fn new(uart: U, config: Dps5005Config) -> Self {
        Self { uart, config }
    }

    /// Send a request and read back one complete response frame
    fn transact(&mut self, request: &[u8; 8]) -> Result<Vec<u8, MAX_FRAME>, HardwareError> {
        self.uart
            .write_blocking(request)
            .map_err(|e| bus_error(e.into()))?;
        self.uart.flush().map_err(|e| bus_error(e.into()))?;

        let mut header = [0u8; HEADER_LEN];
        self.uart.read_exact(&mut header).map_err(bus_error)?;
        let len = modbus::response_len(&header)?;
        if len > MAX_FRAME {
            return Err(HardwareError::Malformed);
        }

        let mut frame: Vec<u8, MAX_FRAME> = Vec::new();
        frame
            .resize(len, 0)
            .map_err(|_| HardwareError::Malformed)?;
        frame[..HEADER_LEN].copy_from_slice(&header);
        self.uart
            .read_exact(&mut frame[HEADER_LEN..])
            .map_err(bus_error)?;
        Ok(frame)
    }

    fn write_register(&mut self, register: u16, value: u16) -> Result<(), HardwareError> {
        let request = modbus::build_write_single(self.config.address, register, value);
        let frame = self.transact(&request)?;
        match modbus::parse(&frame, self.config.address)? {
            Response::Written {
                register: echoed,
                value: written,
            } if echoed == register && written == value => {
                debug!(register, value, "DPS5005 register written");
                Ok(())
            }
            _ => Err(HardwareError::Malformed),
        }
    }

    fn read_registers<const N: usize>(&mut self, start: u16) -> Result<[u16; N], HardwareError> {
        let request = modbus::build_read_request(self.config.address, start, N as u16);
        let frame = self.transact(&request)?;
        let response = modbus::parse(&frame, self.config.address)?;

        let mut values = [0u16; N];
        let mut count = 0;
        for (slot, value) in values.iter_mut().zip(response.registers()) {
            *slot = value;
            count += 1;
        }
        if count != N {
            return Err(HardwareError::Malformed);
        }
        Ok(values)
    }

    fn read_register(&mut self, register: u16) -> Result<u16, HardwareError> {
        let [value] = self.read_registers::<1>(register)?;
        Ok(value)
    }
}

impl<U: Uart> PowerSupply for Dps5005<U> {
    fn set_voltage(&mut self, volts: f32) -> Result<(), HardwareError> {
        let value = to_register(volts, VOLTAGE_SCALE, self.config.max_voltage)?;
        self.write_register(reg::U_SET, value)
    }

    fn set_current_limit(&mut self, amps: f32) -> Result<(), HardwareError> {
        let value = to_register(amps, CURRENT_SCALE, self.config.max_current)?;
        self.write_register(reg::I_SET, value)
    }

    fn set_output(&mut self, on: bool) -> Result<(), HardwareError> {
        self.write_register(reg::ONOFF, u16::from(on))
    }

    fn read_voltage(&mut self) -> Result<f32, HardwareError> {
        Ok(f32::from(self.read_register(reg::UOUT)?) / VOLTAGE_SCALE)
    }

    fn read_current(&mut self) -> Result<f32, HardwareError> {
        Ok(f32::from(self.read_register(reg::IOUT)?) / CURRENT_SCALE)
    }

    fn identify(&mut self) -> Result<PsuIdentity, HardwareError> {
        let [model, firmware] = self.read_registers::<2>(reg::MODEL)?;
        Ok(PsuIdentity { model, firmware })
    }
}
