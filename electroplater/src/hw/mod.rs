//! Host device wiring
//!
//! Opens the serial ports and I2C bus named in `[devices]` and wraps them
//! in the station drivers.

pub mod i2c;
pub mod serial;

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use electroplater_core::traits::Hardware;
use electroplater_drivers::motion::{GcodeConfig, GcodeMotion};
use electroplater_drivers::psu::{Dps5005, Dps5005Config};
use electroplater_drivers::pump::{PiconZero, PiconZeroConfig};
use electroplater_hal::uart::UartConfig;

use crate::config::DevicesConfig;

pub use i2c::I2cPort;
pub use serial::SerialUart;

/// Open the power supply link
pub fn open_psu(devices: &DevicesConfig) -> Result<Dps5005<SerialUart>> {
    let uart = SerialUart::open(
        &devices.psu_port,
        UartConfig::with_baudrate(devices.psu_baud),
        Duration::from_millis(devices.io_timeout_ms),
    )
    .with_context(|| format!("failed to open power supply port {}", devices.psu_port))?;

    Ok(Dps5005::new(
        uart,
        Dps5005Config {
            address: devices.psu_address,
            max_voltage: devices.psu_max_voltage,
            max_current: devices.psu_max_current,
        },
    ))
}

/// Open every station device
pub fn open_hardware(devices: &DevicesConfig) -> Result<Hardware> {
    let psu = open_psu(devices)?;

    let bus = I2cPort::open(&devices.pump_i2c)
        .with_context(|| format!("failed to open pump bus {}", devices.pump_i2c))?;
    let pump = PiconZero::new(
        bus,
        PiconZeroConfig {
            motor: devices.pump_motor,
            ..PiconZeroConfig::default()
        },
    );

    let printer = SerialUart::open(
        &devices.printer_port,
        UartConfig::with_baudrate(devices.printer_baud),
        Duration::from_millis(devices.io_timeout_ms),
    )
    .with_context(|| format!("failed to open printer port {}", devices.printer_port))?;
    let motion = GcodeMotion::new(printer, GcodeConfig::default());

    info!(
        psu = %devices.psu_port,
        pump = %devices.pump_i2c,
        printer = %devices.printer_port,
        "Station devices opened"
    );
    Ok(Hardware::new(psu, pump, motion))
}
