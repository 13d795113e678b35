//! TOML configuration file

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use electroplater_core::config::{PlatingSettings, StationConfig};

/// Contents of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Plating settings, validated when a print finishes
    pub plating: PlatingSettings,
    /// Station layout and timings
    pub station: StationConfig,
    /// Device ports
    pub devices: DevicesConfig,
}

/// Where the station's devices are attached
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevicesConfig {
    /// Serial port of the DPS5005
    pub psu_port: String,
    /// DPS5005 baud rate
    pub psu_baud: u32,
    /// DPS5005 Modbus address
    pub psu_address: u8,
    /// Highest voltage setpoint the supply will be sent (V)
    pub psu_max_voltage: f32,
    /// Highest current limit the supply will be sent (A)
    pub psu_max_current: f32,
    /// I2C bus of the pump board
    pub pump_i2c: String,
    /// Pump board output driving the pump (0 or 1)
    pub pump_motor: u8,
    /// Serial port of the printer
    pub printer_port: String,
    /// Printer baud rate
    pub printer_baud: u32,
    /// Serial read timeout (ms)
    pub io_timeout_ms: u64,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            psu_port: "/dev/ttyUSB0".into(),
            psu_baud: 9600,
            psu_address: 1,
            psu_max_voltage: 50.0,
            psu_max_current: 5.0,
            pump_i2c: "/dev/i2c-1".into(),
            pump_motor: 1,
            printer_port: "/dev/ttyACM0".into(),
            printer_baud: 115_200,
            io_timeout_ms: 1000,
        }
    }
}

/// Parse configuration text
pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Load the configuration file, using defaults if it does not exist
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let config =
        parse_config(&text).with_context(|| format!("failed to parse {}", path.display()))?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Re-read only the plating settings
pub fn load_plating_settings(path: &Path) -> Result<PlatingSettings> {
    Ok(load_config(path)?.plating)
}
