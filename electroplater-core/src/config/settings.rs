//! Plating settings and validated parameters

use core::time::Duration;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Seconds per hour of plating time
const SECS_PER_HOUR: u64 = 3600;

/// Configuration errors that prevent a session from starting
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// A parameter that must be strictly positive is not
    #[error("{field} must be positive, got {value}")]
    NotPositive {
        /// Settings key
        field: &'static str,
        /// Offending value
        value: f64,
    },
    /// Lowering the anode by the immersion depth would hit the build plate
    #[error("cup height {cup_height_mm} mm is too shallow for a {immersion_depth_mm} mm immersion")]
    CupTooShallow {
        cup_height_mm: u16,
        immersion_depth_mm: u16,
    },
}

/// Raw plating settings as stored by the host
///
/// Field names match the host's settings keys. Nothing here is trusted
/// until [`PlatingParameters::from_settings`] has checked it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlatingSettings {
    /// Run the plating process when a print finishes
    pub plate_after_print: bool,
    /// Plating duration in hours
    pub plating_time: i32,
    /// Plating voltage (V)
    pub plating_voltage: f32,
    /// Maximum allowed current (A)
    pub max_current: f32,
    /// Bed temperature held while plating (°C)
    pub bed_temperature: i32,
    /// Electrolyte volume (ml)
    pub solution_volume: i32,
    /// Height of the printed cup (mm)
    pub cup_height: i32,
}

impl Default for PlatingSettings {
    fn default() -> Self {
        Self {
            plate_after_print: false,
            plating_time: 6,
            plating_voltage: 1.0,
            max_current: 0.1,
            bed_temperature: 60,
            solution_volume: 100,
            cup_height: 25,
        }
    }
}

/// Validated plating parameters
///
/// Immutable once a session starts. Every value is strictly positive and
/// the duration bounds the plating phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatingParameters {
    voltage: f32,
    current_limit: f32,
    duration: Duration,
    bed_temperature_c: u16,
    cup_height_mm: u16,
    solution_volume_ml: u32,
}

impl PlatingParameters {
    /// Build parameters from explicit values
    ///
    /// # Arguments
    /// - `voltage`: plating voltage in volts
    /// - `current_limit`: current limit in amps
    /// - `hours`: plating duration in whole hours
    /// - `bed_temperature_c`: bed temperature in °C
    /// - `cup_height_mm`: printed cup height in mm
    /// - `solution_volume_ml`: electrolyte volume in ml
    pub fn new(
        voltage: f32,
        current_limit: f32,
        hours: i32,
        bed_temperature_c: i32,
        cup_height_mm: i32,
        solution_volume_ml: i32,
    ) -> Result<Self, ConfigError> {
        let voltage = positive_f32("plating_voltage", voltage)?;
        let current_limit = positive_f32("max_current", current_limit)?;
        let hours = positive_int::<u32>("plating_time", hours)?;
        let bed_temperature_c = positive_int::<u16>("bed_temperature", bed_temperature_c)?;
        let cup_height_mm = positive_int::<u16>("cup_height", cup_height_mm)?;
        let solution_volume_ml = positive_int::<u32>("solution_volume", solution_volume_ml)?;

        Ok(Self {
            voltage,
            current_limit,
            duration: Duration::from_secs(u64::from(hours) * SECS_PER_HOUR),
            bed_temperature_c,
            cup_height_mm,
            solution_volume_ml,
        })
    }

    /// Validate host settings
    pub fn from_settings(settings: &PlatingSettings) -> Result<Self, ConfigError> {
        Self::new(
            settings.plating_voltage,
            settings.max_current,
            settings.plating_time,
            settings.bed_temperature,
            settings.cup_height,
            settings.solution_volume,
        )
    }

    /// Plating voltage (V)
    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    /// Current limit (A)
    pub fn current_limit(&self) -> f32 {
        self.current_limit
    }

    /// Length of the plating phase
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Bed temperature (°C)
    pub fn bed_temperature_c(&self) -> u16 {
        self.bed_temperature_c
    }

    /// Printed cup height (mm)
    pub fn cup_height_mm(&self) -> u16 {
        self.cup_height_mm
    }

    /// Electrolyte volume (ml)
    pub fn solution_volume_ml(&self) -> u32 {
        self.solution_volume_ml
    }
}

fn positive_f32(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    // NaN fails this comparison as well
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive {
            field,
            value: f64::from(value),
        })
    }
}

fn positive_int<T: TryFrom<i32>>(field: &'static str, value: i32) -> Result<T, ConfigError> {
    let not_positive = ConfigError::NotPositive {
        field,
        value: f64::from(value),
    };
    if value <= 0 {
        return Err(not_positive);
    }
    T::try_from(value).map_err(|_| not_positive)
}
