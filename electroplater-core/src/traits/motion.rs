//! Printer motion and bed temperature trait

use core::fmt;

use super::HardwareError;

/// Absolute move target
///
/// Axes left as `None` keep their current position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveTo {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl MoveTo {
    /// Move the X axis only
    pub const fn x(x: f32) -> Self {
        Self {
            x: Some(x),
            y: None,
            z: None,
        }
    }

    /// Move the Z axis only
    pub const fn z(z: f32) -> Self {
        Self {
            x: None,
            y: None,
            z: Some(z),
        }
    }

    /// Move X and Y together
    pub const fn xy(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    /// Check if no axis is set
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }
}

impl fmt::Display for MoveTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("G1")?;
        for (axis, value) in [('X', self.x), ('Y', self.y), ('Z', self.z)] {
            if let Some(v) = value {
                write!(f, " {}{}", axis, v)?;
            }
        }
        Ok(())
    }
}

/// Trait for the printer's motion system and bed heater
///
/// Commands are accepted by the printer but not awaited for physical
/// completion. Callers that need the head to arrive must wait explicitly.
pub trait Motion {
    /// Set the bed heater target (0 = off)
    fn set_bed_temperature(&mut self, celsius: f32) -> Result<(), HardwareError>;

    /// Select the active tool head
    fn select_tool(&mut self, tool: u8) -> Result<(), HardwareError>;

    /// Move to an absolute position
    fn move_absolute(&mut self, target: MoveTo) -> Result<(), HardwareError>;
}
