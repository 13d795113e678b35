//! Electrolyte pump trait

use super::HardwareError;

/// Trait for the electrolyte pump
///
/// Speed is a signed percentage (-100..=100). Which sign pumps solution
/// into the cup depends on how the pump is wired.
pub trait Pump {
    /// Run the pump at the given speed
    ///
    /// Acquires the pump controller if it was released.
    fn start(&mut self, speed_percent: i8) -> Result<(), HardwareError>;

    /// Stop the pump
    fn stop(&mut self) -> Result<(), HardwareError>;

    /// Release the pump controller
    ///
    /// Must be safe to call when already released, since every exit path
    /// calls it.
    fn release_resources(&mut self) -> Result<(), HardwareError>;
}
