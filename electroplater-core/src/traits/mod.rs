//! Hardware abstraction traits
//!
//! These traits define the interface between the plating controller and
//! the devices it drives. Each hardware family sits behind its own narrow
//! interface; concrete implementations live in `electroplater-drivers`.

pub mod motion;
pub mod power_supply;
pub mod pump;

pub use motion::{Motion, MoveTo};
pub use power_supply::{PowerSupply, PsuIdentity};
pub use pump::Pump;

use thiserror::Error;

/// Errors reported by any hardware proxy
///
/// Transient I/O is expected to be retried below this layer. Anything that
/// surfaces here is fatal to the current plating session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HardwareError {
    /// Device did not answer in time
    #[error("device did not respond in time")]
    Timeout,
    /// Response failed its integrity check
    #[error("response checksum mismatch")]
    Checksum,
    /// Device or port disappeared
    #[error("device disconnected")]
    Disconnected,
    /// Device refused the command or value
    #[error("device rejected the command")]
    Rejected,
    /// Response could not be decoded
    #[error("malformed response")]
    Malformed,
    /// Unclassified bus failure
    #[error("bus fault")]
    Bus,
}

/// The set of devices owned by one plating station
///
/// Held exclusively by the controller; nothing else may command these
/// devices while a session is active.
pub struct Hardware {
    /// Programmable bench power supply feeding the anode
    pub psu: Box<dyn PowerSupply + Send>,
    /// Electrolyte pump
    pub pump: Box<dyn Pump + Send>,
    /// Printer motion and bed heater
    pub motion: Box<dyn Motion + Send>,
}

impl Hardware {
    /// Bundle the three device proxies
    pub fn new(
        psu: impl PowerSupply + Send + 'static,
        pump: impl Pump + Send + 'static,
        motion: impl Motion + Send + 'static,
    ) -> Self {
        Self {
            psu: Box::new(psu),
            pump: Box::new(pump),
            motion: Box::new(motion),
        }
    }
}
