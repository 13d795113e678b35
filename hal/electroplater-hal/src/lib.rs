//! Electroplater bus abstraction layer
//!
//! The plating station talks to its peripherals over two kinds of bus: a
//! serial line (power supply Modbus link, printer G-code link) and an I2C bus
//! (pump motor board). Drivers are written against the traits in this crate
//! so they can be exercised with in-memory buses and wired to real devices by
//! the host binary.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  electroplater (host binary)            │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌──────────────────┐   ┌─────────────────┐
//! │ electroplater-   │──▶│ electroplater-  │
//! │ drivers          │   │ hal (traits)    │
//! └──────────────────┘   └─────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`i2c::I2cBus`] - I2C bus operations

#![no_std]
#![deny(unsafe_code)]

pub mod i2c;
pub mod uart;

pub use i2c::I2cBus;
pub use uart::{Uart, UartRx, UartTx};

/// Classified bus failure
///
/// Bus implementations convert their native errors into one of these so
/// drivers can report a meaningful hardware error without knowing the
/// concrete bus type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// No data arrived within the configured timeout
    Timeout,
    /// The device node or port is gone
    Disconnected,
    /// The addressed I2C device did not acknowledge
    NoAcknowledge,
    /// Any other bus-level failure
    Other,
}
