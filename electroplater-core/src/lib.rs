//! Host-agnostic core logic for the electroplater station
//!
//! This crate contains the plating process itself, independent of how the
//! power supply, pump and printer are actually reached:
//!
//! - Hardware abstraction traits (power supply, pump, motion)
//! - Validated plating parameters and station layout
//! - Phase state machine and plating session record
//! - Predicate-driven periodic monitor
//! - Safety shutdown procedure
//! - The plating controller tying them together

#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod monitor;
pub mod safety;
pub mod session;
pub mod state;
pub mod time;
pub mod traits;

#[cfg(test)]
pub(crate) mod sim;

pub use controller::{PlatingController, PlatingError, PlatingOutcome, PrintFinished, SessionHandle};
pub use state::{Event, Phase};
