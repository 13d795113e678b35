//! Pump drivers

pub mod picon_zero;

pub use picon_zero::{PiconZero, PiconZeroConfig};
