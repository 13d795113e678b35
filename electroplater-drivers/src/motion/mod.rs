//! Printer motion drivers

pub mod gcode;

pub use gcode::{GcodeConfig, GcodeError, GcodeMotion};
