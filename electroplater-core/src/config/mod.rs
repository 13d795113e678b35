//! Configuration types
//!
//! Plating settings arrive from the host at signal time and are validated
//! into [`PlatingParameters`] once per session. The [`StationConfig`]
//! describes the physical layout and timings of the plating station.

pub mod settings;
pub mod station;

pub use settings::{ConfigError, PlatingParameters, PlatingSettings};
pub use station::StationConfig;
