//! Configuration loading
//!
//! Reads `electroplater.toml`. Falls back to built-in defaults when the
//! file does not exist.

pub mod loader;

pub use loader::{load_config, load_plating_settings, AppConfig, DevicesConfig};
