//! Predicate-driven periodic monitor
//!
//! Runs an action on a fixed interval for as long as a predicate holds,
//! then fires a distinct completion action exactly once.

pub mod periodic;
pub mod runner;

pub use periodic::{Fired, MonitorHandle, PeriodicMonitor};
pub use runner::{MonitorError, MonitorRunner, ThreadRunner};
