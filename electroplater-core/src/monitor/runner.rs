//! Scheduling of periodic monitors

use std::thread;

use thiserror::Error;
use tracing::debug;

use super::periodic::PeriodicMonitor;

/// Monitor scheduling errors
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The monitor thread could not be created
    #[error("failed to spawn monitor thread")]
    Spawn(#[source] std::io::Error),
}

/// Something that drives a [`PeriodicMonitor`] without blocking the caller
pub trait MonitorRunner: Send + Sync {
    /// Take ownership of `monitor` and start ticking it
    fn launch(&self, monitor: PeriodicMonitor) -> Result<(), MonitorError>;
}

/// Runs each monitor on its own OS thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRunner;

/// Name given to monitor threads
pub const MONITOR_THREAD_NAME: &str = "plating-monitor";

impl MonitorRunner for ThreadRunner {
    fn launch(&self, monitor: PeriodicMonitor) -> Result<(), MonitorError> {
        let interval = monitor.handle().interval();
        thread::Builder::new()
            .name(MONITOR_THREAD_NAME.into())
            .spawn(move || monitor.run())
            .map_err(MonitorError::Spawn)?;
        debug!(?interval, "Monitor thread started");
        Ok(())
    }
}
