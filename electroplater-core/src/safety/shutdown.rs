//! Safety shutdown sequence
//!
//! Power off, bed off, anode withdrawn and parked, pump released, then any
//! monitor stopped. Always in this order. A failing step is logged and the
//! rest still run, so the sequence can be called from any state and any
//! number of times.

use chrono::{DateTime, Local};
use core::fmt;
use heapless::Vec;
use tracing::{info, warn};

use crate::config::StationConfig;
use crate::monitor::MonitorHandle;
use crate::traits::{Hardware, HardwareError};

/// Shutdown steps that talk to hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    /// PSU output off
    PowerOff,
    /// Bed heater target 0 °C
    BedHeaterOff,
    /// Anode lifted out of the cup and parked
    WithdrawAnode,
    /// Pump stopped and its bus released
    ReleasePump,
}

impl ShutdownStep {
    /// Steps in execution order
    pub const ALL: [ShutdownStep; 4] = [
        ShutdownStep::PowerOff,
        ShutdownStep::BedHeaterOff,
        ShutdownStep::WithdrawAnode,
        ShutdownStep::ReleasePump,
    ];
}

impl fmt::Display for ShutdownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownStep::PowerOff => "power off",
            ShutdownStep::BedHeaterOff => "bed heater off",
            ShutdownStep::WithdrawAnode => "withdraw anode",
            ShutdownStep::ReleasePump => "release pump",
        };
        f.write_str(name)
    }
}

/// Outcome of one shutdown run
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    failures: Vec<(ShutdownStep, HardwareError), 4>,
    completed_at: DateTime<Local>,
}

impl ShutdownReport {
    /// True if every step succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Steps that failed, in execution order
    pub fn failures(&self) -> &[(ShutdownStep, HardwareError)] {
        &self.failures
    }

    /// Wall-clock time the sequence finished
    pub fn completed_at(&self) -> DateTime<Local> {
        self.completed_at
    }
}

/// Run the safety shutdown sequence
///
/// Never fails; step failures are collected in the report.
pub fn safety_shutdown(
    hw: &mut Hardware,
    station: &StationConfig,
    monitor: Option<MonitorHandle>,
) -> ShutdownReport {
    let mut failures = Vec::new();

    for step in ShutdownStep::ALL {
        if let Err(e) = run_step(hw, station, step) {
            warn!(%step, error = %e, "Safety shutdown step failed, continuing");
            // One entry per step, capacity matches ALL
            let _ = failures.push((step, e));
        }
    }

    let completed_at = Local::now();
    info!(
        completed_at = %completed_at.format("%Y-%m-%d %H:%M:%S"),
        failed_steps = failures.len(),
        "Safety shutdown complete"
    );

    if let Some(handle) = monitor {
        handle.stop();
    }

    ShutdownReport {
        failures,
        completed_at,
    }
}

fn run_step(
    hw: &mut Hardware,
    station: &StationConfig,
    step: ShutdownStep,
) -> Result<(), HardwareError> {
    match step {
        ShutdownStep::PowerOff => hw.psu.set_output(false),
        ShutdownStep::BedHeaterOff => hw.motion.set_bed_temperature(0.0),
        ShutdownStep::WithdrawAnode => {
            hw.motion.select_tool(station.anode_tool)?;
            for target in station.withdraw_moves() {
                hw.motion.move_absolute(target)?;
            }
            Ok(())
        }
        ShutdownStep::ReleasePump => hw.pump.release_resources(),
    }
}
