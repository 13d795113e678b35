//! Hardware, session and monitor behind one lock
//!
//! The foreground sequence, monitor callbacks and session handles all go
//! through this lock, so hardware commands never interleave and shutdown
//! always sees a consistent session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::StationConfig;
use crate::monitor::MonitorHandle;
use crate::safety::{safety_shutdown, ShutdownReport};
use crate::session::{FaultKind, FaultReason, PlatingSession, SessionEnd};
use crate::state::{Event, Phase};
use crate::traits::{Hardware, HardwareError};

pub(crate) type SharedStation = Arc<Mutex<Station>>;

/// Lock the station, recovering from a poisoned lock
///
/// A panic elsewhere must never prevent the hardware from being shut down.
pub(crate) fn lock(station: &Mutex<Station>) -> MutexGuard<'_, Station> {
    station.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Station {
    pub(crate) hardware: Hardware,
    pub(crate) config: StationConfig,
    pub(crate) session: Option<PlatingSession>,
    pub(crate) monitor: Option<MonitorHandle>,
}

impl Station {
    pub(crate) fn new(hardware: Hardware, config: StationConfig) -> Self {
        Self {
            hardware,
            config,
            session: None,
            monitor: None,
        }
    }

    /// Phase of the current session, Idle without one
    pub(crate) fn phase(&self) -> Phase {
        self.session
            .as_ref()
            .map_or(Phase::Idle, PlatingSession::phase)
    }

    /// Run the safety shutdown, stopping any monitor
    pub(crate) fn shutdown(&mut self) -> ShutdownReport {
        let monitor = self.monitor.take();
        safety_shutdown(&mut self.hardware, &self.config, monitor)
    }

    /// End the active session and shut the hardware down
    ///
    /// Does nothing if no session is active, so racing callers shut down
    /// only once.
    pub(crate) fn finish(&mut self, end: SessionEnd) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.finish(end) {
            return false;
        }

        match end {
            SessionEnd::DurationElapsed => info!("Plating complete"),
            SessionEnd::Stopped => info!("Plating session stopped"),
            SessionEnd::Faulted(reason) => error!(%reason, "Plating session faulted"),
        }

        let report = self.shutdown();
        if !report.is_clean() {
            warn!(
                failed_steps = report.failures().len(),
                "Hardware may not be fully safe, check the station"
            );
        }
        true
    }

    /// Fault the active session
    pub(crate) fn fault(&mut self, phase: Phase, kind: FaultKind) -> bool {
        self.finish(SessionEnd::Faulted(FaultReason { phase, kind }))
    }

    /// Log live readings for the plating phase
    ///
    /// A failed read faults the session.
    pub(crate) fn report_progress(&mut self, now: Instant) {
        if self.phase() != Phase::Plating {
            return;
        }

        match read_output(&mut self.hardware) {
            Ok((volts, amps)) => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.record_current(amps);
                let elapsed_min = session.elapsed(now).unwrap_or_default().as_secs() / 60;
                let total_min = session.parameters().duration().as_secs() / 60;
                info!(volts, amps, elapsed_min, total_min, "Plating");
                if amps <= 0.0 {
                    warn!("No current through the plating circuit");
                }
            }
            Err(e) => {
                self.fault(Phase::Plating, FaultKind::Hardware(e));
            }
        }
    }

    /// Drop a terminal session, returning to Idle
    pub(crate) fn acknowledge(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) if session.phase().is_terminal() => {
                session.advance(Event::Acknowledge);
                self.session = None;
                true
            }
            _ => false,
        }
    }
}

/// Read PSU output voltage and current
pub(crate) fn read_output(hw: &mut Hardware) -> Result<(f32, f32), HardwareError> {
    let volts = hw.psu.read_voltage()?;
    let amps = hw.psu.read_current()?;
    Ok((volts, amps))
}
