//! Thread-safe access to the running session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::station::{lock, SharedStation};
use crate::session::{PlatingSession, SessionEnd};
use crate::state::Phase;

/// Cloneable handle for stopping and inspecting a session
///
/// Usable from any thread while the controller itself is blocked in
/// [`start`](super::PlatingController::start).
#[derive(Clone)]
pub struct SessionHandle {
    station: SharedStation,
    cancel: Arc<AtomicBool>,
}

impl SessionHandle {
    pub(crate) fn new(station: SharedStation, cancel: Arc<AtomicBool>) -> Self {
        Self { station, cancel }
    }

    /// Stop the active session
    ///
    /// During plating the monitor is cancelled and the hardware shut down
    /// before this returns. During positioning or priming the foreground
    /// sequence is asked to stop and shuts down at its next check.
    /// Returns false when there is nothing to stop.
    pub fn stop(&self) -> bool {
        let mut station = lock(&self.station);
        match station.phase() {
            Phase::Plating => {
                if let Some(monitor) = station.monitor.take() {
                    monitor.stop();
                }
                station.finish(SessionEnd::Stopped)
            }
            phase @ (Phase::Positioning | Phase::Priming) => {
                info!(%phase, "Stop requested");
                self.cancel.store(true, Ordering::SeqCst);
                true
            }
            phase => {
                warn!(%phase, "No active plating session to stop");
                false
            }
        }
    }

    /// Snapshot of the current session
    pub fn status(&self) -> Option<PlatingSession> {
        lock(&self.station).session.clone()
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        lock(&self.station).phase()
    }

    /// Clear a completed or faulted session
    pub fn acknowledge(&self) -> bool {
        lock(&self.station).acknowledge()
    }
}
