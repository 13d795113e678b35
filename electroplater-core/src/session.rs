//! Plating session record
//!
//! One session covers a single print from "print finished" until the
//! hardware has been shut down. The controller owns it exclusively.

use core::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::PlatingParameters;
use crate::state::{Event, Phase};
use crate::traits::HardwareError;

/// What went wrong in a faulted session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// A hardware proxy reported an error
    Hardware(HardwareError),
    /// Priming pumped the maximum number of bursts without current flow
    PrimingExhausted { bursts: u32 },
    /// The plating monitor could not be scheduled
    MonitorUnavailable,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Hardware(e) => write!(f, "hardware error: {}", e),
            FaultKind::PrimingExhausted { bursts } => {
                write!(f, "no current after {} pump bursts", bursts)
            }
            FaultKind::MonitorUnavailable => f.write_str("plating monitor could not start"),
        }
    }
}

/// Fault cause with the phase it happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReason {
    pub phase: Phase,
    pub kind: FaultKind,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} during {}", self.kind, self.phase)
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Plating ran for the full duration
    DurationElapsed,
    /// Operator stopped the session
    Stopped,
    /// A fault ended the session
    Faulted(FaultReason),
}

impl SessionEnd {
    /// Event that moves the phase machine to the matching terminal phase
    fn event(&self) -> Event {
        match self {
            SessionEnd::DurationElapsed => Event::DurationElapsed,
            SessionEnd::Stopped => Event::Stop,
            SessionEnd::Faulted(_) => Event::Fault,
        }
    }
}

/// Check if the plating window is still open at `now`
///
/// True on `[started_at, started_at + duration)`, false from the end
/// of the window onwards.
pub fn plating_window_open(started_at: Instant, duration: Duration, now: Instant) -> bool {
    now.saturating_duration_since(started_at) < duration
}

/// State of one plating run
#[derive(Debug, Clone, PartialEq)]
pub struct PlatingSession {
    parameters: PlatingParameters,
    phase: Phase,
    started_at: Option<Instant>,
    last_observed_current: f32,
    priming_bursts: u32,
    end: Option<SessionEnd>,
}

impl PlatingSession {
    /// Create a session entering the positioning phase
    pub fn new(parameters: PlatingParameters) -> Self {
        let mut session = Self {
            parameters,
            phase: Phase::Idle,
            started_at: None,
            last_observed_current: 0.0,
            priming_bursts: 0,
            end: None,
        };
        session.advance(Event::Start);
        session
    }

    /// Apply an event to the phase machine
    ///
    /// Returns the phase after the event.
    pub fn advance(&mut self, event: Event) -> Phase {
        let next = self.phase.transition(event);
        if next != self.phase {
            info!(
                from = %self.phase,
                to = %next,
                source = event.source(),
                "Plating phase changed"
            );
            self.phase = next;
        }
        next
    }

    /// Record the start of the timed plating phase
    pub fn begin_plating(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Record a current reading
    pub fn record_current(&mut self, amps: f32) {
        self.last_observed_current = amps;
    }

    /// Record one priming pump burst
    pub fn record_burst(&mut self) {
        self.priming_bursts = self.priming_bursts.saturating_add(1);
    }

    /// End the session
    ///
    /// Only the first end is recorded; later calls are ignored and return
    /// false.
    pub fn finish(&mut self, end: SessionEnd) -> bool {
        if !self.phase.is_active() {
            return false;
        }
        self.end = Some(end);
        self.advance(end.event());
        true
    }

    /// Session parameters
    pub fn parameters(&self) -> &PlatingParameters {
        &self.parameters
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Start of the plating phase, if reached
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Time spent plating so far
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
    }

    /// Last current reading (A)
    pub fn last_observed_current(&self) -> f32 {
        self.last_observed_current
    }

    /// Pump bursts issued while priming
    pub fn priming_bursts(&self) -> u32 {
        self.priming_bursts
    }

    /// How the session ended, once it has
    pub fn end(&self) -> Option<SessionEnd> {
        self.end
    }
}
