//! Phase definitions and transitions
//!
//! All hardware activity is a function of the current phase.

use core::fmt;

use super::events::Event;

/// Plating phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No session, hardware safe
    #[default]
    Idle,
    /// Bed heating, setpoints written, tool head moving over the cup
    Positioning,
    /// Power on, pumping electrolyte until current flows
    Priming,
    /// Anode immersed, timed plating in progress
    Plating,
    /// Session ended and hardware shut down
    Completed,
    /// Fault detected; hardware shut down
    Faulted,
}

impl Phase {
    /// Check if a session in this phase is still running
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Positioning | Phase::Priming | Phase::Plating)
    }

    /// Check if this is a terminal phase awaiting acknowledgement
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Faulted)
    }

    /// Process an event and return the next phase
    ///
    /// Pairs without a transition leave the phase unchanged.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use Phase::*;

        match (self, event) {
            // A new print replaces a finished session
            (Idle | Completed | Faulted, Start) => Positioning,

            (Positioning, Settled) => Priming,
            (Priming, CurrentDetected) => Plating,
            (Plating, DurationElapsed) => Completed,

            (Positioning | Priming | Plating, Stop) => Completed,
            (Positioning | Priming | Plating, Fault) => Faulted,

            (Completed | Faulted, Acknowledge) => Idle,

            // Default: stay in current phase
            _ => self,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Positioning => "positioning",
            Phase::Priming => "priming",
            Phase::Plating => "plating",
            Phase::Completed => "completed",
            Phase::Faulted => "faulted",
        };
        f.write_str(name)
    }
}
