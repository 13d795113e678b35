//! Events that trigger phase transitions

/// Events that can trigger phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Operator events
    /// Print finished and plating was requested
    Start,
    /// Explicit stop request
    Stop,
    /// Operator acknowledged a finished or faulted session
    Acknowledge,

    // Sequence events
    /// Tool head had time to settle over the cup
    Settled,
    /// Current flow detected, the anode touches solution
    CurrentDetected,
    /// Plating duration elapsed
    DurationElapsed,

    // Safety events
    /// Hardware failure or other fault
    Fault,
}

impl Event {
    /// Check if this event comes from outside the controller
    pub fn is_operator_event(&self) -> bool {
        matches!(self, Event::Start | Event::Stop | Event::Acknowledge)
    }

    /// Check if this event is produced by the plating sequence itself
    pub fn is_sequence_event(&self) -> bool {
        matches!(
            self,
            Event::Settled | Event::CurrentDetected | Event::DurationElapsed
        )
    }

    /// Short name of where this event came from, for logs
    pub fn source(&self) -> &'static str {
        if self.is_operator_event() {
            "operator"
        } else if self.is_sequence_event() {
            "sequence"
        } else {
            "safety"
        }
    }
}
