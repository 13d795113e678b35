//! Plating phase state machine
//!
//! The phase sequence is explicit, finite and deterministic. Hardware
//! actions are performed by the controller on entry to each phase.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::Phase;
