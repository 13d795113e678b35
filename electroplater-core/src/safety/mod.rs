//! Safety shutdown
//!
//! Brings the station to a de-energized, parked state.

pub mod shutdown;

pub use shutdown::{safety_shutdown, ShutdownReport, ShutdownStep};
