//! Station layout and timing configuration
//!
//! Describes where the anode/pump tool head parks over the build plate,
//! how far it is lowered into the cup, and how long each physical step is
//! given to complete.

use core::time::Duration;

use crate::traits::MoveTo;

use super::settings::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nominal pump delivery rate (ml/s) at full speed
pub const PUMP_FLOW_ML_PER_S: f32 = 1.255;

/// Safety margin applied to the derived priming burst limit
const PRIMING_MARGIN: u32 = 2;

/// Station layout and timings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StationConfig {
    /// Tool index carrying the anode and pump pipe
    pub anode_tool: u8,
    /// X position beneath the latch ledge (mm)
    pub latch_x_mm: f32,
    /// Z height that bumps the tool into its latch (mm)
    pub latch_engage_z_mm: f32,
    /// Z height after engaging the latch (mm)
    pub latch_release_z_mm: f32,
    /// X of the build plate centre (mm)
    pub plate_center_x_mm: f32,
    /// Y of the build plate centre (mm)
    pub plate_center_y_mm: f32,
    /// Clearance above the cup rim while settling (mm)
    pub approach_clearance_mm: u16,
    /// Depth below the cup rim while plating (mm)
    pub immersion_depth_mm: u16,
    /// Z height that lifts the anode out of the solution (mm)
    pub withdraw_z_mm: f32,
    /// X position clear of the build volume (mm)
    pub park_x_mm: f32,
    /// Pause between voltage and current setpoint writes (ms)
    pub setpoint_delay_ms: u32,
    /// Time allowed for the tool head to reach the cup (s)
    pub settle_delay_s: u32,
    /// Length of one priming pump burst (ms)
    pub pump_burst_ms: u32,
    /// Pump speed during priming (signed %)
    pub pump_speed_percent: i8,
    /// Plating monitor interval (s)
    pub monitor_interval_s: u32,
    /// Upper bound on priming bursts, derived from the solution volume when unset
    pub max_priming_bursts: Option<u32>,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            anode_tool: 1,
            latch_x_mm: 340.0,
            latch_engage_z_mm: 329.0,
            latch_release_z_mm: 300.0,
            plate_center_x_mm: 197.0,
            plate_center_y_mm: 172.0,
            approach_clearance_mm: 5,
            immersion_depth_mm: 10,
            withdraw_z_mm: 50.0,
            park_x_mm: 362.0,
            setpoint_delay_ms: 3_000,
            settle_delay_s: 180,
            pump_burst_ms: 2_000,
            pump_speed_percent: -100,
            monitor_interval_s: 60,
            max_priming_bursts: None,
        }
    }
}

impl StationConfig {
    /// Check the cup is deep enough to immerse the anode
    pub fn check_cup_height(&self, cup_height_mm: u16) -> Result<(), ConfigError> {
        if cup_height_mm > self.immersion_depth_mm {
            Ok(())
        } else {
            Err(ConfigError::CupTooShallow {
                cup_height_mm,
                immersion_depth_mm: self.immersion_depth_mm,
            })
        }
    }

    /// Z height held while the tool head settles over the cup
    pub fn approach_z(&self, cup_height_mm: u16) -> f32 {
        f32::from(cup_height_mm) - f32::from(self.approach_clearance_mm)
    }

    /// Z height of the anode while plating
    pub fn immersion_z(&self, cup_height_mm: u16) -> f32 {
        f32::from(cup_height_mm) - f32::from(self.immersion_depth_mm)
    }

    /// Moves that carry the anode from the latch to just above the cup
    pub fn deploy_moves(&self, cup_height_mm: u16) -> [MoveTo; 5] {
        [
            MoveTo::x(self.latch_x_mm),
            MoveTo::z(self.latch_engage_z_mm),
            MoveTo::z(self.latch_release_z_mm),
            MoveTo::xy(self.plate_center_x_mm, self.plate_center_y_mm),
            MoveTo::z(self.approach_z(cup_height_mm)),
        ]
    }

    /// Moves that lift the anode out of the solution and park it
    pub fn withdraw_moves(&self) -> [MoveTo; 2] {
        [MoveTo::z(self.withdraw_z_mm), MoveTo::x(self.park_x_mm)]
    }

    /// Maximum number of priming bursts for the given solution volume
    ///
    /// Without an explicit limit, allows twice the bursts needed to pump
    /// the whole volume at the nominal flow rate.
    pub fn priming_burst_limit(&self, solution_volume_ml: u32) -> u32 {
        if let Some(limit) = self.max_priming_bursts {
            return limit;
        }
        let ml_per_burst = PUMP_FLOW_ML_PER_S * self.pump_burst_ms as f32 / 1000.0;
        if ml_per_burst <= 0.0 {
            return PRIMING_MARGIN;
        }
        let bursts = (solution_volume_ml as f32 / ml_per_burst).ceil() as u32;
        bursts.max(1).saturating_mul(PRIMING_MARGIN)
    }

    /// Pause between setpoint writes
    pub fn setpoint_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.setpoint_delay_ms))
    }

    /// Settle time before priming
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.settle_delay_s))
    }

    /// Length of one pump burst
    pub fn pump_burst(&self) -> Duration {
        Duration::from_millis(u64::from(self.pump_burst_ms))
    }

    /// Interval between plating monitor ticks
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.monitor_interval_s))
    }
}
