//! Inputs and outputs threaded through the state functions.
//!
//! `FsmContext` is the single struct that [`check`](super::states::check)
//! reads from and [`act`](super::states::act) writes to: the readings
//! taken at the start of the tick, the settle time from settings, and the
//! pump commands the settled state asks for.

use std::time::Duration;

use crate::sensors::tank::TankLevel;
use crate::well::Percent;

// ---------------------------------------------------------------------------
// Readings (read-only to state handlers; taken once per tick)
// ---------------------------------------------------------------------------

/// Everything a state's check may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    pub well_level: Percent,
    pub lower_tank: TankLevel,
    pub upper_tank: TankLevel,
    /// Time since the state under evaluation was entered.  Zero for a
    /// state reached earlier in the same tick.
    pub time_in_state: Duration,
}

impl Default for Readings {
    fn default() -> Self {
        Self {
            well_level: Percent::EMPTY,
            lower_tank: TankLevel::Empty,
            upper_tank: TankLevel::Empty,
            time_in_state: Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Pump commands (written by `act`; applied by the controller)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpCommands {
    /// Well -> lower tank.
    pub well_pump: bool,
    /// Lower tank -> upper tank.
    pub transfer_pump: bool,
}

impl PumpCommands {
    /// Both pumps off.
    pub fn all_off() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

pub struct FsmContext {
    pub readings: Readings,
    pub commands: PumpCommands,
    /// Dwell required in `SettleLowerTank`.
    pub settle_time: Duration,
}

impl FsmContext {
    pub fn new(settle_time: Duration) -> Self {
        Self {
            readings: Readings::default(),
            commands: PumpCommands::all_off(),
            settle_time,
        }
    }
}
