//! Per-state checks and actions.
//!
//! Each state is a variant of [`ControlState`]; behaviour lives in two
//! exhaustive matches instead of a table of handlers.
//!
//! ```text
//!  FILL_WELL ──[well 100%]──▶ FILL_LOWER ──[lower full]──▶ SETTLE_LOWER
//!      ▲                        │  ▲  ▲                      │      │
//!      └──────[well 0%]─────────┘  │  └──[lower not full]────┘ [settled]
//!                                  │                                │
//!                          [lower empty]                            ▼
//!                                  ├──────────────────────── FILL_UPPER
//!                                  │                           │    ▲
//!                                  │                   [upper full] [upper empty]
//!                                  │                           ▼    │
//!                                  └──[lower empty]──── UPPER_IN_USE
//! ```
//!
//! Predicates are tested in the order written; the first match wins.

use log::debug;

use super::ControlState;
use super::context::FsmContext;
use crate::sensors::tank::TankLevel;
use crate::well::Percent;

/// Decide the successor of `state` from the current readings.  Returns
/// `state` itself to stay.
pub fn check(state: ControlState, ctx: &FsmContext) -> ControlState {
    let r = &ctx.readings;
    match state {
        ControlState::FillWell => {
            if r.well_level == Percent::FULL {
                return ControlState::FillLowerTank;
            }
            ControlState::FillWell
        }
        ControlState::FillLowerTank => {
            if r.lower_tank == TankLevel::Full {
                return ControlState::SettleLowerTank;
            }
            if r.well_level == Percent::EMPTY {
                return ControlState::FillWell;
            }
            ControlState::FillLowerTank
        }
        ControlState::SettleLowerTank => {
            if r.lower_tank != TankLevel::Full {
                return ControlState::FillLowerTank;
            }
            if r.time_in_state > ctx.settle_time {
                debug!(
                    "SETTLE: {:.0}s elapsed (> {:.0}s)",
                    r.time_in_state.as_secs_f64(),
                    ctx.settle_time.as_secs_f64()
                );
                return ControlState::FillUpperTank;
            }
            ControlState::SettleLowerTank
        }
        ControlState::FillUpperTank => {
            if r.lower_tank == TankLevel::Empty {
                return ControlState::FillLowerTank;
            }
            if r.upper_tank == TankLevel::Full {
                return ControlState::UpperTankInUse;
            }
            ControlState::FillUpperTank
        }
        ControlState::UpperTankInUse => {
            if r.lower_tank == TankLevel::Empty {
                return ControlState::FillLowerTank;
            }
            if r.upper_tank == TankLevel::Empty {
                return ControlState::FillUpperTank;
            }
            ControlState::UpperTankInUse
        }
    }
}

/// Write the pump outputs `state` requires into `ctx.commands`.
pub fn act(state: ControlState, ctx: &mut FsmContext) {
    let c = &mut ctx.commands;
    match state {
        ControlState::FillLowerTank => {
            c.well_pump = true;
            c.transfer_pump = false;
        }
        ControlState::FillUpperTank => {
            c.well_pump = false;
            c.transfer_pump = true;
        }
        ControlState::FillWell | ControlState::SettleLowerTank | ControlState::UpperTankInUse => {
            c.well_pump = false;
            c.transfer_pump = false;
        }
    }
}
