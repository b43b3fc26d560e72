//! Transfer sequencing state machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  tick(now)                                                   │
//! │                                                              │
//! │   state ──check──▶ next ──(next != state)──▶ check(next) ... │
//! │                      │                                       │
//! │                 (next == state)                              │
//! │                      ▼                                       │
//! │               settled: act(settled) once                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the machine evaluates [`states::check`] for the current
//! state and keeps following transitions within the same tick until a
//! state checks to itself.  Only that settled state's
//! [`states::act`] runs, and the entry timestamp moves only if the
//! settled state differs from the state the tick started in.

pub mod context;
pub mod states;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use context::FsmContext;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state of the transfer cycle.  Serialized by variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlState {
    FillWell,
    FillLowerTank,
    SettleLowerTank,
    FillUpperTank,
    UpperTankInUse,
}

impl ControlState {
    /// Total number of states. Bounds the per-tick transition chain.
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::FillWell,
        Self::FillLowerTank,
        Self::SettleLowerTank,
        Self::FillUpperTank,
        Self::UpperTankInUse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::FillWell => "FillWell",
            Self::FillLowerTank => "FillLowerTank",
            Self::SettleLowerTank => "SettleLowerTank",
            Self::FillUpperTank => "FillUpperTank",
            Self::UpperTankInUse => "UpperTankInUse",
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A settled change of state within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ControlState,
    pub to: ControlState,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct StateMachine {
    current: ControlState,
    /// When `current` was entered.
    activated_at: DateTime<Utc>,
}

impl StateMachine {
    /// Start (or resume) in `state`, entered at `activated_at`.
    pub fn new(state: ControlState, activated_at: DateTime<Utc>) -> Self {
        Self {
            current: state,
            activated_at,
        }
    }

    pub fn current_state(&self) -> ControlState {
        self.current
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// Time spent in the current state as of `now` (zero if the clock is
    /// behind the entry timestamp).
    pub fn time_in_state(&self, now: DateTime<Utc>) -> Duration {
        (now - self.activated_at).to_std().unwrap_or_default()
    }

    /// Evaluate checks to a fixed point, then write the settled state's
    /// pump commands into `ctx`.
    ///
    /// `ctx.readings` must hold this tick's sensor and well readings; its
    /// `time_in_state` is filled in here.
    pub fn advance(&mut self, ctx: &mut FsmContext, now: DateTime<Utc>) -> Result<Option<Transition>> {
        let start = self.current;
        let mut state = start;
        ctx.readings.time_in_state = self.time_in_state(now);

        let mut settled = false;
        // No two checks form a cycle under one set of readings, so the
        // chain visits each state at most once.
        for _ in 0..=ControlState::COUNT {
            let next = states::check(state, ctx);
            if next == state {
                settled = true;
                break;
            }
            info!("FSM transition: {} -> {}", state, next);
            state = next;
            ctx.readings.time_in_state = Duration::ZERO;
        }
        if !settled {
            return Err(Error::InvariantViolation(format!(
                "state machine did not settle from {start} (readings {:?})",
                ctx.readings
            )));
        }

        states::act(state, ctx);

        if state == start {
            return Ok(None);
        }
        self.current = state;
        self.activated_at = now;
        Ok(Some(Transition { from: start, to: state }))
    }
}
