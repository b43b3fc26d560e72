//! Point-in-time capture of the whole plant.
//!
//! A [`Snapshot`] is a plain value.  Cloning it yields an independent copy,
//! so anything stored in the history is unaffected by later ticks.
//! Equality ignores [`Snapshot::time`]: two captures that differ only in
//! when they were taken describe the same plant state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::ports::Document;
use crate::error::{Error, Result};
use crate::fsm::ControlState;
use crate::sensors::tank::TankLevel;
use crate::well::Percent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Capture time.  Excluded from equality.
    pub time: DateTime<Utc>,
    pub well_level: Percent,
    pub lower_tank_level: TankLevel,
    pub upper_tank_level: TankLevel,
    pub well_to_lower_tank_pump_active: bool,
    pub lower_to_upper_tank_pump_active: bool,
    pub current_state: ControlState,
    pub state_activated_at: DateTime<Utc>,
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.well_level == other.well_level
            && self.lower_tank_level == other.lower_tank_level
            && self.upper_tank_level == other.upper_tank_level
            && self.well_to_lower_tank_pump_active == other.well_to_lower_tank_pump_active
            && self.lower_to_upper_tank_pump_active == other.lower_to_upper_tank_pump_active
            && self.current_state == other.current_state
            && self.state_activated_at == other.state_activated_at
    }
}

impl Eq for Snapshot {}

impl Snapshot {
    /// The state assumed when nothing was persisted: waiting for the well
    /// to fill from empty, both tanks empty, both pumps off.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            time: now,
            well_level: Percent::EMPTY,
            lower_tank_level: TankLevel::Empty,
            upper_tank_level: TankLevel::Empty,
            well_to_lower_tank_pump_active: false,
            lower_to_upper_tank_pump_active: false,
            current_state: ControlState::FillWell,
            state_activated_at: now,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::CorruptState {
            document: Document::Snapshot,
            reason: e.to_string(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::CorruptState {
            document: Document::Snapshot,
            reason: e.to_string(),
        })
    }
}
