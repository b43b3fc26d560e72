//! Float-switch tank level sensing.
//!
//! Each tank carries two float switches ("floaters"): one near the
//! bottom and one near the top.  A floater reads *active* while it is
//! submerged.  Together they yield a three-level reading:
//!
//! | low floater | high floater | level    |
//! |-------------|--------------|----------|
//! | inactive    | any          | `Empty`  |
//! | active      | inactive     | `Medium` |
//! | active      | active       | `Full`   |
//!
//! A high floater that reads active while the low one does not is a
//! stuck or miswired switch; the tank is reported `Empty` so nothing is
//! pumped out of it.

use std::fmt;

use embedded_hal::digital::InputPin;
use serde::{Deserialize, Serialize};

use crate::app::ports::LevelSensor;
use crate::error::{HardwareError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankLevel {
    Empty,
    Medium,
    Full,
}

impl TankLevel {
    /// Combine the two floater states into a level.
    pub fn from_floaters(low_active: bool, high_active: bool) -> Self {
        match (low_active, high_active) {
            (false, _) => Self::Empty,
            (true, false) => Self::Medium,
            (true, true) => Self::Full,
        }
    }
}

impl fmt::Display for TankLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Medium => write!(f, "medium"),
            Self::Full => write!(f, "full"),
        }
    }
}

/// Electrical level at which a floater counts as submerged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    /// Switch pulls the line to ground when closed (pull-up wiring).
    #[default]
    ActiveLow,
    ActiveHigh,
}

/// A tank sensed through two digital floater inputs.
pub struct FloaterTank<L, H> {
    name: &'static str,
    low: L,
    high: H,
    polarity: Polarity,
}

impl<L: InputPin, H: InputPin> FloaterTank<L, H> {
    pub fn new(name: &'static str, low: L, high: H, polarity: Polarity) -> Self {
        Self {
            name,
            low,
            high,
            polarity,
        }
    }

    fn is_active<P: InputPin>(pin: &mut P, polarity: Polarity, label: String) -> Result<bool> {
        let high = pin.is_high().map_err(|e| HardwareError::InputRead {
            pin: label,
            reason: format!("{e:?}"),
        })?;
        Ok(match polarity {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        })
    }
}

impl<L: InputPin, H: InputPin> LevelSensor for FloaterTank<L, H> {
    fn level(&mut self) -> Result<TankLevel> {
        let low = Self::is_active(&mut self.low, self.polarity, format!("{} low floater", self.name))?;
        let high = Self::is_active(&mut self.high, self.polarity, format!("{} high floater", self.name))?;
        if high && !low {
            log::warn!("{}: high floater active with low floater dry", self.name);
        }
        Ok(TankLevel::from_floaters(low, high))
    }
}
