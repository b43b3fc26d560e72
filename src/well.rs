//! Well level estimator.
//!
//! The well has no level sensor.  Its fill is modelled as a fraction in
//! `[0, 1]` that rises linearly while the well pump is off (the aquifer
//! refills it over `fill_period`) and falls linearly while the pump runs
//! (the pump empties it over `empty_period`).
//!
//! The estimate is pulled, not pushed: every read and every pump
//! transition first folds the time elapsed since `last_update` into the
//! level under the pump state that held during that interval, then moves
//! `last_update` forward.  The result is therefore independent of how
//! often the controller polls.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::drivers::pump::PumpListener;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Percent
// ---------------------------------------------------------------------------

/// An integer percentage, guaranteed to lie in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percent(u8);

impl Percent {
    pub const EMPTY: Self = Self(0);
    pub const FULL: Self = Self(100);

    pub fn new(value: u8) -> Result<Self> {
        Self::try_from(value).map_err(Error::InvariantViolation)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// `floor(100 * fraction)` for a fraction already clamped to `[0, 1]`.
    ///
    /// Values within 1e-9 of an integer snap to it, so `n / 100` always
    /// maps back to `n` despite binary rounding (`0.57 * 100 < 57`).
    fn from_fraction(fraction: f64) -> Self {
        let scaled = fraction * 100.0;
        let nearest = scaled.round();
        let whole = if (scaled - nearest).abs() < 1e-9 {
            nearest
        } else {
            scaled.floor()
        };
        Self(whole.clamp(0.0, 100.0) as u8)
    }
}

impl TryFrom<u8> for Percent {
    type Error = String;

    fn try_from(value: u8) -> core::result::Result<Self, String> {
        if value <= 100 {
            Ok(Self(value))
        } else {
            Err(format!("level {value}% outside 0..=100"))
        }
    }
}

impl From<Percent> for u8 {
    fn from(p: Percent) -> u8 {
        p.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

pub struct WellEstimator {
    /// Fraction full, always in `[0, 1]`.
    level: f64,
    fill_period: Duration,
    empty_period: Duration,
    /// True while the well pump is running.
    draining: bool,
    last_update: DateTime<Utc>,
}

impl WellEstimator {
    /// Start an estimate at `level` as of `last_update`, pump off.
    ///
    /// The pump is always assumed off at construction: after a restart the
    /// outputs are forced off, and the downtime is credited as refill.
    /// Both periods must be non-zero (see [`Settings::validate`]).
    pub fn new(
        fill_period: Duration,
        empty_period: Duration,
        level: Percent,
        last_update: DateTime<Utc>,
    ) -> Self {
        Self {
            level: f64::from(level.get()) / 100.0,
            fill_period,
            empty_period,
            draining: false,
            last_update,
        }
    }

    pub fn from_settings(settings: &Settings, level: Percent, last_update: DateTime<Utc>) -> Self {
        Self::new(settings.fill_period, settings.empty_period, level, last_update)
    }

    /// Current level, truncated to a whole percent.
    pub fn level(&mut self, now: DateTime<Utc>) -> Percent {
        self.update(now);
        Percent::from_fraction(self.level)
    }

    /// Raw fraction as of the last update (no recomputation).
    pub fn fraction(&self) -> f64 {
        self.level
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    fn update(&mut self, now: DateTime<Utc>) {
        // A clock stepped backwards contributes no elapsed time.
        let elapsed = (now - self.last_update).to_std().unwrap_or_default();
        let delta = if self.draining {
            -(elapsed.as_secs_f64() / self.empty_period.as_secs_f64())
        } else {
            elapsed.as_secs_f64() / self.fill_period.as_secs_f64()
        };
        self.level = (self.level + delta).clamp(0.0, 1.0);
        self.last_update = now;
    }
}

impl PumpListener for WellEstimator {
    fn on_activated(&mut self, now: DateTime<Utc>) {
        if self.draining {
            return;
        }
        self.update(now);
        self.draining = true;
        debug!("Well: draining from {:.3}", self.level);
    }

    fn on_deactivated(&mut self, now: DateTime<Utc>) {
        if !self.draining {
            return;
        }
        self.update(now);
        self.draining = false;
        debug!("Well: refilling from {:.3}", self.level);
    }
}
