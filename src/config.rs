//! Controller configuration.
//!
//! Two layers:
//!
//! - [`Settings`]: the plant description (periods, settle time, pins),
//!   loaded once from the JSON settings file and never changed at runtime.
//!   A missing or invalid settings file is fatal.
//! - [`RuntimeConfig`]: where the files live and how often to tick,
//!   taken from the environment with defaults.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Pin identifiers
// ---------------------------------------------------------------------------

/// A GPIO line as written in the settings file: either a bare number or a
/// token such as `"GPIO17"` / `"BCM17"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinId {
    Number(u32),
    Name(String),
}

impl PinId {
    /// Resolve to a kernel GPIO line number, if the identifier names one.
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Name(name) => {
                let upper = name.trim().to_ascii_uppercase();
                let digits = upper
                    .strip_prefix("GPIO")
                    .or_else(|| upper.strip_prefix("BCM"))
                    .unwrap_or(&upper);
                digits.parse().ok()
            }
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Longest accepted period.  Together with the millisecond resolution this
/// keeps every period exactly representable as fractional seconds.
pub const MAX_PERIOD: Duration = Duration::from_secs(366 * 24 * 3600);

/// Plant settings.  Periods are stored as seconds on disk, resolved to
/// whole milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Time for the well to refill from empty to full with its pump off.
    #[serde(with = "secs")]
    pub fill_period: Duration,
    /// Time for the well pump to drain a full well.
    #[serde(with = "secs")]
    pub empty_period: Duration,
    /// Minimum dwell with the lower tank full before transferring upward.
    #[serde(with = "secs")]
    pub settle_time: Duration,

    pub lower_tank_low_floater_pin: PinId,
    pub lower_tank_high_floater_pin: PinId,
    pub upper_tank_low_floater_pin: PinId,
    pub upper_tank_high_floater_pin: PinId,
    pub well_to_lower_tank_pump_pin: PinId,
    pub lower_to_upper_tank_pump_pin: PinId,
}

impl Settings {
    /// Load and validate the settings file.  Every failure is a
    /// [`Error::Configuration`]; the controller must not start on defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Configuration(format!("settings file {} not found", path.display()))
            } else {
                Error::Configuration(format!("cannot read {}: {e}", path.display()))
            }
        })?;
        let settings = Self::from_json(&text)
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?;
        log::info!(
            "Settings loaded from {}: fill={}s empty={}s settle={}s",
            path.display(),
            settings.fill_period.as_secs_f64(),
            settings.empty_period.as_secs_f64(),
            settings.settle_time.as_secs_f64()
        );
        Ok(settings)
    }

    /// Parse and validate a settings document.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(text).map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Range-check the settings.  Periods are divisors in the well model
    /// and must be non-zero; every pin must be used exactly once.
    pub fn validate(&self) -> Result<()> {
        if self.fill_period.is_zero() {
            return Err(Error::Configuration("fill_period must be positive".into()));
        }
        if self.empty_period.is_zero() {
            return Err(Error::Configuration("empty_period must be positive".into()));
        }
        for (name, period) in [
            ("fill_period", self.fill_period),
            ("empty_period", self.empty_period),
            ("settle_time", self.settle_time),
        ] {
            if period > MAX_PERIOD {
                return Err(Error::Configuration(format!(
                    "{name} exceeds {} s",
                    MAX_PERIOD.as_secs()
                )));
            }
            if period.subsec_nanos() % 1_000_000 != 0 {
                return Err(Error::Configuration(format!(
                    "{name} has sub-millisecond precision"
                )));
            }
        }

        let pins = self.pins();
        for (i, (name_a, a)) in pins.iter().enumerate() {
            for (name_b, b) in &pins[i + 1..] {
                let same = a == b || matches!((a.line(), b.line()), (Some(x), Some(y)) if x == y);
                if same {
                    return Err(Error::Configuration(format!(
                        "{name_a} and {name_b} both use pin {a}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// All six pins, labelled with their field names.
    pub fn pins(&self) -> [(&'static str, &PinId); 6] {
        [
            ("lower_tank_low_floater_pin", &self.lower_tank_low_floater_pin),
            ("lower_tank_high_floater_pin", &self.lower_tank_high_floater_pin),
            ("upper_tank_low_floater_pin", &self.upper_tank_low_floater_pin),
            ("upper_tank_high_floater_pin", &self.upper_tank_high_floater_pin),
            ("well_to_lower_tank_pump_pin", &self.well_to_lower_tank_pump_pin),
            ("lower_to_upper_tank_pump_pin", &self.lower_to_upper_tank_pump_pin),
        ]
    }
}

/// `Duration` <-> fractional seconds, rounded to the millisecond on read.
mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        let exact = Duration::try_from_secs_f64(secs)
            .map_err(|_| de::Error::custom(format!("invalid duration: {secs} seconds")))?;
        if exact > super::MAX_PERIOD {
            // Out of range; `validate` reports it by field name.
            return Ok(exact);
        }
        Ok(Duration::from_millis((secs * 1000.0).round() as u64))
    }
}

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Process-level knobs for the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub settings_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub history_path: PathBuf,
    /// Sleep between ticks.
    pub poll_interval: Duration,
    /// Maximum silence between snapshot writes.
    pub heartbeat: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("settings.json"),
            snapshot_path: PathBuf::from("snapshot.json"),
            history_path: PathBuf::from("history.json"),
            poll_interval: Duration::from_secs(1),
            heartbeat: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Read overrides from `WELLFLOW_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(p) = lookup("WELLFLOW_SETTINGS") {
            config.settings_path = p.into();
        }
        if let Some(p) = lookup("WELLFLOW_SNAPSHOT") {
            config.snapshot_path = p.into();
        }
        if let Some(p) = lookup("WELLFLOW_HISTORY") {
            config.history_path = p.into();
        }
        if let Some(v) = lookup("WELLFLOW_POLL_MS") {
            config.poll_interval = Duration::from_millis(parse_number("WELLFLOW_POLL_MS", &v)?);
        }
        if let Some(v) = lookup("WELLFLOW_HEARTBEAT_SECS") {
            config.heartbeat = Duration::from_secs(parse_number("WELLFLOW_HEARTBEAT_SECS", &v)?);
        }
        if config.poll_interval.is_zero() {
            return Err(Error::Configuration("WELLFLOW_POLL_MS must be positive".into()));
        }
        Ok(config)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{key}={value:?} is not a whole number")))
}
