//! Port traits: the hexagonal boundary between the controller and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (floater inputs, pump outputs, storage, clock, event
//! sinks) implement these traits.  The [`Controller`](super::controller::Controller)
//! receives them at construction, so the domain core never touches
//! hardware or the filesystem directly and every collaborator can be
//! replaced by a fake in tests.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::sensors::tank::TankLevel;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// A tank whose fill can be sensed as one of three discrete levels.
pub trait LevelSensor {
    fn level(&mut self) -> Result<TankLevel>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The physical on/off output behind a pump.
pub trait PumpOutput {
    fn set_running(&mut self, running: bool) -> Result<()>;
}

/// Everything the controller drives or reads on the plant.
pub struct Hardware {
    pub lower_tank: Box<dyn LevelSensor>,
    pub upper_tank: Box<dyn LevelSensor>,
    /// Moves water from the well into the lower tank (drains the well).
    pub well_pump: Box<dyn PumpOutput>,
    /// Moves water from the lower tank into the upper tank.
    pub transfer_pump: Box<dyn PumpOutput>,
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ durable files)
// ───────────────────────────────────────────────────────────────

/// The persisted documents the controller owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    /// Latest snapshot (rewritten on change and on heartbeat).
    Snapshot,
    /// Full append-only history.
    History,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::History => write!(f, "history"),
        }
    }
}

/// Durable text-document storage.
///
/// Implementations MUST make `store` atomic per document: a reader (or
/// a restart) sees either the previous contents or the new contents,
/// never a partial write.
pub trait StoragePort {
    /// Returns `Ok(None)` when the document has never been written.
    fn load(&self, document: Document) -> Result<Option<String>>;

    fn store(&mut self, document: Document, contents: &str) -> Result<()>;

    /// Move an undecodable document aside so the next `store` does not
    /// overwrite it.  A later quarantine of the same document replaces
    /// the earlier one.
    fn quarantine(&mut self, document: Document) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source.  Read once per tick; every computation in that
/// tick uses the same instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`ControllerEvent`](super::events::ControllerEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ControllerEvent);
}
