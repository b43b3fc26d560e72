//! Outbound controller events.
//!
//! The [`Controller`](super::controller::Controller) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log them, forward them to a status
//! page, record them in a test).

use chrono::{DateTime, Utc};

use crate::fsm::ControlState;
use crate::snapshot::Snapshot;

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// The controller was constructed; carries the restored snapshot.
    Started(Snapshot),

    /// The state machine settled in a different state this tick.
    StateChanged { from: ControlState, to: ControlState },

    /// A genuinely new snapshot was appended and persisted.
    HistoryAppended(Snapshot),

    /// Nothing changed, but the snapshot was rewritten for liveness.
    Heartbeat { at: DateTime<Utc> },

    /// Both pumps were forced off.
    Stopped { at: DateTime<Utc> },
}
