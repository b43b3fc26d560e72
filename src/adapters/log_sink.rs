//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events as one-line
//! records through the `log` facade.  A status page or MQTT bridge would
//! implement the same trait.

use log::info;

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;
use crate::snapshot::Snapshot;

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn status(s: &Snapshot) -> String {
    format!(
        "state={} since={} | well={}% | lower={} upper={} | well_pump={} transfer_pump={}",
        s.current_state,
        s.state_activated_at.format("%Y-%m-%d %H:%M:%S"),
        s.well_level,
        s.lower_tank_level,
        s.upper_tank_level,
        if s.well_to_lower_tank_pump_active { "ON" } else { "OFF" },
        if s.lower_to_upper_tank_pump_active { "ON" } else { "OFF" },
    )
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::Started(s) => {
                info!("START | {}", status(s));
            }
            ControllerEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            ControllerEvent::HistoryAppended(s) => {
                info!("STATUS | {}", status(s));
            }
            ControllerEvent::Heartbeat { at } => {
                log::debug!("HEARTBEAT | {}", at.to_rfc3339());
            }
            ControllerEvent::Stopped { at } => {
                info!("STOP | pumps off at {}", at.to_rfc3339());
            }
        }
    }
}
