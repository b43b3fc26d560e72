//! Mock adapters for integration tests.
//!
//! Every fake hands out a cloneable handle sharing its state, so a test
//! can move the adapter into the controller and still steer inputs and
//! inspect outputs afterwards.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use wellflow::app::events::ControllerEvent;
use wellflow::app::ports::{Clock, Document, EventSink, Hardware, LevelSensor, PumpOutput, StoragePort};
use wellflow::config::{PinId, Settings};
use wellflow::error::{Error, HardwareError, Result};
use wellflow::fsm::ControlState;
use wellflow::sensors::tank::TankLevel;
use wellflow::snapshot::Snapshot;
use wellflow::well::Percent;

// ── Tanks ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FakeTank {
    level: Rc<Cell<TankLevel>>,
    broken: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl FakeTank {
    pub fn new(level: TankLevel) -> Self {
        Self {
            level: Rc::new(Cell::new(level)),
            broken: Rc::new(Cell::new(false)),
        }
    }

    pub fn set(&self, level: TankLevel) {
        self.level.set(level);
    }

    /// Make every subsequent read fail.
    pub fn break_wire(&self) {
        self.broken.set(true);
    }
}

impl LevelSensor for FakeTank {
    fn level(&mut self) -> Result<TankLevel> {
        if self.broken.get() {
            return Err(HardwareError::InputRead {
                pin: "fake".into(),
                reason: "wire cut".into(),
            }
            .into());
        }
        Ok(self.level.get())
    }
}

// ── Pump outputs ──────────────────────────────────────────────

/// Records every value written to the output.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    writes: Rc<RefCell<Vec<bool>>>,
}

#[allow(dead_code)]
impl RecordingOutput {
    pub fn writes(&self) -> Vec<bool> {
        self.writes.borrow().clone()
    }

    /// Last value driven, `None` if never written.
    pub fn is_on(&self) -> Option<bool> {
        self.writes.borrow().last().copied()
    }
}

impl PumpOutput for RecordingOutput {
    fn set_running(&mut self, running: bool) -> Result<()> {
        self.writes.borrow_mut().push(running);
        Ok(())
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Rc<RefCell<HashMap<Document, String>>>,
    writes: Rc<RefCell<Vec<Document>>>,
    quarantined: Rc<RefCell<HashMap<Document, String>>>,
    read_only: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn put(&self, document: Document, contents: &str) {
        self.docs.borrow_mut().insert(document, contents.to_owned());
    }

    pub fn get(&self, document: Document) -> Option<String> {
        self.docs.borrow().get(&document).cloned()
    }

    /// Documents written, in order.
    pub fn writes(&self) -> Vec<Document> {
        self.writes.borrow().clone()
    }

    pub fn fail_writes(&self) {
        self.read_only.set(true);
    }

    pub fn allow_writes(&self) {
        self.read_only.set(false);
    }

    /// Contents last moved aside for `document`.
    pub fn quarantined(&self, document: Document) -> Option<String> {
        self.quarantined.borrow().get(&document).cloned()
    }
}

impl StoragePort for MemoryStore {
    fn load(&self, document: Document) -> Result<Option<String>> {
        Ok(self.get(document))
    }

    fn store(&mut self, document: Document, contents: &str) -> Result<()> {
        if self.read_only.get() {
            return Err(Error::io(
                format!("mem://{document}"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.writes.borrow_mut().push(document);
        self.put(document, contents);
        Ok(())
    }

    fn quarantine(&mut self, document: Document) -> Result<()> {
        if let Some(text) = self.docs.borrow_mut().remove(&document) {
            self.quarantined.borrow_mut().insert(document, text);
        }
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + TimeDelta::from_std(by).unwrap());
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::StateChanged { from, to } => Some((from.to_string(), to.to_string())),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub const FILL: Duration = Duration::from_secs(3600);
pub const EMPTY: Duration = Duration::from_secs(1800);
pub const SETTLE: Duration = Duration::from_secs(600);

pub fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-01T06:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// fill 1 h, empty 30 min, settle 10 min, pins 2..=7.
pub fn settings() -> Settings {
    Settings {
        fill_period: FILL,
        empty_period: EMPTY,
        settle_time: SETTLE,
        lower_tank_low_floater_pin: PinId::Number(2),
        lower_tank_high_floater_pin: PinId::Number(3),
        upper_tank_low_floater_pin: PinId::Number(4),
        upper_tank_high_floater_pin: PinId::Number(5),
        well_to_lower_tank_pump_pin: PinId::Number(6),
        lower_to_upper_tank_pump_pin: PinId::Number(7),
    }
}

/// A persisted snapshot as a previous run would have left it.
#[allow(dead_code)]
pub fn saved(
    state: ControlState,
    well: u8,
    lower: TankLevel,
    upper: TankLevel,
    captured: DateTime<Utc>,
    entered: DateTime<Utc>,
) -> Snapshot {
    Snapshot {
        time: captured,
        well_level: Percent::new(well).unwrap(),
        lower_tank_level: lower,
        upper_tank_level: upper,
        well_to_lower_tank_pump_active: state == ControlState::FillLowerTank,
        lower_to_upper_tank_pump_active: state == ControlState::FillUpperTank,
        current_state: state,
        state_activated_at: entered,
    }
}

/// Handles to every fake the controller was built from.
#[derive(Clone)]
pub struct Rig {
    pub lower: FakeTank,
    pub upper: FakeTank,
    pub well_out: RecordingOutput,
    pub transfer_out: RecordingOutput,
    pub store: MemoryStore,
    pub clock: ManualClock,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self {
            lower: FakeTank::new(TankLevel::Empty),
            upper: FakeTank::new(TankLevel::Empty),
            well_out: RecordingOutput::default(),
            transfer_out: RecordingOutput::default(),
            store: MemoryStore::default(),
            clock: ManualClock::new(t0()),
        }
    }

    pub fn hardware(&self) -> Hardware {
        Hardware {
            lower_tank: Box::new(self.lower.clone()),
            upper_tank: Box::new(self.upper.clone()),
            well_pump: Box::new(self.well_out.clone()),
            transfer_pump: Box::new(self.transfer_out.clone()),
        }
    }
}
