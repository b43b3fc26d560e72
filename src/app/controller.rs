//! The per-tick control loop.
//!
//! [`Controller`] owns the well estimator, both pumps, the state machine
//! and the history.  All I/O flows through port traits handed over at
//! construction, making the loop testable with mock adapters.
//!
//! ```text
//!  LevelSensor ──▶ ┌──────────────────────────┐ ──▶ PumpOutput
//!                  │        Controller         │
//!        Clock ──▶ │  Well · FSM · History     │ ──▶ StoragePort
//!                  └──────────────────────────┘ ──▶ EventSink
//! ```
//!
//! One tick:
//! 1. read both tanks and the well estimate at a single `now`
//! 2. run the state machine to a fixed point
//! 3. drive the pumps to the settled state's commands
//! 4. capture a snapshot and append it to the history
//! 5. persist snapshot + history if the history grew since the last
//!    successful history write, otherwise rewrite the snapshot alone once
//!    the heartbeat window has passed

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::Settings;
use crate::drivers::pump::{Pump, PumpListener};
use crate::error::{Error, Result};
use crate::fsm::context::{FsmContext, Readings};
use crate::fsm::{ControlState, StateMachine, Transition};
use crate::history::History;
use crate::snapshot::Snapshot;
use crate::well::{Percent, WellEstimator};

use super::events::ControllerEvent;
use super::ports::{Clock, Document, EventSink, Hardware, LevelSensor, StoragePort};

/// Default liveness rewrite interval for the snapshot document.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(60);

/// Which documents a tick wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    /// History had unsaved entries: snapshot and history were both written.
    Full,
    /// Nothing changed, but the heartbeat window elapsed: snapshot only.
    Heartbeat,
    None,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub state: ControlState,
    pub transition: Option<Transition>,
    pub persisted: Persisted,
}

pub struct Controller<S: StoragePort, C: Clock> {
    lower_tank: Box<dyn LevelSensor>,
    upper_tank: Box<dyn LevelSensor>,
    well_pump: Pump,
    transfer_pump: Pump,
    /// Shared with `well_pump`, which notifies it on every switch.
    well: Rc<RefCell<WellEstimator>>,
    fsm: StateMachine,
    ctx: FsmContext,
    history: History,
    /// History holds entries the history document does not.
    history_dirty: bool,
    latest: Snapshot,
    store: S,
    clock: C,
    heartbeat: Duration,
    last_persisted: Option<DateTime<Utc>>,
}

impl<S: StoragePort, C: Clock> Controller<S, C> {
    /// Restore from `store` (or start fresh) and drive both pumps off.
    ///
    /// A corrupt snapshot or history is logged, moved aside through
    /// [`StoragePort::quarantine`] and replaced by the initial snapshot /
    /// an empty history.  Storage I/O failures and hardware failures
    /// while forcing the pumps off are returned.
    pub fn new(
        settings: Settings,
        hardware: Hardware,
        mut store: S,
        clock: C,
        heartbeat: Duration,
        sink: &mut impl EventSink,
    ) -> Result<Self> {
        settings.validate()?;
        let now = clock.now();

        let restored = load_snapshot(&mut store)?;
        let snapshot = match restored {
            Some(s) => {
                info!(
                    "Restored {} (well {}%) captured at {}",
                    s.current_state, s.well_level, s.time
                );
                s
            }
            None => {
                info!("No usable snapshot, starting in {}", ControlState::FillWell);
                Snapshot::initial(now)
            }
        };
        let history = load_history(&mut store)?;
        info!("History holds {} entries", history.len());

        // Pump-off estimator at the captured level and time: downtime is
        // folded in as refill on the first read.
        let well = Rc::new(RefCell::new(WellEstimator::from_settings(
            &settings,
            snapshot.well_level,
            snapshot.time,
        )));
        let mut well_pump = Pump::new("well", hardware.well_pump);
        let listener: Rc<RefCell<dyn PumpListener>> = well.clone();
        well_pump.add_listener(listener);
        let mut transfer_pump = Pump::new("transfer", hardware.transfer_pump);

        well_pump.deactivate(now)?;
        transfer_pump.deactivate(now)?;

        let fsm = StateMachine::new(snapshot.current_state, snapshot.state_activated_at);
        sink.emit(&ControllerEvent::Started(snapshot.clone()));

        Ok(Self {
            lower_tank: hardware.lower_tank,
            upper_tank: hardware.upper_tank,
            well_pump,
            transfer_pump,
            well,
            fsm,
            ctx: FsmContext::new(settings.settle_time),
            history,
            history_dirty: false,
            latest: snapshot,
            store,
            clock,
            heartbeat,
            last_persisted: None,
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    pub fn tick(&mut self, sink: &mut impl EventSink) -> Result<TickOutcome> {
        let now = self.clock.now();

        // 1. Readings
        let lower = self.lower_tank.level()?;
        let upper = self.upper_tank.level()?;
        let well_level = self.well.borrow_mut().level(now);
        self.ctx.readings = Readings {
            well_level,
            lower_tank: lower,
            upper_tank: upper,
            time_in_state: Duration::ZERO,
        };

        // 2. Fixed point
        let transition = self.fsm.advance(&mut self.ctx, now)?;
        if let Some(t) = transition {
            sink.emit(&ControllerEvent::StateChanged { from: t.from, to: t.to });
        }

        // 3. Pumps
        let commands = self.ctx.commands;
        self.well_pump.set(commands.well_pump, now)?;
        self.transfer_pump.set(commands.transfer_pump, now)?;

        // 4. Snapshot + history
        let snapshot = self.capture(now);
        if self.history.append(snapshot.clone()) {
            self.history_dirty = true;
        }
        self.latest = snapshot;

        // 5. Persistence; a history write that failed earlier is retried
        let persisted = if self.history_dirty {
            self.persist_snapshot()?;
            self.persist_history()?;
            self.history_dirty = false;
            self.last_persisted = Some(now);
            info!("Persisted snapshot and history ({} entries)", self.history.len());
            sink.emit(&ControllerEvent::HistoryAppended(self.latest.clone()));
            Persisted::Full
        } else if self.heartbeat_due(now) {
            self.persist_snapshot()?;
            self.last_persisted = Some(now);
            debug!("Heartbeat: snapshot rewritten");
            sink.emit(&ControllerEvent::Heartbeat { at: now });
            Persisted::Heartbeat
        } else {
            Persisted::None
        };

        Ok(TickOutcome {
            state: self.fsm.current_state(),
            transition,
            persisted,
        })
    }

    /// Tick every `poll_interval` until `stop` receives (or its sender is
    /// dropped) or a tick fails.  Both pumps are forced off either way; a
    /// failed tick's error is returned ahead of any shutdown error.
    pub fn run(
        &mut self,
        sink: &mut impl EventSink,
        poll_interval: Duration,
        stop: &Receiver<()>,
    ) -> Result<()> {
        loop {
            if let Err(e) = self.tick(sink) {
                error!("Tick failed: {e}");
                if let Err(off) = self.shutdown(sink) {
                    error!("Could not force pumps off: {off}");
                }
                return Err(e);
            }
            match stop.recv_timeout(poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    info!("Stop requested");
                    return self.shutdown(sink);
                }
            }
        }
    }

    /// Force both pumps off.  Both outputs are attempted even if the
    /// first fails; the first error is returned.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) -> Result<()> {
        let now = self.clock.now();
        let well = self.well_pump.deactivate(now);
        let transfer = self.transfer_pump.deactivate(now);
        if well.is_ok() && transfer.is_ok() {
            info!("Pumps stopped");
        } else {
            warn!("Shutdown could not confirm both pumps off");
        }
        sink.emit(&ControllerEvent::Stopped { at: now });
        well.and(transfer)
    }

    /// The full plant state as of `now`.
    pub fn capture(&mut self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            time: now,
            well_level: self.well.borrow_mut().level(now),
            lower_tank_level: self.ctx.readings.lower_tank,
            upper_tank_level: self.ctx.readings.upper_tank,
            well_to_lower_tank_pump_active: self.well_pump.is_active(),
            lower_to_upper_tank_pump_active: self.transfer_pump.is_active(),
            current_state: self.fsm.current_state(),
            state_activated_at: self.fsm.activated_at(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ControlState {
        self.fsm.current_state()
    }

    pub fn state_activated_at(&self) -> DateTime<Utc> {
        self.fsm.activated_at()
    }

    /// Most recent capture (the restored snapshot before the first tick).
    pub fn latest(&self) -> &Snapshot {
        &self.latest
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Well estimate as of the clock's current time.
    pub fn well_level(&self) -> Percent {
        self.well.borrow_mut().level(self.clock.now())
    }

    pub fn pumps_active(&self) -> (bool, bool) {
        (self.well_pump.is_active(), self.transfer_pump.is_active())
    }

    // ── Internal ──────────────────────────────────────────────

    fn heartbeat_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_persisted {
            None => true,
            Some(at) => (now - at).to_std().is_ok_and(|d| d >= self.heartbeat),
        }
    }

    fn persist_snapshot(&mut self) -> Result<()> {
        let json = self.latest.to_json()?;
        self.store.store(Document::Snapshot, &json)
    }

    fn persist_history(&mut self) -> Result<()> {
        let json = self.history.to_json()?;
        self.store.store(Document::History, &json)
    }
}

fn load_snapshot(store: &mut impl StoragePort) -> Result<Option<Snapshot>> {
    let Some(text) = store.load(Document::Snapshot)? else {
        return Ok(None);
    };
    match Snapshot::from_json(&text) {
        Ok(s) => Ok(Some(s)),
        Err(e @ Error::CorruptState { .. }) => {
            warn!("Ignoring {e}");
            store.quarantine(Document::Snapshot)?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn load_history(store: &mut impl StoragePort) -> Result<History> {
    let Some(text) = store.load(Document::History)? else {
        return Ok(History::new());
    };
    match History::from_json(&text) {
        Ok(h) => Ok(h),
        Err(e @ Error::CorruptState { .. }) => {
            warn!("Ignoring {e}");
            store.quarantine(Document::History)?;
            Ok(History::new())
        }
        Err(e) => Err(e),
    }
}
