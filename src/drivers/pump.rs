//! On/off pump driver with transition listeners.
//!
//! A [`Pump`] wraps one physical output ([`PumpOutput`]) and an ordered
//! list of [`PumpListener`]s.  `activate` / `deactivate` always drive the
//! output, then notify the listeners in registration order, but only when
//! the pump actually changes state.
//!
//! ## Ownership
//!
//! The pump owns its subscription list.  The well estimator is shared
//! between the pump (as a listener) and the controller (which reads its
//! level), hence `Rc<RefCell<..>>`; the estimator never holds the pump.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::ports::PumpOutput;
use crate::error::{HardwareError, Result};

/// Capability notified on every pump on/off transition.
pub trait PumpListener {
    fn on_activated(&mut self, now: DateTime<Utc>);
    fn on_deactivated(&mut self, now: DateTime<Utc>);
}

pub struct Pump {
    name: &'static str,
    output: Box<dyn PumpOutput>,
    active: bool,
    listeners: Vec<Rc<RefCell<dyn PumpListener>>>,
}

impl Pump {
    /// A pump that is considered off.  The output is not touched until
    /// the first `activate` / `deactivate`.
    pub fn new(name: &'static str, output: Box<dyn PumpOutput>) -> Self {
        Self {
            name,
            output,
            active: false,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Rc<RefCell<dyn PumpListener>>) {
        self.listeners.push(listener);
    }

    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.output.set_running(true)?;
        if self.active {
            return Ok(());
        }
        self.active = true;
        info!("Pump {}: ON", self.name);
        for l in &self.listeners {
            l.borrow_mut().on_activated(now);
        }
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.output.set_running(false)?;
        if !self.active {
            return Ok(());
        }
        self.active = false;
        info!("Pump {}: OFF", self.name);
        for l in &self.listeners {
            l.borrow_mut().on_deactivated(now);
        }
        Ok(())
    }

    /// Drive to `on` (convenience for applying a command).
    pub fn set(&mut self, on: bool, now: DateTime<Utc>) -> Result<()> {
        if on { self.activate(now) } else { self.deactivate(now) }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO-backed output
// ───────────────────────────────────────────────────────────────

/// A pump relay/driver on a single digital output.  High = running
/// unless `active_low` (common for opto-isolated relay boards).
pub struct GpioPumpOutput<P> {
    label: String,
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> GpioPumpOutput<P> {
    pub fn new(label: impl Into<String>, pin: P, active_low: bool) -> Self {
        Self {
            label: label.into(),
            pin,
            active_low,
        }
    }
}

impl<P: OutputPin> PumpOutput for GpioPumpOutput<P> {
    fn set_running(&mut self, running: bool) -> Result<()> {
        let high = running != self.active_low;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|e| {
            HardwareError::OutputWrite {
                pin: self.label.clone(),
                reason: format!("{e:?}"),
            }
            .into()
        })
    }
}
