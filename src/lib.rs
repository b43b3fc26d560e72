//! Wellflow: well-to-tank water transfer controller.
//!
//! Estimates the level of a slowly refilling well, sequences a well pump
//! and a tank-to-tank transfer pump through a small state machine, and
//! keeps a durable history of every distinct plant state.  The binary
//! drives real GPIO through sysfs; everything else is exposed here for
//! integration testing with mock adapters.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod history;
pub mod sensors;
pub mod snapshot;
pub mod well;

pub use error::{Error, Result};
