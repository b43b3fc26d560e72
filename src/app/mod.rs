//! Application core: controller orchestration behind port traits.
//!
//! This module ties the well estimator, the state machine and the
//! snapshot history together into the per-tick control loop.  All
//! interaction with hardware, storage and time happens through the
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
