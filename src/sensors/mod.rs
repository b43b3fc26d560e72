//! Sensor subsystem.
//!
//! The only sensed quantities are the two tank levels, each derived from
//! a pair of float switches.  The well has no sensor; its level is
//! estimated by [`crate::well`].

pub mod tank;
