//! Actuator drivers and GPIO access.

pub mod pump;
pub mod sysfs_gpio;
