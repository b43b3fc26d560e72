//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter      | Implements       | Connects to                  |
//! |--------------|------------------|------------------------------|
//! | `file_store` | StoragePort      | JSON files, atomic rename    |
//! | `hardware`   | LevelSensor      | sysfs GPIO floater inputs    |
//! |              | PumpOutput       | sysfs GPIO relay outputs     |
//! | `log_sink`   | EventSink        | `log` records                |
//! | `time`       | Clock            | system wall clock            |

pub mod file_store;
pub mod hardware;
pub mod log_sink;
pub mod time;
