//! Unified error types for the wellflow controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! controller loop's error handling uniform.  The variants map onto the
//! failure classes the controller distinguishes:
//!
//! | Variant              | Raised when                                   | Handling            |
//! |----------------------|-----------------------------------------------|---------------------|
//! | `Configuration`      | settings file missing / malformed / invalid   | fatal at startup    |
//! | `CorruptState`       | snapshot or history file present but unusable | fall back, warn     |
//! | `InvariantViolation` | well level out of range, FSM cannot settle    | fatal               |
//! | `Hardware`           | floater read or pump write failed             | surfaced from tick  |
//! | `Io`                 | persistence read/write failed                 | surfaced from tick  |

use std::path::PathBuf;

use crate::app::ports::Document;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Settings are absent, unparsable, or fail validation.
    #[error("configuration: {0}")]
    Configuration(String),

    /// A persisted document exists but cannot be decoded.
    #[error("corrupt {document}: {reason}")]
    CorruptState { document: Document, reason: String },

    /// Internal consistency was violated; continuing would be undefined.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A sensor input or pump output failed.
    #[error("hardware: {0}")]
    Hardware(#[from] HardwareError),

    /// Reading or writing durable storage failed.
    #[error("I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Shorthand for wrapping an `std::io::Error` with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A floater input could not be read.
    #[error("input {pin} read failed: {reason}")]
    InputRead { pin: String, reason: String },
    /// A pump output could not be driven.
    #[error("output {pin} write failed: {reason}")]
    OutputWrite { pin: String, reason: String },
    /// The pin could not be claimed or configured.
    #[error("pin {pin} setup failed: {reason}")]
    Setup { pin: String, reason: String },
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
