//! Error taxonomy for controller operations.
//!
//! Every fallible operation in the controller returns [`ControlResult`].
//! The variants map one-to-one onto the failure classes the controller
//! distinguishes: unavailable OS resources, bounded-poll timeouts,
//! retryable unload contention, caller misconfiguration, daemon
//! crash-on-start, and partial failures where a compensating action ran
//! after the primary operation failed.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by controller operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A discovery scan was exhausted without a match (e.g. no wlan
    /// kill switch in the rfkill tree).
    #[error("{what} not found")]
    NotFound { what: String },

    /// An OS resource (sysfs attribute, module image, config file,
    /// property) could not be opened, read or written.
    #[error("resource unavailable: {path}: {source}")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A bounded poll ran to its deadline without observing the
    /// expected condition.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// A module unload stayed busy through every retry attempt.
    #[error("module \"{module}\" still busy after {attempts} unload attempts")]
    Contention { module: String, attempts: u32 },

    /// The caller supplied an unusable request (missing arguments,
    /// missing template).
    #[error("misconfiguration: {reason}")]
    Misconfiguration { reason: String },

    /// The supervised daemon transitioned to "stopped" with a new
    /// status generation while we were waiting for "running".
    #[error("daemon \"{daemon}\" crashed during startup")]
    DaemonCrashed { daemon: String },

    /// The primary operation failed and a compensating action was
    /// attempted; `compensated` records whether the cleanup itself
    /// succeeded.
    #[error("{operation} failed (cleanup succeeded: {compensated}): {source}")]
    PartialFailure {
        operation: String,
        compensated: bool,
        #[source]
        source: Box<ControlError>,
    },
}

impl ControlError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Builds a misconfiguration error from a displayable reason.
    pub fn misconfigured(reason: impl Into<String>) -> Self {
        Self::Misconfiguration {
            reason: reason.into(),
        }
    }
}

/// Result type for controller operations.
pub type ControlResult<T> = Result<T, ControlError>;
