//! Observed and intended state types.
//!
//! The controller deliberately keeps two notions of "started": the local
//! intent it last committed to ([`ApIntent`], gating start/stop
//! idempotence) and the externally observed daemon status
//! ([`DaemonStatus`], answering every query). The merge policy is: queries
//! trust the observed status, transitions trust the local intent.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Radio kill-switch state as read from the rfkill state attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    /// The attribute held something other than '0' or '1'.
    Unknown,
    /// RF transmission is gated off.
    Off,
    /// RF transmission is enabled.
    On,
}

impl RadioState {
    /// Decodes the single byte read from the rfkill state attribute.
    pub fn from_attr_byte(byte: u8) -> Self {
        match byte {
            b'1' => Self::On,
            b'0' => Self::Off,
            _ => Self::Unknown,
        }
    }

    /// The single byte written to the rfkill state attribute.
    pub fn to_attr_byte(self) -> Option<u8> {
        match self {
            Self::On => Some(b'1'),
            Self::Off => Some(b'0'),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Off => "off",
            Self::On => "on",
        };
        write!(f, "{s}")
    }
}

/// Externally observed run state of the supervised daemon.
///
/// This is never owned by the controller; it is parsed from the status
/// property on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    /// Status property reads "running".
    Running,
    /// Status property reads "stopped".
    Stopped,
    /// Status property holds some other value (e.g. "restarting").
    Other(String),
    /// Status property is absent.
    Unknown,
}

impl DaemonStatus {
    /// Parses the raw status property value.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("running") => Self::Running,
            Some("stopped") => Self::Stopped,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unknown,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Other(s) => write!(f, "{s}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The controller's local belief about whether SoftAP is up.
///
/// Set to `Started` only after the full start sequence completed; cleared
/// optimistically during stop regardless of the daemon-stop outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApIntent {
    #[default]
    Stopped,
    Started,
}

impl ApIntent {
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }
}
