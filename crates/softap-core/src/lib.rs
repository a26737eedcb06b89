//! SoftAP Core - Shared types for the SoftAP lifecycle controller
//!
//! This crate provides the domain types shared between the controller
//! library (softap-ctl) and the OS seams (softap-sys): the error taxonomy,
//! the access-point configuration record, observed/intended state types,
//! and the poll-with-timeout primitive with an injectable clock.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`
//! outside of tests.

pub mod config;
pub mod error;
pub mod poll;
pub mod state;

// Re-exports for convenience
pub use config::{ApConfig, SecurityMode};
pub use error::{ControlError, ControlResult};
pub use poll::{poll_until, Clock, FakeClock, PollSpec, SystemClock};
pub use state::{ApIntent, DaemonStatus, RadioState};
