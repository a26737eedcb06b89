//! SoftAP Ctl - lifecycle controller for a radio in SoftAP mode
//!
//! This crate composes the five moving parts of SoftAP bring-up:
//!
//! - [`power::RadioPowerGate`] — rfkill discovery and power toggling.
//! - [`driver::DriverLifecycleManager`] — ordered load/unload of the
//!   dependent kernel module pair, with busy-retry on unload.
//! - [`config_file::ConfigWriter`] — template seeding and atomic
//!   rewrites of the daemon configuration.
//! - [`supervisor::DaemonSupervisor`] — start/stop requests against the
//!   service manager with generation-aware status polling.
//! - [`controller::SoftapController`] — the orchestrator tying the above
//!   into start/stop/configure operations.
//!
//! Everything is synchronous and blocking by design: the controller is
//! driven from one serialized control path and synchronizes with the
//! kernel and the service manager through bounded polls only.

pub mod config_file;
pub mod controller;
pub mod driver;
pub mod power;
pub mod settings;
pub mod supervisor;

// Re-exports for convenience
pub use config_file::ConfigWriter;
pub use controller::{SoftapController, SystemController};
pub use driver::{DriverLifecycleManager, DriverState};
pub use power::{KillSwitchHandle, RadioPowerGate};
pub use settings::{DaemonSettings, DriverSettings, RadioSettings, Settings, TimingSettings};
pub use supervisor::{ControlEndpoint, DaemonSupervisor};
