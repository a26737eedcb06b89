//! SoftAP Sys - OS seams for the SoftAP controller
//!
//! Each kernel or service-manager primitive the controller depends on is
//! behind a small trait with one production implementation:
//!
//! - [`module::ModuleLoader`] — raw `init_module`/`delete_module`
//!   syscalls for the driver pair.
//! - [`properties::PropertyStore`] — get/set plus generation-aware
//!   observation of the control property tree.
//! - [`net::LinkControl`] — administrative interface-up via `SIOCSIFFLAGS`.
//!
//! The [`fake`] module carries in-memory stand-ins so the controller can
//! be exercised without touching the kernel.

pub mod fake;
pub mod module;
pub mod net;
pub mod properties;

pub use module::{KernelModuleLoader, ModuleLoader, UnloadOutcome};
pub use net::{IoctlLinkControl, LinkControl};
pub use properties::{DirPropertyStore, Observation, PropertyStore};
