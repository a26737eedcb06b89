//! Supervision of the externally managed access-point daemon.
//!
//! The daemon is owned by the service manager; this module only
//! requests transitions through control keys and polls the observed
//! status property. Start polling is generation-aware: a status that
//! flaps to "stopped" under a new generation means the daemon came up
//! and crashed, which fails fast instead of waiting out the deadline.

use std::fs;
use std::path::PathBuf;
use std::thread;

use tracing::{debug, info, warn};

use softap_core::{poll_until, Clock, ControlError, ControlResult, DaemonStatus};
use softap_sys::properties::PropertyStore;

use crate::settings::DaemonSettings;

/// Prefix of stale control-socket artifacts cleared before a start.
const STALE_SOCKET_PREFIX: &str = "wpa_ctrl_";

/// Resolved control endpoint for a live-reconfiguration session.
///
/// No session is established over it; session wiring is an intentional
/// extension point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEndpoint {
    /// The daemon's control socket node, observed ready.
    Socket(PathBuf),
    /// Fallback when the node never appeared: the bare interface name.
    InterfaceName(String),
}

/// Starts and stops the daemon through the service manager.
#[derive(Debug)]
pub struct DaemonSupervisor<P: PropertyStore, C: Clock> {
    settings: DaemonSettings,
    props: P,
    clock: C,
}

impl<P: PropertyStore, C: Clock> DaemonSupervisor<P, C> {
    pub fn new(settings: DaemonSettings, props: P, clock: C) -> Self {
        Self {
            settings,
            props,
            clock,
        }
    }

    /// Parses the observed run state; never cached.
    pub fn status(&self) -> DaemonStatus {
        DaemonStatus::parse(self.props.get(&self.settings.status_property).as_deref())
    }

    /// Requests a daemon start and waits for it to come up.
    ///
    /// Idempotent when already running. Captures the status property's
    /// change generation before the request so a start-then-crash is
    /// distinguished from a daemon that never left "stopped".
    pub fn start(&self) -> ControlResult<()> {
        if self.status().is_running() {
            info!(daemon = %self.settings.name, "daemon already running");
            return Ok(());
        }

        self.clear_stale_sockets();

        let baseline = self
            .props
            .observe(&self.settings.status_property)
            .map(|obs| obs.generation)
            .unwrap_or(0);

        self.props
            .set(&self.settings.ctl_start_key, &self.settings.name)
            .map_err(|e| ControlError::io(&self.settings.ctl_start_key, e))?;
        thread::yield_now();

        let what = format!("{} running", self.settings.name);
        poll_until(&self.clock, self.settings.start_poll(), &what, || {
            let obs = self.props.observe(&self.settings.status_property)?;
            match DaemonStatus::parse(Some(&obs.value)) {
                DaemonStatus::Running => Some(Ok(())),
                DaemonStatus::Stopped if obs.generation != baseline => {
                    warn!(daemon = %self.settings.name, "daemon went stopped under a new generation");
                    Some(Err(ControlError::DaemonCrashed {
                        daemon: self.settings.name.clone(),
                    }))
                }
                _ => None,
            }
        })?;

        info!(daemon = %self.settings.name, "daemon running");
        Ok(())
    }

    /// Requests a daemon stop and waits for it to wind down.
    pub fn stop(&self) -> ControlResult<()> {
        if self.status().is_stopped() {
            info!(daemon = %self.settings.name, "daemon already stopped");
            return Ok(());
        }

        self.props
            .set(&self.settings.ctl_stop_key, &self.settings.name)
            .map_err(|e| ControlError::io(&self.settings.ctl_stop_key, e))?;
        thread::yield_now();

        let what = format!("{} stopped", self.settings.name);
        poll_until(&self.clock, self.settings.stop_poll(), &what, || {
            self.status().is_stopped().then(|| Ok(()))
        })?;

        info!(daemon = %self.settings.name, "daemon stopped");
        Ok(())
    }

    /// Resolves the control endpoint for live reconfiguration.
    ///
    /// Polls for the daemon's control-socket node; when it never
    /// appears, falls back to the bare interface name, still reporting
    /// success. Establishing an actual session over the endpoint is an
    /// extension point left open on purpose — profile changes currently
    /// apply through a daemon restart.
    pub fn connect(&self, ap_iface: &str) -> ControlResult<ControlEndpoint> {
        if !self.status().is_running() {
            return Err(ControlError::misconfigured(format!(
                "{} not running, cannot connect",
                self.settings.name
            )));
        }

        let node = self.settings.ctrl_dir.join(ap_iface);
        thread::yield_now();

        let what = format!("control socket {}", node.display());
        let ready = poll_until(&self.clock, self.settings.socket_poll(), &what, || {
            fs::metadata(&node).is_ok().then(|| Ok(()))
        });

        match ready {
            Ok(()) => {
                debug!(node = %node.display(), "control socket ready");
                Ok(ControlEndpoint::Socket(node))
            }
            Err(ControlError::Timeout { .. }) => {
                debug!(iface = ap_iface, "control socket never appeared, using interface name");
                Ok(ControlEndpoint::InterfaceName(ap_iface.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Tears down the live-reconfiguration session. Nothing to do until
    /// [`Self::connect`] establishes one.
    pub fn disconnect(&self) {
        debug!(daemon = %self.settings.name, "no control session to tear down");
    }

    /// Pushes the current profile to the daemon.
    ///
    /// Intentionally a successful no-op: without a control session the
    /// daemon picks the profile up on its next start.
    pub fn load_profile(&self, started: bool) -> ControlResult<()> {
        debug!(started, "profile reload deferred to next daemon start");
        Ok(())
    }

    /// Removes stale control-socket artifacts left by a previous run.
    fn clear_stale_sockets(&self) {
        let entries = match fs::read_dir(&self.settings.ctrl_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.settings.ctrl_dir.display(), error = %e, "no control directory to clean");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STALE_SOCKET_PREFIX) {
                debug!(artifact = %name.to_string_lossy(), "removing stale control socket");
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}
