//! The SoftAP orchestrator.
//!
//! Composes the power gate, driver lifecycle, config writer and daemon
//! supervisor into the exposed operations. Two notions of "started"
//! live here on purpose: the local intent ([`softap_core::ApIntent`])
//! gates start/stop idempotence, while [`SoftapController::is_started`]
//! always answers from the externally observed daemon status.

use std::thread;

use tracing::{error, info, warn};

use softap_core::config::MIN_CONFIG_ARGS;
use softap_core::{ApConfig, ApIntent, Clock, ControlError, ControlResult, RadioState, SystemClock};
use softap_sys::module::ModuleLoader;
use softap_sys::net::{IoctlLinkControl, LinkControl};
use softap_sys::properties::PropertyStore;
use softap_sys::{DirPropertyStore, KernelModuleLoader};

use crate::config_file::ConfigWriter;
use crate::driver::{DriverLifecycleManager, DriverState};
use crate::power::RadioPowerGate;
use crate::settings::Settings;
use crate::supervisor::DaemonSupervisor;

/// Production controller wired to the real OS seams.
pub type SystemController =
    SoftapController<DirPropertyStore, KernelModuleLoader, IoctlLinkControl, SystemClock>;

/// Orchestrates SoftAP bring-up and teardown.
pub struct SoftapController<P, L, N, C>
where
    P: PropertyStore,
    L: ModuleLoader,
    N: LinkControl,
    C: Clock + Clone,
{
    settings: Settings,
    power: RadioPowerGate<C>,
    driver: DriverLifecycleManager<L, C>,
    config: ConfigWriter,
    supervisor: DaemonSupervisor<P, C>,
    link: N,
    clock: C,
    intent: ApIntent,
}

impl SystemController {
    /// Builds a controller against the live system.
    pub fn system(settings: Settings) -> Self {
        let props = DirPropertyStore::new(settings.daemon.property_dir.clone());
        Self::new(
            settings,
            props,
            KernelModuleLoader,
            IoctlLinkControl,
            SystemClock,
        )
    }
}

impl<P, L, N, C> SoftapController<P, L, N, C>
where
    P: PropertyStore,
    L: ModuleLoader,
    N: LinkControl,
    C: Clock + Clone,
{
    pub fn new(settings: Settings, props: P, loader: L, link: N, clock: C) -> Self {
        let power = RadioPowerGate::new(settings.radio.clone(), clock.clone());
        let driver =
            DriverLifecycleManager::new(settings.driver.clone(), loader, clock.clone());
        let config = ConfigWriter::new(&settings.daemon);
        let supervisor = DaemonSupervisor::new(settings.daemon.clone(), props, clock.clone());
        Self {
            settings,
            power,
            driver,
            config,
            supervisor,
            link,
            clock,
            intent: ApIntent::default(),
        }
    }

    /// Brings SoftAP up: driver, interface, daemon, control endpoint.
    ///
    /// No-op success when the local intent is already Started. A daemon
    /// start failure unloads the driver as compensation; a failure in
    /// any later step runs the full compensating chain (stop daemon,
    /// unload driver). Either case surfaces as
    /// [`ControlError::PartialFailure`].
    pub fn start(&mut self) -> ControlResult<()> {
        if self.intent.is_started() {
            info!("softap already started");
            return Ok(());
        }

        self.driver.load(&self.config)?;

        let ap_iface = self.settings.daemon.ap_iface.clone();
        if let Err(e) = self.link.bring_up(&ap_iface) {
            // The original stack ignores this entirely; the daemon can
            // still come up when the driver has already created the
            // interface in the right state.
            warn!(iface = %ap_iface, error = %e, "interface up failed, continuing");
        }
        self.clock.sleep(self.settings.timing.iface_settle());

        if let Err(e) = self.supervisor.start() {
            error!(error = %e, "daemon start failed, unloading driver");
            let compensated = match self.driver.unload() {
                Ok(()) => true,
                Err(cleanup) => {
                    error!(error = %cleanup, "compensating driver unload failed");
                    false
                }
            };
            return Err(ControlError::PartialFailure {
                operation: "softap start".to_string(),
                compensated,
                source: Box::new(e),
            });
        }

        thread::yield_now();
        self.clock.sleep(self.settings.timing.post_daemon_settle());

        match self.supervisor.connect(&ap_iface) {
            Ok(endpoint) => info!(?endpoint, "control endpoint resolved"),
            Err(e) => return Err(self.compensate_after_daemon_start("softap start", e)),
        }

        if let Err(e) = self.supervisor.load_profile(true) {
            return Err(self.compensate_after_daemon_start("softap start", e));
        }

        self.intent = ApIntent::Started;
        self.clock.sleep(self.settings.timing.bss_start_delay());
        info!("softap started");
        Ok(())
    }

    /// Tears SoftAP down.
    ///
    /// No-op success when already stopped. The local intent is cleared
    /// regardless of the daemon-stop outcome (optimistic clear), and
    /// the daemon-stop result is what the caller gets back.
    pub fn stop(&mut self) -> ControlResult<()> {
        if !self.intent.is_started() {
            info!("softap already stopped");
            return Ok(());
        }

        self.supervisor.disconnect();
        let result = self.supervisor.stop();
        self.intent = ApIntent::Stopped;
        self.clock.sleep(self.settings.timing.bss_stop_delay());

        match &result {
            Ok(()) => info!("softap stopped"),
            Err(e) => warn!(error = %e, "softap marked stopped despite daemon stop failure"),
        }
        result
    }

    /// Writes a new access-point profile and triggers a reload
    /// appropriate to the current state.
    pub fn set_config<S: AsRef<str>>(&mut self, args: &[S]) -> ControlResult<()> {
        let cfg = ApConfig::from_args(args)?;
        self.config.write_config(&cfg)?;
        self.supervisor.load_profile(self.is_started())?;
        self.clock.sleep(self.settings.timing.set_config_delay());
        info!(ssid = cfg.ssid_or_default(), "softap configuration updated");
        Ok(())
    }

    /// Whether the daemon is observed running right now.
    ///
    /// Deliberately independent of the local intent; see the module
    /// docs for the merge policy.
    pub fn is_started(&self) -> bool {
        self.supervisor.status().is_running()
    }

    /// Firmware reload hook; validates the argument count only.
    pub fn reload_firmware<S: AsRef<str>>(&self, args: &[S]) -> ControlResult<()> {
        if args.len() < MIN_CONFIG_ARGS {
            return Err(ControlError::misconfigured(format!(
                "firmware reload needs at least {MIN_CONFIG_ARGS} arguments, got {}",
                args.len()
            )));
        }
        info!("firmware reload requested");
        Ok(())
    }

    /// Current radio power state through the kill switch.
    pub fn radio_state(&mut self) -> ControlResult<RadioState> {
        self.power.query()
    }

    /// Gates radio power. Loading the driver while the radio is off
    /// will fail, so power handling stays an explicit operation.
    pub fn set_radio_power(&mut self, on: bool) -> ControlResult<()> {
        self.power.set(on)
    }

    /// The controller's local intent, for diagnostics.
    pub fn intent(&self) -> ApIntent {
        self.intent
    }

    /// What the controller believes about the driver module pair.
    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    /// Full compensating chain for failures after the daemon came up.
    fn compensate_after_daemon_start(
        &mut self,
        operation: &str,
        source: ControlError,
    ) -> ControlError {
        error!(error = %source, "start sequence failed after daemon start, compensating");

        let stop_ok = match self.supervisor.stop() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "compensating daemon stop failed");
                false
            }
        };
        let unload_ok = match self.driver.unload() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "compensating driver unload failed");
                false
            }
        };

        ControlError::PartialFailure {
            operation: operation.to_string(),
            compensated: stop_ok && unload_ok,
            source: Box::new(source),
        }
    }
}
