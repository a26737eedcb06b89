//! Kernel driver lifecycle for the wlan module pair.
//!
//! The main driver module depends on the auxiliary module: loads go
//! auxiliary-then-main, unloads go main-then-auxiliary, and a failed
//! main unload skips the auxiliary unload entirely. Loads are
//! single-shot; unloads retry the kernel's transient busy condition with
//! a bounded backoff before reporting contention.

use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use softap_core::{Clock, ControlError, ControlResult};
use softap_sys::module::{ModuleLoader, UnloadOutcome};

use crate::config_file::ConfigWriter;
use crate::settings::DriverSettings;

/// What the controller believes about the module pair.
///
/// A failed load or unload leaves [`DriverState::Unknown`]: the kernel
/// module table must be re-queried (or the operation retried), never
/// assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Absent,
    Present,
    Unknown,
}

/// Loads and unloads the wlan driver module pair.
#[derive(Debug)]
pub struct DriverLifecycleManager<L: ModuleLoader, C: Clock> {
    settings: DriverSettings,
    loader: L,
    clock: C,
    state: DriverState,
}

impl<L: ModuleLoader, C: Clock> DriverLifecycleManager<L, C> {
    pub fn new(settings: DriverSettings, loader: L, clock: C) -> Self {
        Self {
            settings,
            loader,
            clock,
            state: DriverState::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Loads the module pair and seeds the daemon configuration.
    ///
    /// The platform polling attribute is enabled for the duration of the
    /// load and disabled again on every exit path. No-op when the pair
    /// is already present.
    pub fn load(&mut self, config: &ConfigWriter) -> ControlResult<()> {
        if self.state == DriverState::Present {
            debug!("driver modules already loaded");
            return Ok(());
        }

        let result = self
            .write_polling_attr(true)
            .and_then(|()| self.load_inner(config));

        if let Err(e) = self.write_polling_attr(false) {
            error!(error = %e, "failed to disable platform polling attribute");
        }

        match result {
            Ok(()) => {
                self.state = DriverState::Present;
                info!(
                    aux = %self.settings.aux_module_name,
                    main = %self.settings.main_module_name,
                    "driver modules loaded"
                );
                Ok(())
            }
            Err(e) => {
                self.state = DriverState::Unknown;
                Err(e)
            }
        }
    }

    fn load_inner(&self, config: &ConfigWriter) -> ControlResult<()> {
        let aux_path = self.settings.aux_module_path.clone();
        let main_path = self.settings.main_module_path.clone();

        self.insmod(&aux_path, "")?;
        self.insmod(&main_path, &self.settings.main_module_params)?;

        // Give the driver time to settle before the daemon touches it.
        self.clock.sleep(self.settings.settle());

        config.ensure_template_copied()
    }

    /// Single-shot module load: read the image into memory, hand it to
    /// the kernel, done.
    fn insmod(&self, path: &Path, params: &str) -> ControlResult<()> {
        let image = fs::read(path).map_err(|e| ControlError::io(path, e))?;
        debug!(path = %path.display(), params, bytes = image.len(), "loading module");
        self.loader
            .load(&image, params)
            .map_err(|e| ControlError::io(path, e))
    }

    /// Unloads main then auxiliary, preserving dependency order.
    ///
    /// A failed main unload surfaces immediately without touching the
    /// auxiliary module.
    pub fn unload(&mut self) -> ControlResult<()> {
        let main = self.settings.main_module_name.clone();
        let aux = self.settings.aux_module_name.clone();

        if let Err(e) = self.rmmod(&main) {
            warn!(module = %main, error = %e, "main module unload failed; keeping auxiliary loaded");
            self.state = DriverState::Unknown;
            return Err(e);
        }

        if let Err(e) = self.rmmod(&aux) {
            self.state = DriverState::Unknown;
            return Err(e);
        }

        self.state = DriverState::Absent;
        info!(main = %main, aux = %aux, "driver modules unloaded");
        Ok(())
    }

    /// Bounded busy-retry around one module unload.
    fn rmmod(&self, name: &str) -> ControlResult<()> {
        let attempts = self.settings.unload_attempts;
        for attempt in 1..=attempts {
            match self.loader.unload(name) {
                Ok(UnloadOutcome::Unloaded) => return Ok(()),
                Ok(UnloadOutcome::Busy) => {
                    debug!(module = name, attempt, "module busy, backing off");
                    if attempt < attempts {
                        self.clock.sleep(self.settings.unload_backoff());
                    }
                }
                Err(e) => return Err(ControlError::io(name, e)),
            }
        }
        Err(ControlError::Contention {
            module: name.to_string(),
            attempts,
        })
    }

    fn write_polling_attr(&self, enable: bool) -> ControlResult<()> {
        let path = &self.settings.polling_attr;
        fs::write(path, if enable { "1" } else { "0" }).map_err(|e| ControlError::io(path, e))
    }
}
