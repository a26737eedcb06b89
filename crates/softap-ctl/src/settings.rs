//! Controller settings.
//!
//! Every path, property name and delay the controller uses is collected
//! here, loaded from an optional TOML file with defaults matching the
//! platform the controller ships on. Durations are stored as
//! milliseconds in the file and exposed as [`Duration`] accessors.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use softap_core::{ControlError, ControlResult, PollSpec};

/// Root settings record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub radio: RadioSettings,
    pub driver: DriverSettings,
    pub daemon: DaemonSettings,
    pub timing: TimingSettings,
}

impl Settings {
    /// Loads settings from `path` when given, defaults otherwise.
    ///
    /// A present-but-unreadable or unparsable file is an error; an
    /// absent optional path is not.
    pub fn load(path: Option<&Path>) -> ControlResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|e| ControlError::io(path, e))?;
        toml::from_str(&raw).map_err(|e| {
            ControlError::misconfigured(format!("{}: {e}", path.display()))
        })
    }
}

/// Kill-switch discovery and settle timing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RadioSettings {
    /// Root of the rfkill attribute tree.
    pub rfkill_root: PathBuf,
    /// Substring the entry's `type` attribute must start with.
    pub kill_switch_type: String,
    /// Upper bound on the linear scan.
    pub scan_max: u32,
    /// Settle delay before a power-state write.
    pub settle_ms: u64,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            rfkill_root: PathBuf::from("/sys/class/rfkill"),
            kill_switch_type: "wlan".to_string(),
            scan_max: 64,
            settle_ms: 3_000,
        }
    }
}

impl RadioSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Kernel module pair and platform attribute for the wlan driver.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DriverSettings {
    /// Platform polling attribute enabled for the duration of a load.
    pub polling_attr: PathBuf,
    /// Auxiliary module image; must be loaded first.
    pub aux_module_path: PathBuf,
    /// Auxiliary module name as known to the kernel.
    pub aux_module_name: String,
    /// Main driver module image; depends on the auxiliary module.
    pub main_module_path: PathBuf,
    /// Main module name as known to the kernel.
    pub main_module_name: String,
    /// Mode-selecting parameter string for the main module.
    pub main_module_params: String,
    /// Settle delay after both modules are in.
    pub settle_ms: u64,
    /// Unload attempts before reporting persistent contention.
    pub unload_attempts: u32,
    /// Backoff between busy unload attempts.
    pub unload_backoff_ms: u64,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            polling_attr: PathBuf::from("/sys/devices/platform/msm_sdcc.3/polling"),
            aux_module_path: PathBuf::from("/system/lib/modules/librasdioif.ko"),
            aux_module_name: "librasdioif".to_string(),
            main_module_path: PathBuf::from("/system/lib/modules/libra.ko"),
            main_module_name: "libra".to_string(),
            main_module_params: "con_mode=1".to_string(),
            settle_ms: 1_000,
            unload_attempts: 10,
            unload_backoff_ms: 500,
        }
    }
}

impl DriverSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn unload_backoff(&self) -> Duration {
        Duration::from_millis(self.unload_backoff_ms)
    }
}

/// Supervised daemon identity, file locations and poll bounds.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// Daemon name as registered with the service manager.
    pub name: String,
    /// Status property the service manager maintains.
    pub status_property: String,
    /// Control key requesting a start.
    pub ctl_start_key: String,
    /// Control key requesting a stop.
    pub ctl_stop_key: String,
    /// Directory backing the property store.
    pub property_dir: PathBuf,
    /// Read-only configuration template.
    pub template_path: PathBuf,
    /// Live configuration file consumed by the daemon.
    pub config_path: PathBuf,
    /// Control-socket directory the daemon exposes.
    pub ctrl_dir: PathBuf,
    /// Ownership pair applied to the seeded configuration file.
    pub config_uid: u32,
    pub config_gid: u32,
    /// Interface the access point runs on.
    pub ap_iface: String,
    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
    pub status_poll_interval_ms: u64,
    pub socket_timeout_ms: u64,
    pub socket_poll_interval_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            name: "hostapd".to_string(),
            status_property: "init.svc.hostapd".to_string(),
            ctl_start_key: "ctl.start".to_string(),
            ctl_stop_key: "ctl.stop".to_string(),
            property_dir: PathBuf::from("/run/softap/properties"),
            template_path: PathBuf::from("/system/etc/firmware/wlan/hostapd_default.conf"),
            config_path: PathBuf::from("/data/hostapd/hostapd.conf"),
            ctrl_dir: PathBuf::from("/data/hostapd"),
            config_uid: 1000,
            config_gid: 1010,
            ap_iface: "softap.0".to_string(),
            start_timeout_ms: 30_000,
            stop_timeout_ms: 5_000,
            status_poll_interval_ms: 100,
            socket_timeout_ms: 8_000,
            socket_poll_interval_ms: 50,
        }
    }
}

impl DaemonSettings {
    pub fn start_poll(&self) -> PollSpec {
        PollSpec::new(
            Duration::from_millis(self.status_poll_interval_ms),
            Duration::from_millis(self.start_timeout_ms),
        )
    }

    pub fn stop_poll(&self) -> PollSpec {
        PollSpec::new(
            Duration::from_millis(self.status_poll_interval_ms),
            Duration::from_millis(self.stop_timeout_ms),
        )
    }

    pub fn socket_poll(&self) -> PollSpec {
        PollSpec::new(
            Duration::from_millis(self.socket_poll_interval_ms),
            Duration::from_millis(self.socket_timeout_ms),
        )
    }
}

/// Fixed settle delays around orchestrated transitions.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSettings {
    /// Delay after bringing the AP interface up, before the daemon start.
    pub iface_settle_ms: u64,
    /// Delay between daemon start and the control-socket connect.
    pub post_daemon_settle_ms: u64,
    /// Settle after a fully successful start.
    pub bss_start_delay_ms: u64,
    /// Settle after a stop.
    pub bss_stop_delay_ms: u64,
    /// Settle after a configuration write.
    pub set_config_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            iface_settle_ms: 1_000,
            post_daemon_settle_ms: 100,
            bss_start_delay_ms: 200,
            bss_stop_delay_ms: 500,
            set_config_delay_ms: 500,
        }
    }
}

impl TimingSettings {
    pub fn iface_settle(&self) -> Duration {
        Duration::from_millis(self.iface_settle_ms)
    }

    pub fn post_daemon_settle(&self) -> Duration {
        Duration::from_millis(self.post_daemon_settle_ms)
    }

    pub fn bss_start_delay(&self) -> Duration {
        Duration::from_millis(self.bss_start_delay_ms)
    }

    pub fn bss_stop_delay(&self) -> Duration {
        Duration::from_millis(self.bss_stop_delay_ms)
    }

    pub fn set_config_delay(&self) -> Duration {
        Duration::from_millis(self.set_config_delay_ms)
    }
}
