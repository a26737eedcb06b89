//! End-to-end controller sequencing against fake OS seams.
//!
//! These tests drive [`SoftapController`] through full start/stop/config
//! cycles and assert the externally visible effects: which modules were
//! loaded, which control properties were set, which files appeared, and
//! how long the controller waited.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use softap_core::{ApIntent, ControlError, FakeClock};
use softap_ctl::{DriverState, Settings, SoftapController};
use softap_sys::fake::{FakeLinkControl, FakeModuleLoader, FakePropertyStore};

const STATUS: &str = "init.svc.hostapd";

struct Fixture {
    dir: TempDir,
    settings: Settings,
    props: FakePropertyStore,
    loader: FakeModuleLoader,
    link: FakeLinkControl,
    clock: FakeClock,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("librasdioif.ko"), b"aux image").expect("aux image");
        fs::write(dir.path().join("libra.ko"), b"main image").expect("main image");
        fs::write(dir.path().join("polling"), "0").expect("polling attr");
        fs::write(
            dir.path().join("hostapd_default.conf"),
            b"ssid=AndroidAP\nchannel=4\n",
        )
        .expect("template");
        fs::create_dir(dir.path().join("hostapd")).expect("ctrl dir");

        let mut settings = Settings::default();
        settings.driver.polling_attr = dir.path().join("polling");
        settings.driver.aux_module_path = dir.path().join("librasdioif.ko");
        settings.driver.main_module_path = dir.path().join("libra.ko");
        settings.daemon.template_path = dir.path().join("hostapd_default.conf");
        settings.daemon.config_path = dir.path().join("hostapd").join("hostapd.conf");
        settings.daemon.ctrl_dir = dir.path().join("hostapd");
        settings.daemon.property_dir = dir.path().join("properties");
        // chown to self so the template copy succeeds unprivileged
        settings.daemon.config_uid = unsafe { libc::getuid() };
        settings.daemon.config_gid = unsafe { libc::getgid() };

        Self {
            dir,
            settings,
            props: FakePropertyStore::new(),
            loader: FakeModuleLoader::new(),
            link: FakeLinkControl::new(),
            clock: FakeClock::new(),
        }
    }

    fn controller(
        &self,
    ) -> SoftapController<FakePropertyStore, FakeModuleLoader, FakeLinkControl, FakeClock> {
        SoftapController::new(
            self.settings.clone(),
            self.props.clone(),
            self.loader.clone(),
            self.link.clone(),
            self.clock.clone(),
        )
    }

    /// Creates the daemon's control-socket node up front.
    fn create_ctrl_socket(&self) {
        fs::write(self.dir.path().join("hostapd").join("softap.0"), b"").expect("socket node");
    }

    /// Scripts the usual successful start transition: stopped until the
    /// first status poll, then running under a fresh generation.
    fn script_clean_start(&self) {
        self.props.push_observation(STATUS, Some("stopped"), 1);
        self.props.push_observation(STATUS, Some("stopped"), 1);
        self.props.push_observation(STATUS, Some("stopped"), 1);
        self.props.push_observation(STATUS, Some("running"), 2);
    }
}

// ============================================================================
// Start
// ============================================================================

#[test]
fn test_start_sequences_driver_interface_and_daemon() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.script_clean_start();
    let mut ctl = fx.controller();

    ctl.start().expect("start");

    // Modules in dependency order, with the mode parameter on the main one.
    let loads = fx.loader.loads();
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0], (b"aux image".to_vec(), String::new()));
    assert_eq!(loads[1], (b"main image".to_vec(), "con_mode=1".to_string()));

    // AP interface came up, daemon got exactly one start request.
    assert_eq!(fx.link.ups(), vec!["softap.0".to_string()]);
    assert_eq!(
        fx.props.sets(),
        vec![("ctl.start".to_string(), "hostapd".to_string())]
    );

    // Polling attribute toggled back off after the load.
    assert_eq!(
        fs::read_to_string(fx.dir.path().join("polling")).expect("polling"),
        "0"
    );

    // Config seeded from the template by the driver load.
    let seeded = fs::read(&fx.settings.daemon.config_path).expect("seeded config");
    assert_eq!(seeded, b"ssid=AndroidAP\nchannel=4\n");

    assert_eq!(ctl.intent(), ApIntent::Started);
    assert_eq!(ctl.driver_state(), DriverState::Present);
    assert!(ctl.is_started());

    // driver settle 1s + iface settle 1s + one status poll interval
    // + post-daemon settle 100ms + start settle 200ms.
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(2_400));
}

#[test]
fn test_start_twice_is_a_no_op() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.script_clean_start();
    let mut ctl = fx.controller();

    ctl.start().expect("first start");
    fx.clock.clear_sleeps();

    ctl.start().expect("second start");

    assert_eq!(fx.loader.loads().len(), 2);
    assert_eq!(fx.props.sets().len(), 1);
    assert_eq!(fx.clock.total_slept(), Duration::ZERO);
}

#[test]
fn test_start_survives_interface_up_failure() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.script_clean_start();
    fx.link.fail_with(std::io::ErrorKind::PermissionDenied);
    let mut ctl = fx.controller();

    ctl.start().expect("start despite link failure");

    assert!(fx.link.ups().is_empty());
    assert!(ctl.is_started());
}

#[test]
fn test_start_falls_back_when_socket_never_appears() {
    let fx = Fixture::new();
    // No create_ctrl_socket: the node never shows up.
    fx.script_clean_start();
    let mut ctl = fx.controller();

    ctl.start().expect("start with endpoint fallback");

    assert_eq!(ctl.intent(), ApIntent::Started);
    // The 8s socket wait ran to its deadline on top of the usual delays.
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(10_400));
}

// ============================================================================
// Start failure compensation
// ============================================================================

#[test]
fn test_daemon_start_timeout_unloads_driver() {
    let fx = Fixture::new();
    fx.props.push_observation(STATUS, Some("stopped"), 1);
    let mut ctl = fx.controller();

    let err = ctl.start().unwrap_err();
    match err {
        ControlError::PartialFailure {
            compensated,
            source,
            ..
        } => {
            assert!(compensated);
            assert!(matches!(*source, ControlError::Timeout { .. }));
        }
        other => panic!("expected partial failure, got {other}"),
    }

    // Compensation unloaded main then auxiliary.
    assert_eq!(
        fx.loader.unloads(),
        vec!["libra".to_string(), "librasdioif".to_string()]
    );
    assert_eq!(ctl.intent(), ApIntent::Stopped);
    assert_eq!(ctl.driver_state(), DriverState::Absent);
}

#[test]
fn test_daemon_crash_during_start_is_not_a_timeout() {
    let fx = Fixture::new();
    fx.props.push_observation(STATUS, Some("stopped"), 5);
    fx.props.push_observation(STATUS, Some("stopped"), 5);
    fx.props.push_observation(STATUS, Some("stopped"), 5);
    // Same value, new generation: the daemon started and died.
    fx.props.push_observation(STATUS, Some("stopped"), 8);
    let mut ctl = fx.controller();

    let err = ctl.start().unwrap_err();
    match err {
        ControlError::PartialFailure { source, .. } => {
            assert!(matches!(*source, ControlError::DaemonCrashed { .. }));
        }
        other => panic!("expected partial failure, got {other}"),
    }

    // Crash detection fires on the first post-request poll, well before
    // the 30s deadline.
    assert!(fx.clock.total_slept() < Duration::from_secs(5));
}

#[test]
fn test_daemon_death_before_connect_runs_full_chain() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.props.push_observation(STATUS, Some("stopped"), 1);
    fx.props.push_observation(STATUS, Some("stopped"), 1);
    fx.props.push_observation(STATUS, Some("stopped"), 1);
    fx.props.push_observation(STATUS, Some("running"), 2);
    fx.props.push_observation(STATUS, Some("stopped"), 3);
    let mut ctl = fx.controller();

    let err = ctl.start().unwrap_err();
    match err {
        ControlError::PartialFailure {
            compensated,
            source,
            ..
        } => {
            assert!(compensated);
            assert!(matches!(*source, ControlError::Misconfiguration { .. }));
        }
        other => panic!("expected partial failure, got {other}"),
    }

    // Daemon already observed stopped, so only the driver needed undoing.
    assert_eq!(
        fx.loader.unloads(),
        vec!["libra".to_string(), "librasdioif".to_string()]
    );
    assert_eq!(ctl.intent(), ApIntent::Stopped);
}

#[test]
fn test_failed_start_can_be_retried() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.loader.fail_next_load(std::io::ErrorKind::NotFound);
    let mut ctl = fx.controller();

    assert!(ctl.start().is_err());
    assert_eq!(ctl.driver_state(), DriverState::Unknown);

    fx.script_clean_start();
    ctl.start().expect("retry");
    assert!(ctl.is_started());
}

// ============================================================================
// Stop
// ============================================================================

#[test]
fn test_stop_requests_daemon_stop_and_clears_intent() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.script_clean_start();
    let mut ctl = fx.controller();
    ctl.start().expect("start");
    fx.clock.clear_sleeps();

    fx.props.push_observation(STATUS, Some("running"), 2);
    fx.props.push_observation(STATUS, Some("stopped"), 3);

    ctl.stop().expect("stop");

    assert_eq!(
        fx.props.sets().last().map(|(k, v)| (k.as_str(), v.as_str())),
        Some(("ctl.stop", "hostapd"))
    );
    assert_eq!(ctl.intent(), ApIntent::Stopped);
    assert!(!ctl.is_started());
    // One status poll interval plus the stop settle.
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(600));
    // Modules stay loaded across a plain stop.
    assert!(fx.loader.unloads().is_empty());
}

#[test]
fn test_stop_without_start_is_a_no_op() {
    let fx = Fixture::new();
    let mut ctl = fx.controller();

    ctl.stop().expect("stop");

    assert!(fx.props.sets().is_empty());
    assert_eq!(fx.clock.total_slept(), Duration::ZERO);
}

#[test]
fn test_stop_timeout_still_clears_intent() {
    let fx = Fixture::new();
    fx.create_ctrl_socket();
    fx.script_clean_start();
    let mut ctl = fx.controller();
    ctl.start().expect("start");

    // Daemon never leaves running.
    fx.props.push_observation(STATUS, Some("running"), 2);
    fx.props.push_observation(STATUS, Some("running"), 2);

    let err = ctl.stop().unwrap_err();
    assert!(matches!(err, ControlError::Timeout { .. }));
    // Optimistic clear: a retry of stop is a no-op, start is possible.
    assert_eq!(ctl.intent(), ApIntent::Stopped);
    ctl.stop().expect("second stop is a no-op");
}

// ============================================================================
// Configuration and auxiliary operations
// ============================================================================

#[test]
fn test_set_config_writes_profile() {
    let fx = Fixture::new();
    let mut ctl = fx.controller();

    ctl.set_config(&["wlan0", "softap.0", "CoffeeShop", "wpa2-psk", "latte4you"])
        .expect("set config");

    let written = fs::read_to_string(&fx.settings.daemon.config_path).expect("config");
    assert!(written.contains("ssid=CoffeeShop\n"));
    assert!(written.contains("wpa=2\n"));
    assert!(written.contains("wpa_passphrase=latte4you\n"));
    assert_eq!(fx.clock.total_slept(), Duration::from_millis(500));
}

#[test]
fn test_set_config_rejects_short_argument_list() {
    let fx = Fixture::new();
    let mut ctl = fx.controller();

    let err = ctl.set_config(&["wlan0"]).unwrap_err();
    assert!(matches!(err, ControlError::Misconfiguration { .. }));
    assert!(!fx.settings.daemon.config_path.exists());
}

#[test]
fn test_is_started_tracks_observed_status_not_intent() {
    let fx = Fixture::new();
    let ctl = fx.controller();

    // Never started by us, but the daemon is up (e.g. started externally).
    fx.props.insert(STATUS, "running");
    assert!(ctl.is_started());
    assert_eq!(ctl.intent(), ApIntent::Stopped);

    fx.props.insert(STATUS, "stopped");
    assert!(!ctl.is_started());
}

#[test]
fn test_reload_firmware_validates_argument_count() {
    let fx = Fixture::new();
    let ctl = fx.controller();

    assert!(ctl.reload_firmware::<&str>(&[]).is_err());
    assert!(ctl.reload_firmware(&["wlan0"]).is_err());
    ctl.reload_firmware(&["wlan0", "softap.0"]).expect("reload");
}
