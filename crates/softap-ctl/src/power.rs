//! Radio power gating through the rfkill attribute tree.
//!
//! The kill switch is discovered once per controller lifetime by a
//! linear scan over `rfkill<N>/type` entries and cached. Power toggles
//! are idempotent: the current state is read before every write, and a
//! matching state issues no write at all. An actual toggle is preceded
//! by a multi-second settle delay; the hardware misbehaves when the
//! state attribute is written immediately after discovery.

use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};

use softap_core::{Clock, ControlError, ControlResult, RadioState};

use crate::settings::RadioSettings;

/// Cached location of the wlan kill switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillSwitchHandle {
    /// rfkill index the type scan matched.
    pub index: u32,
    /// Sibling `state` attribute, target of all reads and writes.
    pub state_path: PathBuf,
}

/// Discovers and toggles the radio kill switch.
#[derive(Debug)]
pub struct RadioPowerGate<C: Clock> {
    settings: RadioSettings,
    clock: C,
    handle: Option<KillSwitchHandle>,
}

impl<C: Clock> RadioPowerGate<C> {
    pub fn new(settings: RadioSettings, clock: C) -> Self {
        Self {
            settings,
            clock,
            handle: None,
        }
    }

    /// Locates the kill switch, latching its index and state path.
    ///
    /// Scans `rfkill0..rfkill<scan_max>` and matches the first entry
    /// whose `type` attribute starts with the configured substring. The
    /// scan stops at the first unreadable entry, which on a healthy
    /// sysfs means the directory is exhausted.
    pub fn initialize(&mut self) -> ControlResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        for index in 0..self.settings.scan_max {
            let entry = self
                .settings
                .rfkill_root
                .join(format!("rfkill{index}"));
            let kind = match fs::read_to_string(entry.join("type")) {
                Ok(kind) => kind,
                Err(e) => {
                    debug!(index, error = %e, "rfkill scan exhausted");
                    break;
                }
            };

            if kind.trim_end().starts_with(&self.settings.kill_switch_type) {
                let handle = KillSwitchHandle {
                    index,
                    state_path: entry.join("state"),
                };
                info!(index, state_path = %handle.state_path.display(), "kill switch found");
                self.handle = Some(handle);
                return Ok(());
            }
        }

        Err(ControlError::NotFound {
            what: format!("{} kill switch", self.settings.kill_switch_type),
        })
    }

    /// Reads the current power state from the state attribute.
    pub fn query(&mut self) -> ControlResult<RadioState> {
        self.initialize()?;
        let path = self.state_path()?;

        let mut file = fs::File::open(&path).map_err(|e| ControlError::io(&path, e))?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)
            .map_err(|e| ControlError::io(&path, e))?;

        Ok(RadioState::from_attr_byte(byte[0]))
    }

    /// Drives the radio to the requested power state.
    ///
    /// Idempotent: when the current state already matches, no write is
    /// issued. Otherwise the settle delay elapses first, then exactly
    /// one byte is written.
    pub fn set(&mut self, on: bool) -> ControlResult<()> {
        let target = if on { RadioState::On } else { RadioState::Off };

        if self.query()? == target {
            debug!(%target, "radio already in requested state");
            return Ok(());
        }

        let path = self.state_path()?;
        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| ControlError::io(&path, e))?;

        // Give the hardware a few seconds before changing state.
        self.clock.sleep(self.settings.settle());

        let byte = match target.to_attr_byte() {
            Some(byte) => byte,
            None => {
                // `target` is always On or Off here.
                warn!(%target, "refusing to write unknown radio state");
                return Ok(());
            }
        };
        file.write_all(&[byte])
            .map_err(|e| ControlError::io(&path, e))?;

        info!(%target, "radio power state written");
        Ok(())
    }

    /// The cached handle, if discovery has run.
    pub fn handle(&self) -> Option<&KillSwitchHandle> {
        self.handle.as_ref()
    }

    fn state_path(&self) -> ControlResult<PathBuf> {
        self.handle
            .as_ref()
            .map(|h| h.state_path.clone())
            .ok_or_else(|| ControlError::NotFound {
                what: format!("{} kill switch", self.settings.kill_switch_type),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softap_core::FakeClock;
    use std::time::Duration;
    use tempfile::TempDir;

    fn rfkill_tree(entries: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        for (i, (kind, state)) in entries.iter().enumerate() {
            let entry = dir.path().join(format!("rfkill{i}"));
            fs::create_dir_all(&entry).expect("mkdir");
            fs::write(entry.join("type"), kind).expect("type");
            fs::write(entry.join("state"), state).expect("state");
        }
        dir
    }

    fn gate(dir: &TempDir, clock: FakeClock) -> RadioPowerGate<FakeClock> {
        let settings = RadioSettings {
            rfkill_root: dir.path().to_path_buf(),
            ..RadioSettings::default()
        };
        RadioPowerGate::new(settings, clock)
    }

    #[test]
    fn test_scan_finds_wlan_entry_past_others() {
        let dir = rfkill_tree(&[("bluetooth\n", "1"), ("wlan\n", "1")]);
        let mut gate = gate(&dir, FakeClock::new());
        gate.initialize().expect("initialize");
        let handle = gate.handle().expect("handle");
        assert_eq!(handle.index, 1);
        assert!(handle.state_path.ends_with("rfkill1/state"));
    }

    #[test]
    fn test_scan_exhaustion_is_not_found() {
        let dir = rfkill_tree(&[("bluetooth\n", "1")]);
        let mut gate = gate(&dir, FakeClock::new());
        let err = gate.initialize().unwrap_err();
        assert!(matches!(err, ControlError::NotFound { .. }));
    }

    #[test]
    fn test_query_decodes_state_byte() {
        let dir = rfkill_tree(&[("wlan\n", "1")]);
        let mut gate = gate(&dir, FakeClock::new());
        assert_eq!(gate.query().expect("query"), RadioState::On);

        fs::write(dir.path().join("rfkill0/state"), "0").expect("write");
        assert_eq!(gate.query().expect("query"), RadioState::Off);

        fs::write(dir.path().join("rfkill0/state"), "x").expect("write");
        assert_eq!(gate.query().expect("query"), RadioState::Unknown);
    }

    #[test]
    fn test_set_matching_state_issues_no_write_and_no_sleep() {
        let dir = rfkill_tree(&[("wlan\n", "1")]);
        let clock = FakeClock::new();
        let mut gate = gate(&dir, clock.clone());

        gate.set(true).expect("set");

        assert!(clock.sleeps().is_empty());
        let state = fs::read_to_string(dir.path().join("rfkill0/state")).expect("read");
        assert_eq!(state, "1");
    }

    #[test]
    fn test_set_toggle_sleeps_settle_then_writes_one_byte() {
        let dir = rfkill_tree(&[("wlan\n", "1")]);
        let clock = FakeClock::new();
        let mut gate = gate(&dir, clock.clone());

        gate.set(false).expect("set");

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
        let state = fs::read_to_string(dir.path().join("rfkill0/state")).expect("read");
        // Single-byte write over the previous contents.
        assert_eq!(state.as_bytes()[0], b'0');
    }

    #[test]
    fn test_handle_is_cached_across_calls() {
        let dir = rfkill_tree(&[("wlan\n", "1")]);
        let mut gate = gate(&dir, FakeClock::new());
        gate.initialize().expect("first");

        // Removing the type attribute does not disturb the cached handle.
        fs::remove_file(dir.path().join("rfkill0/type")).expect("rm");
        gate.initialize().expect("cached");
        assert_eq!(gate.query().expect("query"), RadioState::On);
    }
}
