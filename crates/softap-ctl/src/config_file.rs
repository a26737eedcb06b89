//! Daemon configuration file management.
//!
//! Two responsibilities: seed the live configuration from the read-only
//! template on first driver load, and rewrite it from runtime parameters
//! on request. Rewrites are atomic — the new contents are staged in a
//! temporary file in the target directory and renamed over the previous
//! file, which therefore survives any mid-write failure intact.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{Read, Write};
use std::os::unix::fs::{chown, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use softap_core::{ApConfig, ControlError, ControlResult, SecurityMode};
use softap_core::config::{
    DEFAULT_BEACON_INTERVAL, DEFAULT_CHANNEL, DEFAULT_DTIM_PERIOD, DEFAULT_MAX_STA,
    DEFAULT_PREAMBLE,
};

use crate::settings::DaemonSettings;

/// Driver identifier advertised to the daemon.
const DRIVER_NAME: &str = "QcHostapd";

/// Fixed hardware-capability advertisement.
const HT_CAPAB: &str = "[LDPC] [HT40+] [GF] [SHORT-GI-20] [SHORT-GI-40] [TX-STBC] [RX-STBC1] [RX-STBC12] [RX-STBC123] [DELAYED-BA] [MAX-AMSDU-7935] [DSSS_CCK-40] [PSMP] [LSIG-TXOP-PROT]";

/// Template copy chunk size.
const COPY_CHUNK: usize = 2048;

/// Mode bits for the live configuration file.
const CONFIG_MODE: u32 = 0o660;

/// Seeds and rewrites the daemon configuration file.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    template_path: PathBuf,
    config_path: PathBuf,
    ctrl_dir: PathBuf,
    owner_uid: u32,
    owner_gid: u32,
}

impl ConfigWriter {
    pub fn new(settings: &DaemonSettings) -> Self {
        Self {
            template_path: settings.template_path.clone(),
            config_path: settings.config_path.clone(),
            ctrl_dir: settings.ctrl_dir.clone(),
            owner_uid: settings.config_uid,
            owner_gid: settings.config_gid,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Makes sure the live configuration exists before the daemon runs.
    ///
    /// No-op when the target opens read+write. An absent target is
    /// seeded by a chunked byte-for-byte copy of the template, then
    /// narrowed to the configured ownership and mode. Any copy or
    /// ownership error deletes the partial output. A non-ENOENT access
    /// error is a hard failure distinct from "absent".
    pub fn ensure_template_copied(&self) -> ControlResult<()> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.config_path)
        {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ControlError::io(&self.config_path, e)),
        }

        self.copy_template()
    }

    fn copy_template(&self) -> ControlResult<()> {
        let mut src = fs::File::open(&self.template_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ControlError::misconfigured(format!(
                    "daemon config template missing: {}",
                    self.template_path.display()
                ))
            } else {
                ControlError::io(&self.template_path, e)
            }
        })?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ControlError::io(parent, e))?;
        }

        let mut dest = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(CONFIG_MODE)
            .open(&self.config_path)
            .map_err(|e| ControlError::io(&self.config_path, e))?;

        let mut buf = [0u8; COPY_CHUNK];
        loop {
            let n = match src.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    self.discard_partial();
                    return Err(ControlError::io(&self.template_path, e));
                }
            };
            if let Err(e) = dest.write_all(buf.get(..n).unwrap_or(&[])) {
                self.discard_partial();
                return Err(ControlError::io(&self.config_path, e));
            }
        }
        drop(dest);

        // Open in the umask's shadow leaves the mode unpredictable;
        // narrow to the fixed ownership and bits.
        if let Err(e) = chown(
            &self.config_path,
            Some(self.owner_uid),
            Some(self.owner_gid),
        ) {
            self.discard_partial();
            return Err(ControlError::io(&self.config_path, e));
        }
        if let Err(e) =
            fs::set_permissions(&self.config_path, Permissions::from_mode(CONFIG_MODE))
        {
            self.discard_partial();
            return Err(ControlError::io(&self.config_path, e));
        }

        info!(
            template = %self.template_path.display(),
            config = %self.config_path.display(),
            "daemon configuration seeded from template"
        );
        Ok(())
    }

    fn discard_partial(&self) {
        let _ = fs::remove_file(&self.config_path);
    }

    /// Replaces the configuration with one rendered from `cfg`.
    ///
    /// The whole file is rewritten; nothing from a previous
    /// configuration is merged in. The replacement is atomic.
    pub fn write_config(&self, cfg: &ApConfig) -> ControlResult<()> {
        let content = self.render(cfg);
        let dir = self
            .config_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| ControlError::io(dir, e))?;

        let mut staged = tempfile::Builder::new()
            .prefix(".hostapd.conf.")
            .tempfile_in(dir)
            .map_err(|e| ControlError::io(dir, e))?;
        staged
            .write_all(content.as_bytes())
            .map_err(|e| ControlError::io(staged.path(), e))?;
        staged
            .as_file()
            .set_permissions(Permissions::from_mode(CONFIG_MODE))
            .map_err(|e| ControlError::io(staged.path(), e))?;

        staged
            .persist(&self.config_path)
            .map_err(|e| ControlError::io(&self.config_path, e.error))?;

        debug!(config = %self.config_path.display(), ssid = cfg.ssid_or_default(), "configuration written");
        Ok(())
    }

    fn render(&self, cfg: &ApConfig) -> String {
        let mut out = String::new();
        let mut line = |s: String| {
            out.push_str(&s);
            out.push('\n');
        };

        line(format!("driver={DRIVER_NAME}"));
        line(format!("interface={}", cfg.ap_iface));
        line(format!("ctrl_interface={}", self.ctrl_dir.display()));
        line(format!("ht_capab={HT_CAPAB}"));
        line(format!("ssid={}", cfg.ssid_or_default()));
        // Open authentication; WPA2 layers on top when requested.
        line("auth_algs=3".to_string());
        line(format!("max_num_sta={DEFAULT_MAX_STA}"));
        line(format!("beacon_int={DEFAULT_BEACON_INTERVAL}"));
        line(format!("dtim_period={DEFAULT_DTIM_PERIOD}"));

        if cfg.security == SecurityMode::Wpa2Psk {
            line("wpa=2".to_string());
            line("wpa_key_mgmt=WPA-PSK".to_string());
            line("wpa_pairwise=CCMP".to_string());
            line(format!("wpa_passphrase={}", cfg.passphrase_or_default()));
        }

        match &cfg.channel {
            Some(channel) => line(format!("channel={channel}")),
            None => line(format!("channel={DEFAULT_CHANNEL}")),
        }
        match &cfg.preamble {
            Some(preamble) => line(format!("preamble={preamble}")),
            None => line(format!("preamble={DEFAULT_PREAMBLE}")),
        }

        out
    }
}
