//! Access-point configuration parameters.
//!
//! Parameters arrive as a positional argument slice from the outer
//! control path and are validated only by count; everything past the two
//! interface names is optional and falls back to the fixed defaults the
//! daemon configuration has always shipped with.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Default SSID when none is supplied.
pub const DEFAULT_SSID: &str = "AndroidAP";
/// Default WPA passphrase when wpa2-psk is requested without a key.
/// Known weak; kept for compatibility with the template defaults.
pub const DEFAULT_PASSPHRASE: &str = "12345678";
/// Default channel.
pub const DEFAULT_CHANNEL: u32 = 4;
/// Default preamble mode.
pub const DEFAULT_PREAMBLE: u32 = 0;
/// Fixed maximum station count advertised to the daemon.
pub const DEFAULT_MAX_STA: u32 = 255;
/// Fixed beacon interval in TU.
pub const DEFAULT_BEACON_INTERVAL: u32 = 100;
/// Fixed DTIM period in beacons.
pub const DEFAULT_DTIM_PERIOD: u32 = 2;

/// Minimum number of positional fields: wlan interface and AP interface.
pub const MIN_CONFIG_ARGS: usize = 2;

/// Security mode for the access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMode {
    /// Open authentication, no WPA block emitted.
    #[default]
    Open,
    /// WPA2-PSK with CCMP pairwise cipher.
    Wpa2Psk,
}

impl SecurityMode {
    /// Parses the positional security field.
    ///
    /// Matches by prefix: anything starting with "wpa2-psk" selects
    /// WPA2-PSK, everything else is open.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("wpa2-psk") {
            Self::Wpa2Psk
        } else {
            Self::Open
        }
    }
}

/// Runtime parameters for one access-point profile.
///
/// Field order mirrors the positional argument order:
/// wlan interface, AP interface, SSID, security, key, channel, preamble,
/// max stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApConfig {
    pub wlan_iface: String,
    pub ap_iface: String,
    pub ssid: Option<String>,
    pub security: SecurityMode,
    pub passphrase: Option<String>,
    pub channel: Option<String>,
    pub preamble: Option<String>,
    /// Parsed but not emitted; the daemon configuration carries the
    /// fixed [`DEFAULT_MAX_STA`] instead.
    pub max_stations: Option<String>,
}

impl ApConfig {
    /// Parses a positional argument slice.
    ///
    /// Fails fast with [`ControlError::Misconfiguration`] when fewer than
    /// [`MIN_CONFIG_ARGS`] fields are present. No per-field validation is
    /// performed beyond the count check.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> ControlResult<Self> {
        if args.len() < MIN_CONFIG_ARGS {
            return Err(ControlError::misconfigured(format!(
                "softap set needs at least {MIN_CONFIG_ARGS} arguments, got {}",
                args.len()
            )));
        }

        let field = |idx: usize| args.get(idx).map(|s| s.as_ref().to_string());

        // Count check above guarantees the first two fields exist.
        let wlan_iface = field(0).unwrap_or_default();
        let ap_iface = field(1).unwrap_or_default();

        Ok(Self {
            wlan_iface,
            ap_iface,
            ssid: field(2),
            security: field(3)
                .map(|s| SecurityMode::parse(&s))
                .unwrap_or_default(),
            passphrase: field(4),
            channel: field(5),
            preamble: field(6),
            max_stations: field(7),
        })
    }

    /// SSID to emit, falling back to the fixed default.
    pub fn ssid_or_default(&self) -> &str {
        self.ssid.as_deref().unwrap_or(DEFAULT_SSID)
    }

    /// Passphrase to emit in the WPA block, falling back to the fixed
    /// (known weak) default.
    pub fn passphrase_or_default(&self) -> &str {
        self.passphrase.as_deref().unwrap_or(DEFAULT_PASSPHRASE)
    }
}
