//! softapctl - command-line control surface for the SoftAP controller
//!
//! This binary drives the SoftAP lifecycle from a shell: bringing the
//! access point up and down, rewriting its profile, and gating the
//! radio kill switch.
//!
//! # Usage
//!
//! ```text
//! softapctl start                          # Load driver, start daemon
//! softapctl stop                           # Stop daemon
//! softapctl status                         # Observed daemon state
//! softapctl set wlan0 softap.0 MyAP ...    # Rewrite the AP profile
//! softapctl power on|off|status            # Radio kill switch
//! softapctl fw-reload wlan0 softap.0       # Firmware reload hook
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use softap_core::RadioState;
use softap_ctl::{Settings, SystemController};

// ============================================================================
// CLI Arguments
// ============================================================================

/// SoftAP lifecycle controller
#[derive(Parser, Debug)]
#[command(name = "softapctl")]
#[command(about = "Control a wlan radio in SoftAP mode")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Settings file (TOML); defaults are used when absent
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the driver and start the access-point daemon
    Start,
    /// Stop the access-point daemon
    Stop,
    /// Report the observed daemon state
    Status,
    /// Rewrite the access-point profile
    ///
    /// Positional fields: wlan interface, AP interface, then optionally
    /// SSID, security mode, passphrase, channel, preamble, max stations.
    Set {
        #[arg(required = true, num_args = 2..)]
        args: Vec<String>,
    },
    /// Query or toggle the radio kill switch
    Power { action: PowerAction },
    /// Request a firmware reload for the given interfaces
    FwReload {
        #[arg(required = true, num_args = 2..)]
        args: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PowerAction {
    On,
    Off,
    Status,
}

// ============================================================================
// Settings Resolution
// ============================================================================

/// Explicit `--config` wins; otherwise the per-user settings file is
/// used when present, defaults when not.
fn resolve_settings(config: Option<PathBuf>) -> Result<Settings> {
    let path = config.or_else(|| {
        let candidate = dirs::config_dir()?.join("softap").join("softap.toml");
        candidate.exists().then_some(candidate)
    });
    Settings::load(path.as_deref()).context("Failed to load settings")
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("softapctl=info".parse()?)
                .add_directive("softap_ctl=info".parse()?)
                .add_directive("softap_sys=info".parse()?)
                .add_directive("softap_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let settings = resolve_settings(args.config)?;
    let mut controller = SystemController::system(settings);

    match args.command {
        Command::Start => {
            controller.start().context("Failed to start softap")?;
            println!("softap started");
        }
        Command::Stop => {
            controller.stop().context("Failed to stop softap")?;
            println!("softap stopped");
        }
        Command::Status => {
            let started = controller.is_started();
            println!("softap: {}", if started { "started" } else { "stopped" });
        }
        Command::Set { args } => {
            controller
                .set_config(&args)
                .context("Failed to apply softap configuration")?;
            println!("softap configuration applied");
        }
        Command::Power { action } => match action {
            PowerAction::On => {
                controller
                    .set_radio_power(true)
                    .context("Failed to power radio on")?;
                println!("radio powered on");
            }
            PowerAction::Off => {
                controller
                    .set_radio_power(false)
                    .context("Failed to power radio off")?;
                println!("radio powered off");
            }
            PowerAction::Status => {
                let state = controller.radio_state().context("Failed to query radio")?;
                match state {
                    RadioState::On => println!("radio: on"),
                    RadioState::Off => println!("radio: off"),
                    RadioState::Unknown => println!("radio: unknown"),
                }
            }
        },
        Command::FwReload { args } => {
            controller
                .reload_firmware(&args)
                .context("Failed to request firmware reload")?;
            println!("firmware reload requested");
        }
    }

    info!("softapctl done");
    Ok(())
}
