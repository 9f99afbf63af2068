//! VPN connection command
//!
//! Resolves the config file and credentials, launches openvpn through the
//! session controller and stays in the foreground until Ctrl+C or until the
//! tunnel goes down.

use crate::cli::prompt::{prompt_password, prompt_required};
use crate::cli::status::print_status;
use clap::Args;
use ovpn_core::config::preferences::{load_preferences, save_preferences};
use ovpn_core::config::{LauncherConfig, Preferences, DEFAULT_ELEVATION, DEFAULT_OPENVPN_BINARY};
use ovpn_core::error::{ConfigError, OvpnError, VpnError};
use ovpn_core::types::Credentials;
use ovpn_core::vpn::{ConnectionState, SessionController};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// OpenVPN config file (.ovpn or .conf), defaults to the remembered one
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// VPN username, defaults to the remembered one
    #[arg(short, long)]
    pub username: Option<String>,

    /// Remember the config file and username for next time
    #[arg(long)]
    pub remember: bool,

    /// Path to the openvpn binary
    #[arg(long, value_name = "PATH")]
    pub openvpn: Option<PathBuf>,

    /// Command used to run openvpn with network privileges
    #[arg(long, value_name = "PATH", conflicts_with = "no_elevation")]
    pub elevation: Option<PathBuf>,

    /// Run openvpn directly, e.g. when it already holds CAP_NET_ADMIN
    #[arg(long)]
    pub no_elevation: bool,

    /// Seconds to wait for the tunnel to come up
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

/// Run the connect command
pub async fn run_connect(args: ConnectArgs) -> Result<(), OvpnError> {
    let saved = load_preferences().unwrap_or_else(|e| {
        warn!("Ignoring unreadable saved settings: {}", e);
        Preferences::default()
    });

    let config_path = args
        .config
        .clone()
        .or_else(|| saved.config_file())
        .ok_or(ConfigError::MissingField {
            field: "config file (pass --config)".to_string(),
        })?;
    if !config_path.is_file() {
        return Err(ConfigError::LoadFailed {
            path: config_path.display().to_string(),
        }
        .into());
    }
    let config_path = config_path.canonicalize()?;

    let username = match args.username.clone().or_else(|| saved.username().map(str::to_string)) {
        Some(username) => username,
        None => prompt_required("Username")?,
    };

    if args.remember {
        save_preferences(&Preferences::new(config_path.display().to_string(), &username))?;
        info!("Saved config file and username");
    }

    let launcher = launcher_config(&args)?;
    let password = prompt_password("Password")?;
    let credentials = Credentials::new(username, password)?;

    let controller = SessionController::new(launcher)?;
    println!("Using config file: {}", config_path.display());
    print_status(&ConnectionState::Connecting);

    // Ctrl+C during the handshake drops the connect future; disconnect then
    // reclaims the half-open session and cleans it up.
    let outcome = tokio::select! {
        result = controller.connect(&config_path, credentials) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted while connecting");
            controller.disconnect().await;
            Err(VpnError::Cancelled)
        }
    };

    if let Err(e) = outcome {
        print_status(&ConnectionState::Failed(e.to_string()));
        return Err(e.into());
    }

    print_status(&ConnectionState::Connected);
    println!("Press Ctrl+C to disconnect");

    let mut watcher = controller.subscribe();
    let lost = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Disconnect requested");
            None
        }
        state = watcher.wait_until_down() => Some(state),
    };

    controller.disconnect().await;

    match lost {
        None => {
            print_status(&ConnectionState::Disconnected);
            Ok(())
        }
        Some(state) => {
            warn!("VPN connection lost ({})", state);
            print_status(&ConnectionState::Disconnected);
            Err(VpnError::ConnectionFailed {
                reason: "connection lost".to_string(),
            }
            .into())
        }
    }
}

/// Build the launcher settings from the command-line flags
fn launcher_config(args: &ConnectArgs) -> Result<LauncherConfig, OvpnError> {
    let openvpn_binary = match &args.openvpn {
        Some(path) => path.clone(),
        None => find_openvpn()?,
    };

    let elevation = if args.no_elevation {
        None
    } else {
        Some(
            args.elevation
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ELEVATION)),
        )
    };

    let config = LauncherConfig {
        elevation,
        handshake_timeout: Duration::from_secs(args.timeout),
        ..LauncherConfig::new(openvpn_binary)
    };
    config
        .validate()
        .map_err(|message| ConfigError::ValidationError { message })?;

    Ok(config)
}

/// Locate openvpn: the usual sbin location first, then PATH
fn find_openvpn() -> Result<PathBuf, OvpnError> {
    let default = Path::new(DEFAULT_OPENVPN_BINARY);
    if default.exists() {
        return Ok(default.to_path_buf());
    }

    which::which("openvpn").map_err(|_| {
        ConfigError::ValidationError {
            message: format!(
                "openvpn not found at {} or in PATH (pass --openvpn)",
                DEFAULT_OPENVPN_BINARY
            ),
        }
        .into()
    })
}
