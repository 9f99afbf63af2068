//! Configuration module
//!
//! Holds the launcher settings used to start OpenVPN and the persisted
//! user preferences.

use std::path::PathBuf;
use std::time::Duration;

pub mod preferences;

pub use preferences::Preferences;

/// Default location of the OpenVPN binary
pub const DEFAULT_OPENVPN_BINARY: &str = "/usr/sbin/openvpn";

/// Default privilege elevation prefix
pub const DEFAULT_ELEVATION: &str = "/usr/bin/sudo";

/// PATH handed to the child so elevation tooling resolves predictably
pub const CHILD_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Settings for launching and supervising the OpenVPN process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Path to the OpenVPN binary
    pub openvpn_binary: PathBuf,

    /// Optional command prefix granting network privileges (e.g. sudo)
    ///
    /// `None` when the binary already holds CAP_NET_ADMIN.
    pub elevation: Option<PathBuf>,

    /// How long to wait for the tunnel to come up
    pub handshake_timeout: Duration,

    /// How long to wait after SIGTERM before sending SIGKILL
    pub termination_grace: Duration,

    /// Directory for the transient credentials file (system temp dir if unset)
    pub credentials_dir: Option<PathBuf>,
}

impl LauncherConfig {
    /// Create a launcher configuration for the given binary with default timings
    pub fn new(openvpn_binary: impl Into<PathBuf>) -> Self {
        Self {
            openvpn_binary: openvpn_binary.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.openvpn_binary.as_os_str().is_empty() {
            return Err("OpenVPN binary path cannot be empty".to_string());
        }

        if let Some(elevation) = &self.elevation {
            if elevation.as_os_str().is_empty() {
                return Err("Elevation prefix cannot be empty".to_string());
            }
        }

        if self.handshake_timeout.is_zero() {
            return Err("Handshake timeout cannot be zero".to_string());
        }

        if let Some(dir) = &self.credentials_dir {
            if !dir.is_dir() {
                return Err(format!("Credentials directory {:?} does not exist", dir));
            }
        }

        Ok(())
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            openvpn_binary: PathBuf::from(DEFAULT_OPENVPN_BINARY),
            elevation: Some(PathBuf::from(DEFAULT_ELEVATION)),
            handshake_timeout: Duration::from_secs(30),
            termination_grace: Duration::from_secs(5),
            credentials_dir: None,
        }
    }
}
