//! Persisted user preferences
//!
//! Remembers the last OpenVPN config file and username in a flat TOML
//! key/value file inside the user's configuration directory.

use crate::error::{ConfigError, OvpnError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings file name inside the configuration directory
const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Application directory name under ~/.config
const APP_DIR_NAME: &str = "openvpn-gui";

/// Remembered connection inputs
///
/// Both keys default to an empty string when missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Absolute path of the last used .ovpn file
    #[serde(default)]
    pub config_file_path: String,

    /// Last used username
    #[serde(default)]
    pub username: String,
}

impl Preferences {
    pub fn new(config_file_path: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            config_file_path: config_file_path.into(),
            username: username.into(),
        }
    }

    /// Saved config file path, if any
    pub fn config_file(&self) -> Option<PathBuf> {
        if self.config_file_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.config_file_path))
        }
    }

    /// Saved username, if any
    pub fn username(&self) -> Option<&str> {
        if self.username.is_empty() {
            None
        } else {
            Some(&self.username)
        }
    }
}

/// Get the configuration directory
///
/// Returns ~/.config/openvpn-gui, or OVPN_CONFIG_DIR if set. When running
/// under sudo the invoking user's home is used instead of root's.
pub fn get_config_dir() -> Result<PathBuf, OvpnError> {
    if let Ok(config_dir) = std::env::var("OVPN_CONFIG_DIR") {
        return Ok(PathBuf::from(config_dir));
    }

    let home = if let Ok(sudo_user) = std::env::var("SUDO_USER") {
        std::env::var("SUDO_HOME").unwrap_or_else(|_| format!("/home/{}", sudo_user))
    } else {
        std::env::var("HOME").map_err(|_| {
            OvpnError::Config(ConfigError::IoError {
                message: "HOME environment variable not set".to_string(),
            })
        })?
    };

    Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
}

/// Get the default settings file path
pub fn get_settings_path() -> Result<PathBuf, OvpnError> {
    Ok(get_config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Load preferences from the default settings file
pub fn load_preferences() -> Result<Preferences, OvpnError> {
    load_preferences_from_path(get_settings_path()?)
}

/// Load preferences from a specific file
///
/// A missing file yields empty preferences.
pub fn load_preferences_from_path<P: AsRef<Path>>(path: P) -> Result<Preferences, OvpnError> {
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings file at {:?}, using defaults", path.as_ref());
            return Ok(Preferences::default());
        }
        Err(e) => {
            return Err(OvpnError::Config(ConfigError::IoError {
                message: format!("Failed to read settings file: {}", e),
            }))
        }
    };

    let preferences: Preferences = toml::from_str(&contents)?;
    Ok(preferences)
}

/// Save preferences to the default settings file
pub fn save_preferences(preferences: &Preferences) -> Result<(), OvpnError> {
    save_preferences_to_path(preferences, get_settings_path()?)
}

/// Save preferences to a specific file, readable and writable by the owner only
pub fn save_preferences_to_path<P: AsRef<Path>>(
    preferences: &Preferences,
    path: P,
) -> Result<(), OvpnError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            OvpnError::Config(ConfigError::IoError {
                message: format!("Failed to create config directory: {}", e),
            })
        })?;
    }

    let contents = toml::to_string_pretty(preferences)?;

    // A file left over from an older save may have looser permissions;
    // tighten it before new contents go in. New files are created 0600.
    if path.exists() {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(|e| {
            OvpnError::Config(ConfigError::IoError {
                message: format!("Failed to restrict settings file permissions: {}", e),
            })
        })?;
    }

    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()))
        .map_err(|_| {
            OvpnError::Config(ConfigError::SaveFailed {
                path: path.to_string_lossy().to_string(),
            })
        })?;

    info!("Saved preferences to {:?}", path);
    Ok(())
}

/// Delete the default settings file
pub fn clear_preferences() -> Result<(), OvpnError> {
    clear_preferences_at(get_settings_path()?)
}

/// Delete a settings file; a missing file is not an error
pub fn clear_preferences_at<P: AsRef<Path>>(path: P) -> Result<(), OvpnError> {
    match std::fs::remove_file(&path) {
        Ok(()) => {
            info!("Cleared preferences at {:?}", path.as_ref());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OvpnError::Config(ConfigError::IoError {
            message: format!("Failed to delete settings file: {}", e),
        })),
    }
}
