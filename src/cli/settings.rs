//! Saved settings commands

use ovpn_core::config::preferences::{clear_preferences, get_settings_path, load_preferences};
use ovpn_core::error::OvpnError;

/// Run the settings show command
pub fn run_settings_show() -> Result<(), OvpnError> {
    let path = get_settings_path()?;
    let preferences = load_preferences()?;

    println!("Settings file: {}", path.display());
    println!("Config file:   {}", or_none(&preferences.config_file_path));
    println!("Username:      {}", or_none(&preferences.username));

    Ok(())
}

/// Run the settings clear command
pub fn run_settings_clear() -> Result<(), OvpnError> {
    clear_preferences()?;
    println!("Saved settings have been cleared");
    Ok(())
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}
