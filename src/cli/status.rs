//! Connection status line

use colored::Colorize;
use ovpn_core::vpn::ConnectionState;

/// Print the status line, colored by state
pub fn print_status(state: &ConnectionState) {
    let label = state.label();
    let colored = match state {
        ConnectionState::Connected => label.green().bold(),
        ConnectionState::Connecting | ConnectionState::Disconnecting => label.yellow().bold(),
        ConnectionState::Failed(_) => label.red().bold(),
        ConnectionState::Disconnected => label.dimmed(),
    };

    println!("Connection Status: {}", colored);

    if let ConnectionState::Failed(reason) = state {
        println!("  {}", reason);
    }
}
