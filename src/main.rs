//! ovpn-manager - OpenVPN connection manager
//!
//! Launches openvpn with a config file and username/password credentials,
//! reports the connection status and tears everything down on exit.

use clap::{Parser, Subcommand};
use ovpn_core::error::OvpnError;
use ovpn_core::init_logging;

mod cli;

#[derive(Parser)]
#[command(name = "ovpn-manager")]
#[command(about = "Launch and supervise OpenVPN connections")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the VPN and stay in the foreground until Ctrl+C
    Connect(cli::vpn::ConnectArgs),
    /// Manage the remembered config file and username
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the remembered config file and username
    Show,
    /// Delete the saved settings
    Clear,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = match cli.command {
        Commands::Connect(args) => cli::vpn::run_connect(args).await,
        Commands::Settings { action } => match action {
            SettingsCommands::Show => cli::settings::run_settings_show(),
            SettingsCommands::Clear => cli::settings::run_settings_clear(),
        },
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                OvpnError::Config(_) | OvpnError::Toml(_) | OvpnError::TomlSerialize(_) => 2,
                // VPN and I/O errors (exit code 1 - runtime)
                OvpnError::Vpn(_) | OvpnError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
