//! Error types for the ovpn-manager tool
//!
//! This module defines all error types used throughout the application,
//! providing consistent error handling and user-friendly error messages.

use thiserror::Error;

/// Main error type for the ovpn-manager application
#[derive(Error, Debug)]
pub enum OvpnError {
    /// Errors related to preferences or launcher configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors related to the VPN session
    #[error("VPN error: {0}")]
    Vpn(#[from] VpnError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// VPN session errors
///
/// Every failure of a connect attempt collapses into one of these; the
/// `Display` output is the reason shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VpnError {
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Connection timeout after {seconds} seconds")]
    ConnectionTimeout { seconds: u64 },

    #[error("OpenVPN exited before the tunnel was established")]
    UnexpectedExit,

    #[error("Failed to spawn OpenVPN process: {reason}")]
    ProcessSpawnError { reason: String },

    #[error("Credentials file error: {reason}")]
    CredentialsFile { reason: String },

    #[error("Invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    #[error("Invalid connection state transition")]
    InvalidStateTransition,

    #[error("Connection cancelled by disconnect")]
    Cancelled,

    #[error("Invalid sentinel pattern: {pattern}")]
    InvalidPattern { pattern: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, OvpnError>;
