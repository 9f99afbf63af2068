//! Type definitions and wrappers for secure data handling
//!
//! The password is wrapped with the secrecy crate so it never shows up in
//! logs or debug output.

use crate::error::VpnError;
use secrecy::{ExposeSecret, Secret};

/// Username and password handed to OpenVPN through the credentials file
///
/// Held only long enough to be written to disk; the password is zeroized
/// when the value is dropped.
#[derive(Clone, Debug)]
pub struct Credentials {
    username: String,
    password: Secret<String>,
}

impl Credentials {
    /// Create credentials, rejecting empty values and embedded newlines
    ///
    /// OpenVPN reads the username from line one and the password from line
    /// two, so neither may contain a line break.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, VpnError> {
        let username = username.into();
        let password = Secret::new(password.into());

        if username.is_empty() {
            return Err(VpnError::InvalidCredentials {
                reason: "username cannot be empty".to_string(),
            });
        }
        if password.expose_secret().is_empty() {
            return Err(VpnError::InvalidCredentials {
                reason: "password cannot be empty".to_string(),
            });
        }
        if username.contains(['\n', '\r']) || password.expose_secret().contains(['\n', '\r']) {
            return Err(VpnError::InvalidCredentials {
                reason: "credentials cannot contain line breaks".to_string(),
            });
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Expose the password value (use with caution!)
    ///
    /// Only the credentials file writer should need this.
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}
