//! Unit tests for credential types

use ovpn_core::error::VpnError;
use ovpn_core::types::Credentials;

#[test]
fn test_credentials_keep_values_verbatim() {
    let creds = Credentials::new("alice@example.com", " pass word ").unwrap();

    assert_eq!(creds.username(), "alice@example.com");
    assert_eq!(creds.expose_password(), " pass word ");
}

#[test]
fn test_credentials_validation_errors() {
    assert!(matches!(
        Credentials::new("", "secret"),
        Err(VpnError::InvalidCredentials { .. })
    ));
    assert!(matches!(
        Credentials::new("alice", ""),
        Err(VpnError::InvalidCredentials { .. })
    ));
    assert!(matches!(
        Credentials::new("alice\nbob", "secret"),
        Err(VpnError::InvalidCredentials { .. })
    ));
    assert!(matches!(
        Credentials::new("alice", "sec\rret"),
        Err(VpnError::InvalidCredentials { .. })
    ));
}

#[test]
fn test_credentials_debug_hides_password() {
    let creds = Credentials::new("alice", "hunter2").unwrap();
    let debug = format!("{:?}", creds);

    assert!(debug.contains("alice"));
    assert!(!debug.contains("hunter2"));
}
