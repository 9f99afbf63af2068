//! Transient credentials file for `--auth-user-pass`
//!
//! The file holds the plaintext username and password, so it is created
//! owner-only and removed on every disconnect path. Dropping the guard
//! deletes the file.

use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::VpnError;
use crate::types::Credentials;

const FILE_PREFIX: &str = "openvpn_auth_";
const FILE_SUFFIX: &str = ".txt";

/// Guard over a credentials file on disk
#[derive(Debug)]
pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    /// Write credentials to a new file in the system temp directory
    pub fn write(credentials: &Credentials) -> Result<Self, VpnError> {
        Self::write_in(std::env::temp_dir(), credentials)
    }

    /// Write credentials to a new uniquely named file in `dir`
    ///
    /// The file contains the username, a newline and the password, nothing
    /// else, and is readable and writable by the owner only.
    pub fn write_in<P: AsRef<Path>>(dir: P, credentials: &Credentials) -> Result<Self, VpnError> {
        let (mut file, path) = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(dir)
            .and_then(|named| named.keep().map_err(|e| e.error))
            .map_err(|e| VpnError::CredentialsFile {
                reason: format!("Failed to create credentials file: {}", e),
            })?;

        // From here on the guard owns the path, so any error below removes it
        let guard = Self { path };

        fs::set_permissions(&guard.path, Permissions::from_mode(0o600)).map_err(|e| {
            VpnError::CredentialsFile {
                reason: format!("Failed to restrict credentials file permissions: {}", e),
            }
        })?;

        write!(file, "{}\n{}", credentials.username(), credentials.expose_password())
            .and_then(|_| file.sync_all())
            .map_err(|e| VpnError::CredentialsFile {
                reason: format!("Failed to write credentials file: {}", e),
            })?;

        tracing::debug!("Wrote credentials file {:?}", guard.path);
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file; calling this more than once is harmless
    pub fn delete(&self) {
        if let Err(e) = delete_credentials_file(&self.path) {
            tracing::error!("Error deleting credentials file {:?}: {}", self.path, e);
        }
    }
}

impl Drop for CredentialsFile {
    fn drop(&mut self) {
        self.delete();
    }
}

/// Remove a credentials file if it exists
///
/// Succeeds when the file is already gone or never existed.
pub fn delete_credentials_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Deleted credentials file {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn alice() -> Credentials {
        Credentials::new("alice", "secret").unwrap()
    }

    #[test]
    fn test_file_contents_are_two_lines() {
        let dir = tempdir().unwrap();
        let file = CredentialsFile::write_in(dir.path(), &alice()).unwrap();

        let contents = fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "alice\nsecret");
    }

    #[test]
    fn test_file_is_owner_only() {
        let dir = tempdir().unwrap();
        let file = CredentialsFile::write_in(dir.path(), &alice()).unwrap();

        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_names_are_unique() {
        let dir = tempdir().unwrap();
        let first = CredentialsFile::write_in(dir.path(), &alice()).unwrap();
        let second = CredentialsFile::write_in(dir.path(), &alice()).unwrap();

        assert_ne!(first.path(), second.path());
        let name = first.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("openvpn_auth_"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = CredentialsFile::write_in(dir.path(), &alice()).unwrap();
        let path = file.path().to_path_buf();

        file.delete();
        assert!(!path.exists());
        file.delete();
        assert!(delete_credentials_file(&path).is_ok());
    }

    #[test]
    fn test_drop_deletes_file() {
        let dir = tempdir().unwrap();
        let path = {
            let file = CredentialsFile::write_in(dir.path(), &alice()).unwrap();
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_never_created_path() {
        let dir = tempdir().unwrap();
        assert!(delete_credentials_file(&dir.path().join("missing.txt")).is_ok());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let result = CredentialsFile::write_in(dir.path().join("nope"), &alice());
        assert!(matches!(result, Err(VpnError::CredentialsFile { .. })));
    }
}
