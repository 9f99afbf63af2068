//! OpenVPN process launcher
//!
//! Builds the OpenVPN invocation and spawns it. The command line is
//! `[elevation?] openvpn --config <config> --auth-user-pass <file> --auth-nocache`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::config::{LauncherConfig, CHILD_PATH};
use crate::error::VpnError;

/// Spawns OpenVPN according to a [`LauncherConfig`]
#[derive(Debug, Clone)]
pub struct Launcher {
    config: LauncherConfig,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Full argument vector, program first
    pub fn command_line(&self, config_path: &Path, credentials_path: &Path) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(7);

        if let Some(elevation) = &self.config.elevation {
            argv.push(elevation.clone().into_os_string());
        }

        argv.push(self.config.openvpn_binary.clone().into_os_string());
        argv.push("--config".into());
        argv.push(config_path.as_os_str().to_owned());
        argv.push("--auth-user-pass".into());
        argv.push(credentials_path.as_os_str().to_owned());
        argv.push("--auth-nocache".into());

        argv
    }

    /// Spawn OpenVPN with stdout and stderr piped
    ///
    /// The child is killed if its handle is dropped.
    pub fn spawn(&self, config_path: &Path, credentials_path: &Path) -> Result<Child, VpnError> {
        let argv = self.command_line(config_path, credentials_path);
        let (program, args) = argv.split_first().ok_or_else(|| VpnError::ProcessSpawnError {
            reason: "Empty command line".to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("PATH", CHILD_PATH)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| VpnError::ProcessSpawnError {
            reason: format!("Failed to spawn {}: {}", program.to_string_lossy(), e),
        })?;

        tracing::debug!("OpenVPN process spawned with PID: {:?}", child.id());
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_command_line_with_elevation() {
        let launcher = Launcher::new(LauncherConfig::default());
        let argv = launcher.command_line(Path::new("/tmp/x.ovpn"), Path::new("/tmp/auth.txt"));

        let expected: Vec<OsString> = [
            "/usr/bin/sudo",
            "/usr/sbin/openvpn",
            "--config",
            "/tmp/x.ovpn",
            "--auth-user-pass",
            "/tmp/auth.txt",
            "--auth-nocache",
        ]
        .iter()
        .map(OsString::from)
        .collect();

        assert_eq!(argv, expected);
    }

    #[test]
    fn test_command_line_without_elevation() {
        let launcher = Launcher::new(LauncherConfig {
            elevation: None,
            openvpn_binary: PathBuf::from("/opt/openvpn/sbin/openvpn"),
            ..LauncherConfig::default()
        });
        let argv = launcher.command_line(Path::new("a.ovpn"), Path::new("b.txt"));

        assert_eq!(argv[0], OsString::from("/opt/openvpn/sbin/openvpn"));
        assert_eq!(argv.len(), 6);
        assert_eq!(argv.last(), Some(&OsString::from("--auth-nocache")));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let launcher = Launcher::new(LauncherConfig {
            elevation: None,
            ..LauncherConfig::new("/nonexistent/openvpn")
        });
        let result = launcher.spawn(Path::new("a.ovpn"), Path::new("b.txt"));

        assert!(matches!(result, Err(VpnError::ProcessSpawnError { .. })));
    }

    #[tokio::test]
    async fn test_spawn_sets_deterministic_path() {
        use tokio::io::AsyncReadExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("print-path.sh");
        std::fs::write(&script, "echo \"$PATH\"\n").unwrap();

        let launcher = Launcher::new(LauncherConfig {
            elevation: Some(PathBuf::from("/bin/sh")),
            ..LauncherConfig::new(&script)
        });
        let mut child = launcher.spawn(Path::new("a.ovpn"), Path::new("b.txt")).unwrap();

        let mut output = String::new();
        child.stdout.take().unwrap().read_to_string(&mut output).await.unwrap();
        child.wait().await.unwrap();

        assert_eq!(output.trim(), CHILD_PATH);
    }
}
