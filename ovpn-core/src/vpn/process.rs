//! OpenVPN process termination and liveness checks
//!
//! Termination is SIGTERM first, a bounded wait, then SIGKILL. When an
//! elevation prefix such as sudo is in front of OpenVPN, sudo relays the
//! SIGTERM to its child; SIGKILL only reaches the wrapper.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::timeout;

/// Error types for process operations
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to terminate process: {0}")]
    TerminationFailed(String),

    #[error("Process did not respond to signals")]
    UnresponsiveProcess,
}

/// How a child ended up stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// It had already exited before any signal was sent
    AlreadyExited,
    /// It exited within the grace period after SIGTERM
    Graceful,
    /// It had to be sent SIGKILL
    Killed,
}

/// Check whether a process with this PID exists
pub fn is_process_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Check whether a child has not yet exited
///
/// Reaps the child if it has exited.
pub fn is_child_running(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

/// Terminate a child process gracefully
///
/// Sends SIGTERM, waits up to `grace` for the child to exit, then sends
/// SIGKILL. The child is reaped before this returns successfully.
pub async fn terminate_child(
    child: &mut Child,
    grace: Duration,
) -> Result<Termination, ProcessError> {
    if !is_child_running(child) {
        return Ok(Termination::AlreadyExited);
    }

    let Some(pid) = child.id() else {
        return Ok(Termination::AlreadyExited);
    };

    tracing::info!("Sending SIGTERM to OpenVPN process {}", pid);
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!("Failed to send SIGTERM to {}: {}", pid, e);
    }

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!("OpenVPN process {} terminated gracefully ({})", pid, status);
            return Ok(Termination::Graceful);
        }
        Ok(Err(e)) => {
            return Err(ProcessError::TerminationFailed(format!(
                "Failed to wait for process {}: {}",
                pid, e
            )))
        }
        Err(_) => {
            tracing::warn!("Graceful shutdown of {} timed out, sending SIGKILL", pid);
        }
    }

    child
        .kill()
        .await
        .map_err(|e| ProcessError::TerminationFailed(format!("Failed to send SIGKILL: {}", e)))?;

    if is_child_running(child) {
        Err(ProcessError::UnresponsiveProcess)
    } else {
        Ok(Termination::Killed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn_sleep(script: &str) -> Child {
        Command::new("/bin/sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("Failed to spawn mock process")
    }

    #[test]
    fn test_is_process_alive_with_nonexistent_pid() {
        assert!(!is_process_alive(99999999));
    }

    #[test]
    fn test_is_process_alive_with_own_pid() {
        assert!(is_process_alive(std::process::id()));
    }

    #[tokio::test]
    async fn test_terminate_responsive_child() {
        let mut child = spawn_sleep("exec sleep 30");
        let pid = child.id().unwrap();

        let outcome = terminate_child(&mut child, Duration::from_secs(5)).await.unwrap();

        assert_eq!(outcome, Termination::Graceful);
        assert!(!is_child_running(&mut child));
        assert!(!is_process_alive(pid));
    }

    #[tokio::test]
    async fn test_terminate_escalates_to_sigkill() {
        let mut child = spawn_sleep("trap '' TERM; exec sleep 30");
        // Let the shell install the trap before signalling it
        tokio::time::sleep(Duration::from_millis(200)).await;
        let started = std::time::Instant::now();

        let outcome = terminate_child(&mut child, Duration::from_millis(500)).await.unwrap();

        assert_eq!(outcome, Termination::Killed);
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(!is_child_running(&mut child));
    }

    #[tokio::test]
    async fn test_terminate_exited_child() {
        let mut child = spawn_sleep("exit 0");
        child.wait().await.unwrap();

        let outcome = terminate_child(&mut child, Duration::from_secs(1)).await.unwrap();
        assert_eq!(outcome, Termination::AlreadyExited);
    }
}
