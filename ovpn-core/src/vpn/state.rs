//! VPN connection state management
//!
//! The controller publishes its state on a `tokio::sync::watch` channel.
//! Any thread can read the latest value; front-ends await changes through
//! a [`StatusWatcher`].

use tokio::sync::watch;

/// VPN connection states
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session
    #[default]
    Disconnected,

    /// OpenVPN spawned, waiting for the handshake
    Connecting,

    /// Tunnel established
    Connected,

    /// Connect attempt failed; published just before returning to Disconnected
    Failed(String),

    /// Tearing the session down
    Disconnecting,
}

impl ConnectionState {
    /// Short human label, as shown in a status line
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Failed(_) => "Connection Failed",
            ConnectionState::Disconnecting => "Disconnecting...",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Read side of the controller's state channel
#[derive(Debug, Clone)]
pub struct StatusWatcher {
    receiver: watch::Receiver<ConnectionState>,
}

impl StatusWatcher {
    pub(crate) fn new(receiver: watch::Receiver<ConnectionState>) -> Self {
        Self { receiver }
    }

    /// Latest published state
    pub fn current(&self) -> ConnectionState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next state change
    ///
    /// Returns `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until the session is no longer connected
    ///
    /// Returns immediately if it already is not.
    pub async fn wait_until_down(&mut self) -> ConnectionState {
        loop {
            let state = self.receiver.borrow_and_update().clone();
            if state != ConnectionState::Connected && state != ConnectionState::Connecting {
                return state;
            }
            if self.receiver.changed().await.is_err() {
                return ConnectionState::Disconnected;
            }
        }
    }
}
