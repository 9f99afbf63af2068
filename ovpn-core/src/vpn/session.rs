//! Session controller for the OpenVPN process
//!
//! Owns at most one session (child process + credentials file) and drives
//! it through Disconnected -> Connecting -> Connected | Failed, and back to
//! Disconnected on disconnect or when the monitor sees OpenVPN go away.
//!
//! Every exit path funnels through `begin_close` and then `close`, so the
//! child is terminated and the credentials file deleted exactly once. The
//! teardown itself runs on its own task, so dropping a `connect` or
//! `disconnect` future midway never strands a half-closed session.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::process::Child;
use tokio::sync::watch;

use crate::config::LauncherConfig;
use crate::error::{ConfigError, OvpnError, VpnError};
use crate::types::Credentials;
use crate::vpn::credentials::CredentialsFile;
use crate::vpn::handshake::run_handshake;
use crate::vpn::launcher::Launcher;
use crate::vpn::log_sink::{LogSink, TracingSink};
use crate::vpn::monitor::{spawn_monitor, DisconnectReason};
use crate::vpn::output_parser::OutputParser;
use crate::vpn::output_stream::OutputStream;
use crate::vpn::process::{is_child_running, terminate_child, Termination};
use crate::vpn::state::{ConnectionState, StatusWatcher};

/// The single live connection
struct Session {
    id: u64,
    child: Option<Child>,
    credentials: Option<CredentialsFile>,
    /// Set once some path has started tearing this session down
    closing: bool,
}

/// Resources handed from a session to whoever tears it down
struct Teardown {
    id: u64,
    child: Option<Child>,
    credentials: Option<CredentialsFile>,
}

struct Inner {
    launcher: Launcher,
    parser: Arc<OutputParser>,
    sink: Arc<dyn LogSink>,
    session: Mutex<Option<Session>>,
    state: watch::Sender<ConnectionState>,
    next_id: AtomicU64,
}

/// Handle to the OpenVPN session controller
///
/// Cheap to clone; all clones drive the same session, so a disconnect can
/// be issued while a connect is still waiting for the handshake.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a controller that logs OpenVPN output through tracing
    pub fn new(config: LauncherConfig) -> Result<Self, OvpnError> {
        Self::with_parts(config, OutputParser::new(), Arc::new(TracingSink))
    }

    /// Create a controller with a custom output sink
    pub fn with_sink(config: LauncherConfig, sink: Arc<dyn LogSink>) -> Result<Self, OvpnError> {
        Self::with_parts(config, OutputParser::new(), sink)
    }

    /// Create a controller with a custom sentinel vocabulary and sink
    pub fn with_parts(
        config: LauncherConfig,
        parser: OutputParser,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, OvpnError> {
        config
            .validate()
            .map_err(|message| OvpnError::Config(ConfigError::ValidationError { message }))?;

        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(Inner {
                launcher: Launcher::new(config),
                parser: Arc::new(parser),
                sink,
                session: Mutex::new(None),
                state,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes from another task or thread
    pub fn subscribe(&self) -> StatusWatcher {
        StatusWatcher::new(self.inner.state.subscribe())
    }

    /// True only if the state is Connected and the OpenVPN process is still running
    ///
    /// The state is updated asynchronously by the monitor, so the process is
    /// checked as well.
    pub fn is_connected(&self) -> bool {
        if self.state() != ConnectionState::Connected {
            return false;
        }

        let mut slot = self.inner.lock_session();
        match slot.as_mut().and_then(|session| session.child.as_mut()) {
            Some(child) => is_child_running(child),
            None => false,
        }
    }

    /// PID of the tracked OpenVPN process (or its elevation wrapper)
    pub fn pid(&self) -> Option<u32> {
        self.inner
            .lock_session()
            .as_ref()
            .and_then(|session| session.child.as_ref())
            .and_then(|child| child.id())
    }

    /// Path of the current credentials file, while it exists
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.inner
            .lock_session()
            .as_ref()
            .and_then(|session| session.credentials.as_ref())
            .map(|file| file.path().to_path_buf())
    }

    /// Connect to the VPN
    ///
    /// Writes the credentials file, spawns OpenVPN and waits for the
    /// handshake. On failure the process is terminated and the credentials
    /// file removed before this returns.
    pub async fn connect(&self, config_path: &Path, credentials: Credentials) -> Result<(), VpnError> {
        let (id, mut stream) = self.inner.launch(config_path, credentials)?;

        let deadline = self.inner.launcher.config().handshake_timeout;
        let handshake =
            run_handshake(&mut stream, &self.inner.parser, self.inner.sink.as_ref(), deadline).await;

        match handshake {
            Ok(()) => self.establish(id, stream),
            Err(error) => {
                let Some(teardown) = self.inner.begin_close(Some(id)) else {
                    // A disconnect got there first and owns the cleanup
                    return Err(VpnError::Cancelled);
                };
                tracing::error!("Connection failed: {}", error);
                Arc::clone(&self.inner).close(teardown, Some(error.clone())).await;
                Err(error)
            }
        }
    }

    /// Disconnect from the VPN
    ///
    /// Safe to call in any state; a no-op without a session. Errors while
    /// stopping OpenVPN are logged, never returned.
    pub async fn disconnect(&self) {
        match self.inner.begin_close(None) {
            Some(teardown) => {
                tracing::info!("Disconnecting OpenVPN session {}", teardown.id);
                Arc::clone(&self.inner).close(teardown, None).await;
                tracing::info!("Disconnected from OpenVPN");
            }
            None => {
                // Another path may be mid-teardown; wait for it to finish
                let mut watcher = self.subscribe();
                while self.inner.is_closing() {
                    if watcher.changed().await.is_none() {
                        break;
                    }
                }
                tracing::debug!("Disconnect requested with no session left to close");
            }
        }
    }

    /// Promote a session whose handshake succeeded and start its monitor
    fn establish(&self, id: u64, stream: OutputStream) -> Result<(), VpnError> {
        {
            let slot = self.inner.lock_session();
            match slot.as_ref() {
                Some(session) if session.id == id && !session.closing => {
                    self.inner.state.send_replace(ConnectionState::Connected);
                }
                _ => return Err(VpnError::Cancelled),
            }
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        spawn_monitor(
            stream,
            Arc::clone(&self.inner.parser),
            Arc::clone(&self.inner.sink),
            move |reason| async move {
                if let Some(inner) = weak.upgrade() {
                    inner.connection_lost(id, reason).await;
                }
            },
        );

        tracing::info!("Connected to OpenVPN");
        Ok(())
    }
}

impl Inner {
    fn lock_session(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session: credentials file, then the OpenVPN process
    fn launch(
        &self,
        config_path: &Path,
        credentials: Credentials,
    ) -> Result<(u64, OutputStream), VpnError> {
        let mut slot = self.lock_session();
        if slot.is_some() {
            return Err(VpnError::InvalidStateTransition);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.send_replace(ConnectionState::Connecting);
        tracing::info!("Connecting with config {:?}", config_path);

        let started = self.start_process(config_path, &credentials);
        drop(credentials);

        match started {
            Ok((child, credentials_file, stream)) => {
                *slot = Some(Session {
                    id,
                    child: Some(child),
                    credentials: Some(credentials_file),
                    closing: false,
                });
                Ok((id, stream))
            }
            Err(error) => {
                tracing::error!("Connection failed: {}", error);
                self.publish_failure(&error);
                Err(error)
            }
        }
    }

    /// Any error here drops the credentials guard, which deletes the file
    fn start_process(
        &self,
        config_path: &Path,
        credentials: &Credentials,
    ) -> Result<(Child, CredentialsFile, OutputStream), VpnError> {
        let credentials_file = match &self.launcher.config().credentials_dir {
            Some(dir) => CredentialsFile::write_in(dir, credentials)?,
            None => CredentialsFile::write(credentials)?,
        };

        let mut child = self.launcher.spawn(config_path, credentials_file.path())?;
        let stream = OutputStream::from_child(&mut child)?;

        tracing::info!("Spawned OpenVPN with PID {:?}", child.id());
        Ok((child, credentials_file, stream))
    }

    /// Claim the session for teardown
    ///
    /// Returns `None` if there is no session, `id` names a different one, or
    /// another path is already closing it.
    fn begin_close(&self, id: Option<u64>) -> Option<Teardown> {
        let mut slot = self.lock_session();
        let session = slot.as_mut()?;

        if session.closing || id.is_some_and(|id| id != session.id) {
            return None;
        }

        session.closing = true;
        self.state.send_replace(ConnectionState::Disconnecting);

        Some(Teardown {
            id: session.id,
            child: session.child.take(),
            credentials: session.credentials.take(),
        })
    }

    /// Whether a claimed session is still being torn down
    fn is_closing(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|session| session.closing)
    }

    /// Finish a teardown claimed with `begin_close`
    ///
    /// Runs on a spawned task that outlives the caller's future, so the
    /// slot is always cleared and the final state always published.
    async fn close(self: Arc<Self>, teardown: Teardown, failure: Option<VpnError>) {
        let task = tokio::spawn(async move {
            self.release(teardown.child, teardown.credentials).await;
            self.end_close(teardown.id, failure.as_ref());
        });

        if let Err(e) = task.await {
            tracing::error!("OpenVPN teardown task failed: {}", e);
        }
    }

    /// Stop the process and delete the credentials file
    async fn release(&self, child: Option<Child>, credentials: Option<CredentialsFile>) {
        if let Some(mut child) = child {
            let grace = self.launcher.config().termination_grace;
            match terminate_child(&mut child, grace).await {
                Ok(Termination::Killed) if self.launcher.config().elevation.is_some() => {
                    tracing::warn!(
                        "OpenVPN ignored SIGTERM; SIGKILL only reached the elevation wrapper, \
                         openvpn itself may still be running"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Error stopping OpenVPN: {}", e),
            }
        }

        if let Some(credentials) = credentials {
            credentials.delete();
        }
    }

    /// Forget the session and publish the final state
    fn end_close(&self, id: u64, failure: Option<&VpnError>) {
        let mut slot = self.lock_session();
        if slot.as_ref().is_some_and(|session| session.id == id) {
            *slot = None;
        }

        match failure {
            Some(error) => self.publish_failure(error),
            None => {
                self.state.send_replace(ConnectionState::Disconnected);
            }
        }
    }

    fn publish_failure(&self, error: &VpnError) {
        self.state.send_replace(ConnectionState::Failed(error.to_string()));
        self.state.send_replace(ConnectionState::Disconnected);
    }

    /// Called by the monitor once OpenVPN is gone
    async fn connection_lost(self: Arc<Self>, id: u64, reason: DisconnectReason) {
        let Some(teardown) = self.begin_close(Some(id)) else {
            return;
        };

        tracing::warn!("VPN connection lost: {}", reason);
        self.close(teardown, None).await;
    }
}
