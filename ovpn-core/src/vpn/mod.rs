//! VPN connection module
//!
//! Handles the OpenVPN process lifecycle: launch, handshake scan,
//! background monitoring and teardown.

pub mod credentials;
pub mod handshake;
pub mod launcher;
pub mod log_sink;
pub mod monitor;
pub mod output_parser;
pub mod output_stream;
pub mod process;
pub mod session;
pub mod state;

// Public re-exports
pub use credentials::CredentialsFile;
pub use log_sink::{LogSink, MemorySink, TracingSink};
pub use monitor::DisconnectReason;
pub use output_parser::{OutputParser, Sentinel};
pub use session::SessionController;
pub use state::{ConnectionState, StatusWatcher};
