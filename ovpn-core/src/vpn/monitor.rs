//! Background monitor for an established tunnel
//!
//! Continues reading the handshake's output stream on its own task until
//! OpenVPN shuts down, then reports why. Read errors count as a disconnect;
//! nothing escapes the task.

use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::vpn::log_sink::LogSink;
use crate::vpn::output_parser::{OutputParser, Sentinel};
use crate::vpn::output_stream::OutputStream;

/// Why the monitor considers the tunnel down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// OpenVPN closed its output, normally because it exited
    ProcessExited,

    /// OpenVPN announced its shutdown
    Terminated { line: String },

    /// Reading OpenVPN output failed
    ReadError { reason: String },
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::ProcessExited => write!(f, "OpenVPN process exited"),
            DisconnectReason::Terminated { line } => write!(f, "OpenVPN shutting down: {}", line),
            DisconnectReason::ReadError { reason } => {
                write!(f, "error monitoring connection: {}", reason)
            }
        }
    }
}

/// Read `stream` until a shutdown sentinel, EOF or a read error
pub async fn watch_output(
    mut stream: OutputStream,
    parser: &OutputParser,
    sink: &dyn LogSink,
) -> DisconnectReason {
    loop {
        match stream.next_line().await {
            Ok(Some(line)) => {
                sink.append(&line);
                if parser.parse_line(&line) == Some(Sentinel::Terminating) {
                    return DisconnectReason::Terminated { line };
                }
            }
            Ok(None) => return DisconnectReason::ProcessExited,
            Err(e) => {
                return DisconnectReason::ReadError {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Run [`watch_output`] on its own task and hand the result to `on_down`
pub fn spawn_monitor<F, Fut>(
    stream: OutputStream,
    parser: Arc<OutputParser>,
    sink: Arc<dyn LogSink>,
    on_down: F,
) -> JoinHandle<()>
where
    F: FnOnce(DisconnectReason) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let reason = watch_output(stream, &parser, sink.as_ref()).await;
        match &reason {
            DisconnectReason::ReadError { .. } => tracing::error!("{}", reason),
            _ => tracing::info!("Connection monitor stopped: {}", reason),
        }
        on_down(reason).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::log_sink::MemorySink;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    /// Reader that fails on first use
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke")))
        }
    }

    #[tokio::test]
    async fn test_terminated_sentinel() {
        let stream = OutputStream::merge(vec![Box::new(
            &b"Data Channel: cipher AES-256-GCM\nSIGTERM[hard,] received, process exiting\nnever read\n"[..],
        )]);
        let sink = MemorySink::new();

        let reason = watch_output(stream, &OutputParser::new(), &sink).await;

        assert_eq!(
            reason,
            DisconnectReason::Terminated {
                line: "SIGTERM[hard,] received, process exiting".to_string()
            }
        );
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_eof_means_process_exited() {
        let stream = OutputStream::merge(vec![Box::new(&b"keepalive\n"[..])]);

        let reason = watch_output(stream, &OutputParser::new(), &MemorySink::new()).await;

        assert_eq!(reason, DisconnectReason::ProcessExited);
    }

    #[tokio::test]
    async fn test_read_error_is_a_disconnect() {
        let stream = OutputStream::merge(vec![Box::new(BrokenPipe)]);

        let reason = watch_output(stream, &OutputParser::new(), &MemorySink::new()).await;

        assert!(matches!(reason, DisconnectReason::ReadError { .. }));
    }

    #[tokio::test]
    async fn test_spawned_monitor_reports_once() {
        let stream = OutputStream::merge(vec![Box::new(&b"Exiting due to fatal error\n"[..])]);
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = spawn_monitor(
            stream,
            Arc::new(OutputParser::new()),
            Arc::new(MemorySink::new()),
            move |reason| async move {
                let _ = tx.send(reason);
            },
        );

        handle.await.unwrap();
        assert!(matches!(rx.await.unwrap(), DisconnectReason::Terminated { .. }));
    }
}
