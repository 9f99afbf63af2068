//! Initial handshake scan
//!
//! Reads OpenVPN output until the tunnel comes up, authentication fails,
//! the stream closes or the deadline passes. The deadline wraps every read,
//! so a child that prints nothing still times out.

use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::error::VpnError;
use crate::vpn::log_sink::LogSink;
use crate::vpn::output_parser::{OutputParser, Sentinel};
use crate::vpn::output_stream::OutputStream;

/// Scan `stream` until the handshake resolves
///
/// On success the stream is left positioned just after the line that
/// confirmed the tunnel, ready for the monitor.
pub async fn run_handshake(
    stream: &mut OutputStream,
    parser: &OutputParser,
    sink: &dyn LogSink,
    deadline: Duration,
) -> Result<(), VpnError> {
    let expires_at = Instant::now() + deadline;

    loop {
        let next = timeout_at(expires_at, stream.next_line())
            .await
            .map_err(|_| {
                tracing::error!("Connection timeout");
                VpnError::ConnectionTimeout {
                    seconds: deadline.as_secs(),
                }
            })?;

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::error!("OpenVPN output closed before the tunnel was established");
                return Err(VpnError::UnexpectedExit);
            }
            Err(e) => {
                return Err(VpnError::ConnectionFailed {
                    reason: format!("Failed to read OpenVPN output: {}", e),
                });
            }
        };

        sink.append(&line);

        match parser.parse_line(&line) {
            Some(Sentinel::TunnelEstablished) => {
                tracing::info!("OpenVPN reported the tunnel as established");
                return Ok(());
            }
            Some(Sentinel::AuthFailed) => {
                tracing::error!("Authentication failed");
                return Err(VpnError::AuthenticationFailed);
            }
            // A fatal shutdown closes the stream right after; report it then
            Some(Sentinel::Terminating) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::log_sink::MemorySink;
    use tokio::io::AsyncWriteExt;

    fn stream_of(text: &'static str) -> OutputStream {
        OutputStream::merge(vec![Box::new(text.as_bytes())])
    }

    #[tokio::test]
    async fn test_success_stops_after_sentinel() {
        let mut stream = stream_of(
            "OpenVPN 2.6.8 x86_64-pc-linux-gnu\n\
             Initialization Sequence Completed\n\
             after handshake\n",
        );
        let sink = MemorySink::new();

        let result =
            run_handshake(&mut stream, &OutputParser::new(), &sink, Duration::from_secs(5)).await;

        assert_eq!(result, Ok(()));
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("after handshake"));
    }

    #[tokio::test]
    async fn test_auth_failure_reads_no_further() {
        let mut stream = stream_of(
            "AUTH: Received control message: AUTH_FAILED\n\
             Initialization Sequence Completed\n",
        );
        let sink = MemorySink::new();

        let result =
            run_handshake(&mut stream, &OutputParser::new(), &sink, Duration::from_secs(5)).await;

        assert_eq!(result, Err(VpnError::AuthenticationFailed));
        assert_eq!(sink.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_stream_is_unexpected_exit() {
        let mut stream = stream_of("Options error: --config fails with 'x.ovpn'\nExiting due to fatal error\n");
        let sink = MemorySink::new();

        let result =
            run_handshake(&mut stream, &OutputParser::new(), &sink, Duration::from_secs(5)).await;

        assert_eq!(result, Err(VpnError::UnexpectedExit));
        assert_eq!(sink.lines().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_times_out() {
        // Keep the writer alive so the stream never ends
        let (_writer, reader) = tokio::io::duplex(64);
        let mut stream = OutputStream::merge(vec![Box::new(reader)]);
        let started = Instant::now();

        let result = run_handshake(
            &mut stream,
            &OutputParser::new(),
            &MemorySink::new(),
            Duration::from_secs(30),
        )
        .await;

        assert_eq!(result, Err(VpnError::ConnectionTimeout { seconds: 30 }));
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_chatty_stream_still_times_out() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut stream = OutputStream::merge(vec![Box::new(reader)]);

        tokio::spawn(async move {
            loop {
                if writer.write_all(b"TLS: Initial packet\n").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });

        let result = run_handshake(
            &mut stream,
            &OutputParser::new(),
            &MemorySink::new(),
            Duration::from_secs(10),
        )
        .await;

        assert_eq!(result, Err(VpnError::ConnectionTimeout { seconds: 10 }));
    }
}
