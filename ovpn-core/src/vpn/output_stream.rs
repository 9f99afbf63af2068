//! Merged line stream over the OpenVPN process output
//!
//! stdout and stderr are pumped by one task each into a single channel, so
//! the handshake and the monitor share one sequential read cursor. The
//! stream value itself is moved from one phase to the next.

use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::error::VpnError;

/// Ordered lines from every output pipe of a process
#[derive(Debug)]
pub struct OutputStream {
    lines: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl OutputStream {
    /// Take stdout and stderr from a freshly spawned child
    pub fn from_child(child: &mut Child) -> Result<Self, VpnError> {
        let stdout = child.stdout.take().ok_or_else(|| VpnError::ProcessSpawnError {
            reason: "Failed to capture stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| VpnError::ProcessSpawnError {
            reason: "Failed to capture stderr".to_string(),
        })?;

        Ok(Self::merge(vec![Box::new(stdout), Box::new(stderr)]))
    }

    /// Merge any number of readers into one line stream
    ///
    /// The stream ends once every reader has reached EOF or failed.
    pub fn merge(readers: Vec<Box<dyn AsyncRead + Send + Unpin>>) -> Self {
        let (sender, lines) = mpsc::unbounded_channel();

        for reader in readers {
            tokio::spawn(forward_lines(reader, sender.clone()));
        }

        Self { lines }
    }

    /// Read the next line
    ///
    /// Blocks until a line arrives; `Ok(None)` once all pipes are closed.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.lines.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// Pump one pipe into the shared channel until EOF or a read error
async fn forward_lines(
    reader: Box<dyn AsyncRead + Send + Unpin>,
    sender: mpsc::UnboundedSender<io::Result<String>>,
) {
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if sender.send(Ok(line)).is_err() {
                    // Reader side is gone, nobody cares about the rest
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = sender.send(Err(e));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_reader_preserves_order() {
        let mut stream = OutputStream::merge(vec![Box::new(&b"one\ntwo\nthree"[..])]);

        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("one"));
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("two"));
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("three"));
        assert_eq!(stream.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_merged_readers_deliver_every_line() {
        let mut stream = OutputStream::merge(vec![
            Box::new(&b"out 1\nout 2\n"[..]),
            Box::new(&b"err 1\n"[..]),
        ]);

        let mut seen = Vec::new();
        while let Some(line) = stream.next_line().await.unwrap() {
            seen.push(line);
        }
        seen.sort();

        assert_eq!(seen, vec!["err 1", "out 1", "out 2"]);
    }

    #[tokio::test]
    async fn test_empty_stream_ends_immediately() {
        let mut stream = OutputStream::merge(Vec::new());
        assert_eq!(stream.next_line().await.unwrap(), None);
    }
}
