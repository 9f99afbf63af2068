//! Operator-facing sink for raw OpenVPN output

use std::sync::{Arc, Mutex};

/// Append-only destination for every line read from the OpenVPN process
pub trait LogSink: Send + Sync {
    fn append(&self, line: &str);
}

/// Forwards OpenVPN output to tracing under the `openvpn` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append(&self, line: &str) {
        tracing::info!(target: "openvpn", "OpenVPN: {}", line);
    }
}

/// Keeps lines in memory, for callers that render their own log view
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn append(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.append("first");
        sink.append("second");
        assert_eq!(sink.lines(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        clone.append("shared");
        assert_eq!(sink.lines(), vec!["shared".to_string()]);
    }
}
