//! Sentinel-based classifier for OpenVPN output
//!
//! OpenVPN has no structured status channel here, so its state is inferred
//! from fixed substrings in free-form log lines. The vocabulary is an
//! ordered list of (substring, sentinel) rules; the first rule that matches
//! a line wins.

use crate::error::VpnError;
use regex::RegexSet;

/// What a recognised line says about the OpenVPN process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// The tunnel is up
    TunnelEstablished,
    /// The server rejected the credentials
    AuthFailed,
    /// OpenVPN is shutting down
    Terminating,
}

/// Default vocabulary, in match priority order
pub const DEFAULT_RULES: &[(&str, Sentinel)] = &[
    ("Initialization Sequence Completed", Sentinel::TunnelEstablished),
    ("AUTH_SUCCESSFUL", Sentinel::TunnelEstablished),
    ("AUTH_FAILED", Sentinel::AuthFailed),
    ("auth-failure", Sentinel::AuthFailed),
    ("SIGTERM", Sentinel::Terminating),
    ("exiting", Sentinel::Terminating),
    ("Exiting", Sentinel::Terminating),
    ("terminated", Sentinel::Terminating),
];

/// Parser for OpenVPN output
#[derive(Debug, Clone)]
pub struct OutputParser {
    /// One escaped literal per rule, in rule order
    patterns: RegexSet,
    /// Sentinel for each pattern index
    sentinels: Vec<Sentinel>,
}

impl OutputParser {
    /// Create a parser with the default OpenVPN vocabulary
    pub fn new() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(needle, sentinel)| (needle.to_string(), *sentinel));
        Self::with_rules(rules).expect("default sentinel vocabulary is valid")
    }

    /// Create a parser from an ordered list of (substring, sentinel) rules
    ///
    /// Substrings are matched literally and case-sensitively.
    pub fn with_rules<I>(rules: I) -> Result<Self, VpnError>
    where
        I: IntoIterator<Item = (String, Sentinel)>,
    {
        let (needles, sentinels): (Vec<String>, Vec<Sentinel>) = rules.into_iter().unzip();

        if let Some(empty) = needles.iter().find(|needle| needle.is_empty()) {
            return Err(VpnError::InvalidPattern {
                pattern: empty.clone(),
            });
        }

        let patterns = RegexSet::new(needles.iter().map(|needle| regex::escape(needle)))
            .map_err(|e| VpnError::InvalidPattern {
                pattern: e.to_string(),
            })?;

        Ok(Self {
            patterns,
            sentinels,
        })
    }

    /// Classify a single output line
    ///
    /// Returns the sentinel of the first matching rule, or `None` for
    /// ordinary log output.
    pub fn parse_line(&self, line: &str) -> Option<Sentinel> {
        self.patterns
            .matches(line)
            .iter()
            .next()
            .map(|index| self.sentinels[index])
    }

}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}
