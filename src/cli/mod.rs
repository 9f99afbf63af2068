//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod prompt;
pub mod settings;
pub mod status;
pub mod vpn;
