//! Interactive prompts on stdin

use ovpn_core::error::OvpnError;
use std::io::{self, Write};

/// Prompt until a non-empty value is entered
pub fn prompt_required(prompt: &str) -> Result<String, OvpnError> {
    loop {
        let input = prompt_input(&format!("{}: ", prompt))?;
        let value = input.trim();

        if !value.is_empty() {
            return Ok(value.to_string());
        }
        println!("❌ This field is required. Please enter a value.");
    }
}

/// Prompt for a password
///
/// Unlike other fields the value is not trimmed, since leading or trailing
/// spaces may be part of it.
pub fn prompt_password(prompt: &str) -> Result<String, OvpnError> {
    loop {
        let input = prompt_input(&format!("{}: ", prompt))?;

        if !input.is_empty() {
            return Ok(input);
        }
        println!("❌ Password cannot be empty.");
    }
}

/// Low-level input prompting
///
/// Fails on end of input so a closed stdin cannot spin the retry loops.
fn prompt_input(prompt: &str) -> Result<String, OvpnError> {
    print!("{}", prompt);
    io::stdout().flush().map_err(OvpnError::Io)?;

    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).map_err(OvpnError::Io)?;
    if read == 0 {
        return Err(OvpnError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stdin closed while waiting for input",
        )));
    }

    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
