//! Handler implementations, one module per command family.

pub mod client;
pub mod keys;
pub mod menu;
pub mod screen;
pub mod server;
pub mod widget;

use crate::CommandError;

/// Parse a 1-based coordinate or size argument.
pub(crate) fn parse_u16(what: &'static str, token: &str) -> Result<u16, CommandError> {
    token
        .parse::<u16>()
        .map_err(|_| CommandError::Protocol(format!("bad {what} \"{token}\"")))
}

pub(crate) fn parse_i32(what: &'static str, token: &str) -> Result<i32, CommandError> {
    token
        .parse::<i32>()
        .map_err(|_| CommandError::Protocol(format!("bad {what} \"{token}\"")))
}

pub(crate) fn parse_u32(what: &'static str, token: &str) -> Result<u32, CommandError> {
    token
        .parse::<u32>()
        .map_err(|_| CommandError::Protocol(format!("bad {what} \"{token}\"")))
}

/// Iterate `-option value` pairs from an argument tail.
pub(crate) fn option_pairs(
    args: &[String],
) -> Result<Vec<(&str, &str)>, CommandError> {
    let mut pairs = Vec::new();
    let mut it = args.iter();
    while let Some(opt) = it.next() {
        let Some(name) = opt.strip_prefix('-') else {
            return Err(CommandError::Protocol(format!(
                "expected an option, got \"{opt}\""
            )));
        };
        let Some(value) = it.next() else {
            return Err(CommandError::Protocol(format!(
                "option \"-{name}\" needs a value"
            )));
        };
        pairs.push((name, value.as_str()));
    }
    Ok(pairs)
}
