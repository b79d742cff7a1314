//! Wire protocol building blocks: command-line tokenizer and the response
//! grammar.
//!
//! The protocol is newline-delimited text over TCP. One inbound line is one
//! command; the first token is the keyword, the rest are arguments. All
//! outbound traffic is produced by the formatting helpers in [`response`] so
//! every reply ends in exactly one `\n`.

pub mod response;
pub mod tokens;

pub use tokens::{quote, tokenize, ParseError, MAX_ARGS};

/// Protocol revision advertised in the `hello` greeting.
pub const PROTOCOL_VERSION: &str = "0.3";

/// Server software version advertised in the `hello` greeting.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
