//! Client command handling: keyword table, dispatcher, and the handlers
//! for every protocol command.
//!
//! Handlers return `Result<Reply, CommandError>`; the dispatcher turns
//! `Err` into a `huh? <reason>` line, so a handler never writes an error
//! to the socket itself. Unsolicited traffic (key events, menuevents,
//! listen/ignore) goes through `ServerState::send_to` instead.

pub mod dispatcher;
mod handlers;
pub mod table;

pub use dispatcher::dispatch_line;

use core_menu::{item::OptionError, MenuError};
use core_model::ModelError;

/// What a successful handler wants sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The plain `success` line.
    Success,
    /// A complete, newline-terminated response line.
    Line(String),
    /// Nothing (e.g. `bye`).
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command \"{0}\"")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    /// Malformed argument or bad option value.
    #[error("{0}")]
    Protocol(String),
    /// Unknown screen/widget/menu-item id.
    #[error("{0}")]
    NotFound(String),
    /// Duplicate id or reservation clash.
    #[error("{0}")]
    Conflict(String),
}

pub type CmdResult = Result<Reply, CommandError>;

impl From<ModelError> for CommandError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::DuplicateScreen(_) | ModelError::DuplicateWidget(_) => {
                Self::Conflict(e.to_string())
            }
            _ => Self::NotFound(e.to_string()),
        }
    }
}

impl From<MenuError> for CommandError {
    fn from(e: MenuError) -> Self {
        match e {
            MenuError::DuplicateItem(_) => Self::Conflict(e.to_string()),
            MenuError::UnknownItem(_) => Self::NotFound(e.to_string()),
            MenuError::Option(inner) => Self::Protocol(inner.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<OptionError> for CommandError {
    fn from(e: OptionError) -> Self {
        Self::Protocol(e.to_string())
    }
}
