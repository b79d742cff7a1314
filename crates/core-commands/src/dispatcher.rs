//! One command line in, one response out.

use core_model::{ClientKey, ClientState};
use core_proto::{response, tokenize};
use core_state::ServerState;

use crate::{table, CommandError, Reply};

/// Tokenize, look up, and run one line from a client, then send the
/// response. Dead or unknown clients are ignored.
pub fn dispatch_line(state: &mut ServerState, client: ClientKey, line: &str) {
    let Some(c) = state.store.client(client) else {
        return;
    };
    if c.state == ClientState::Gone {
        return;
    }

    let tokens = match tokenize(line) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::debug!(target: "proto", error = %e, "parse error");
            state.send_to(client, response::huh(&e.to_string()));
            return;
        }
    };
    let Some(keyword) = tokens.first() else {
        return; // blank line
    };

    let result = match table::lookup(keyword) {
        None => Err(CommandError::Unknown(keyword.clone())),
        Some(cmd) => {
            if cmd.needs_session
                && !state.store.client(client).is_some_and(|c| c.is_active())
            {
                Err(CommandError::Protocol(
                    "you need to say hello first".to_string(),
                ))
            } else {
                tracing::trace!(target: "command", command = %cmd.name, args = tokens.len() - 1, "dispatch");
                (cmd.handler)(state, client, &tokens)
            }
        }
    };

    match result {
        Ok(Reply::Success) => state.send_to(client, response::success()),
        Ok(Reply::Line(line)) => state.send_to(client, line),
        Ok(Reply::None) => {}
        Err(e) => state.send_to(client, response::huh(&e.to_string())),
    }
}
