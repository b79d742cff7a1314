//! Session lifecycle: `hello`, `bye`, `client_set`.

use core_model::{ClientKey, ClientState};
use core_proto::response;
use core_state::{serverscreen, ServerState};

use crate::{handlers::option_pairs, CmdResult, CommandError, Reply};

/// `hello` - establish the session and report display geometry.
pub fn hello(state: &mut ServerState, client: ClientKey, _args: &[String]) -> CmdResult {
    if let Some(c) = state.store.client_mut(client) {
        c.state = ClientState::Active;
    }
    let p = state.props;
    Ok(Reply::Line(response::connect_greeting(
        p.width,
        p.height,
        p.cellwidth,
        p.cellheight,
    )))
}

/// `bye` - mark the client for destruction at end of tick. No response.
pub fn bye(state: &mut ServerState, client: ClientKey, _args: &[String]) -> CmdResult {
    state.mark_gone(client);
    Ok(Reply::None)
}

/// `client_set -name <name>`
pub fn client_set(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::Usage("client_set -name <name>"));
    }
    for (opt, value) in option_pairs(&args[1..])? {
        match opt {
            "name" => {
                if value.is_empty() {
                    return Err(CommandError::Protocol("empty client name".to_string()));
                }
                if let Some(c) = state.store.client_mut(client) {
                    c.name = Some(value.to_string());
                }
                serverscreen::refresh(state);
            }
            other => {
                return Err(CommandError::Protocol(format!(
                    "unknown option \"-{other}\""
                )));
            }
        }
    }
    Ok(Reply::Success)
}
