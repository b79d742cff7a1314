//! Client-level key reservations.

use core_model::ClientKey;
use core_state::ServerState;

use crate::{CmdResult, CommandError, Reply};

/// `client_add_key [-exclusively|-shared] <key>+`
pub fn client_add_key(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let mut rest = &args[1..];
    let mut exclusive = false;
    match rest.first().map(String::as_str) {
        Some("-exclusively") => {
            exclusive = true;
            rest = &rest[1..];
        }
        Some("-shared") => {
            rest = &rest[1..];
        }
        _ => {}
    }
    if rest.is_empty() {
        return Err(CommandError::Usage(
            "client_add_key [-exclusively|-shared] <key>+",
        ));
    }
    for key in rest {
        state
            .keys
            .reserve(key, exclusive, client)
            .map_err(|_| CommandError::Conflict(format!("Could not reserve key \"{key}\"")))?;
    }
    Ok(Reply::Success)
}

/// `client_del_key <key>+`
pub fn client_del_key(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 2 {
        return Err(CommandError::Usage("client_del_key <key>+"));
    }
    for key in &args[1..] {
        state.keys.release(key, client);
    }
    Ok(Reply::Success)
}
