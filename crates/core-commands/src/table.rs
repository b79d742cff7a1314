//! The static keyword table. A linear scan is plenty at this size.

use core_model::ClientKey;
use core_state::ServerState;

use crate::{handlers, CmdResult};

pub type Handler = fn(&mut ServerState, ClientKey, &[String]) -> CmdResult;

pub struct Command {
    pub name: &'static str,
    /// Whether the client must have completed `hello` first.
    pub needs_session: bool,
    pub handler: Handler,
}

pub const COMMANDS: &[Command] = &[
    Command { name: "hello", needs_session: false, handler: handlers::client::hello },
    Command { name: "bye", needs_session: false, handler: handlers::client::bye },
    Command { name: "client_set", needs_session: true, handler: handlers::client::client_set },
    Command { name: "client_add_key", needs_session: true, handler: handlers::keys::client_add_key },
    Command { name: "client_del_key", needs_session: true, handler: handlers::keys::client_del_key },
    Command { name: "screen_add", needs_session: true, handler: handlers::screen::screen_add },
    Command { name: "screen_del", needs_session: true, handler: handlers::screen::screen_del },
    Command { name: "screen_set", needs_session: true, handler: handlers::screen::screen_set },
    Command { name: "key_add", needs_session: true, handler: handlers::screen::key_add },
    Command { name: "key_del", needs_session: true, handler: handlers::screen::key_del },
    Command { name: "widget_add", needs_session: true, handler: handlers::widget::widget_add },
    Command { name: "widget_del", needs_session: true, handler: handlers::widget::widget_del },
    Command { name: "widget_set", needs_session: true, handler: handlers::widget::widget_set },
    Command { name: "menu_add_item", needs_session: true, handler: handlers::menu::menu_add_item },
    Command { name: "menu_del_item", needs_session: true, handler: handlers::menu::menu_del_item },
    Command { name: "menu_set_item", needs_session: true, handler: handlers::menu::menu_set_item },
    Command { name: "menu_goto", needs_session: true, handler: handlers::menu::menu_goto },
    Command { name: "menu_set_main", needs_session: true, handler: handlers::menu::menu_set_main },
    Command { name: "backlight", needs_session: true, handler: handlers::server::backlight },
    Command { name: "output", needs_session: true, handler: handlers::server::output },
    Command { name: "info", needs_session: true, handler: handlers::server::info },
    Command { name: "noop", needs_session: true, handler: handlers::server::noop },
];

pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_every_entry_and_nothing_else() {
        for cmd in COMMANDS {
            assert_eq!(lookup(cmd.name).unwrap().name, cmd.name);
        }
        assert!(lookup("reboot").is_none());
        assert!(lookup("HELLO").is_none()); // keywords are case sensitive
    }

    #[test]
    fn only_the_handshake_commands_skip_the_session_check() {
        let open: Vec<&str> = COMMANDS
            .iter()
            .filter(|c| !c.needs_session)
            .map(|c| c.name)
            .collect();
        assert_eq!(open, vec!["hello", "bye"]);
    }
}
