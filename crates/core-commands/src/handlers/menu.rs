//! Menu CRUD and navigation commands.
//!
//! Items are scoped to the issuing client; the first `menu_add_item`
//! grafts the client's root menu (labeled with its name) under the main
//! menu, and the last `menu_del_item` removes it again.

use core_model::ClientKey;
use core_proto::response;
use core_state::ServerState;

use crate::{handlers::option_pairs, CmdResult, CommandError, Reply};

fn require_name(state: &ServerState, client: ClientKey) -> Result<String, CommandError> {
    state
        .store
        .client(client)
        .and_then(|c| c.name.clone())
        .ok_or_else(|| {
            CommandError::Protocol("client must set a name before using menus".to_string())
        })
}

/// `menu_add_item <menu-id> <new-id> <kind> [<text>] (-opt value)*`
pub fn menu_add_item(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 4 {
        return Err(CommandError::Usage(
            "menu_add_item <menu-id> <new-id> <type> [<text>] [-opt value]*",
        ));
    }
    let name = require_name(state, client)?;
    let (text, rest) = match args.get(4) {
        Some(t) if !t.starts_with('-') => (t.clone(), &args[5..]),
        _ => (args[2].clone(), &args[4..]),
    };
    let key = state
        .menu
        .add_item(client, &name, &args[1], &args[2], &args[3], &text)?;
    for (opt, value) in option_pairs(rest)? {
        state
            .menu
            .item_mut(key)
            .expect("item just created")
            .set_option(opt, value)?;
    }
    state.mark_menu_dirty();
    state.sync_menu_screen();
    Ok(Reply::Success)
}

/// `menu_del_item <ignored> <item-id>`
pub fn menu_del_item(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() != 3 {
        return Err(CommandError::Usage("menu_del_item <menu-id> <item-id>"));
    }
    state.menu.del_item(client, &args[2])?;
    state.mark_menu_dirty();
    state.sync_menu_screen();
    Ok(Reply::Success)
}

/// `menu_set_item <ignored> <item-id> (-opt value)+`
pub fn menu_set_item(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 5 {
        return Err(CommandError::Usage(
            "menu_set_item <menu-id> <item-id> (-opt value)+",
        ));
    }
    let key = state
        .menu
        .find(Some(client), &args[2])
        .ok_or_else(|| CommandError::NotFound(format!("unknown menu item \"{}\"", args[2])))?;
    for (opt, value) in option_pairs(&args[3..])? {
        state
            .menu
            .item_mut(key)
            .expect("looked up above")
            .set_option(opt, value)?;
    }
    state.mark_menu_dirty();
    state.sync_menu_screen();
    Ok(Reply::Success)
}

/// `menu_goto <item-id> [<predecessor-id>]`
pub fn menu_goto(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() != 2 && args.len() != 3 {
        return Err(CommandError::Usage("menu_goto <item-id> [<predecessor>]"));
    }
    let target = &args[1];
    if target == "_quit_" {
        let events = state.menu.close();
        deliver(state, events);
        state.mark_menu_dirty();
        state.sync_menu_screen();
        return Ok(Reply::Success);
    }
    let key = state
        .menu
        .find(Some(client), target)
        .or_else(|| {
            state
                .settings
                .permissive_goto
                .then(|| state.menu.find_anywhere(target))
                .flatten()
        })
        .ok_or_else(|| CommandError::NotFound(format!("unknown menu item \"{target}\"")))?;
    if let Some(pred) = args.get(2) {
        state
            .menu
            .item_mut(key)
            .expect("looked up above")
            .set_option("prev", pred)?;
    }
    let events = state.menu.goto(key);
    deliver(state, events);
    state.mark_menu_dirty();
    state.sync_menu_screen();
    Ok(Reply::Success)
}

/// `menu_set_main <menu-id>`
pub fn menu_set_main(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let [_, id] = args else {
        return Err(CommandError::Usage("menu_set_main <menu-id>"));
    };
    state.menu.set_main(client, id)?;
    Ok(Reply::Success)
}

fn deliver(state: &ServerState, events: Vec<core_menu::MenuEvent>) {
    for event in events {
        if let Some(client) = event.client {
            state.send_to(
                client,
                response::menu_event(
                    event.kind.wire_name(),
                    &event.item_id,
                    event.payload.as_deref(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatcher::dispatch_line;
    use crate::dispatcher::tests::{connect, new_state};
    use core_model::{ClientKey, Priority};
    use core_state::ServerState;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn named_session(state: &mut ServerState) -> (ClientKey, UnboundedReceiver<String>) {
        let (c, mut rx) = connect(state);
        dispatch_line(state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(state, c, "client_set -name tester");
        rx.try_recv().unwrap();
        (c, rx)
    }

    #[test]
    fn menu_commands_require_a_client_name() {
        let mut state = new_state();
        let (c, mut rx) = connect(&mut state);
        dispatch_line(&mut state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "menu_add_item \"\" i1 action Hello");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? client must set a name before using menus\n"
        );
    }

    #[test]
    fn add_item_with_inline_options() {
        let mut state = new_state();
        let (c, mut rx) = named_session(&mut state);
        dispatch_line(
            &mut state,
            c,
            "menu_add_item \"\" n1 numeric \"Port\" -minvalue 1 -maxvalue 65535 -value 8080",
        );
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        let key = state.menu.find(Some(c), "n1").unwrap();
        assert_eq!(
            state.menu.item(key).unwrap().value_text().as_deref(),
            Some("8080")
        );
    }

    #[test]
    fn set_item_applies_the_typed_option_table() {
        let mut state = new_state();
        let (c, mut rx) = named_session(&mut state);
        dispatch_line(&mut state, c, "menu_add_item \"\" n1 numeric Port");
        rx.try_recv().unwrap();
        dispatch_line(
            &mut state,
            c,
            "menu_set_item \"\" n1 -minvalue 1 -maxvalue 65535 -value 8080",
        );
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        dispatch_line(&mut state, c, "menu_set_item \"\" n1 -value eight");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? option \"-value\" expects integer\n"
        );
        dispatch_line(&mut state, c, "menu_set_item \"\" n1 -value 70000");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? option \"-value\" value out of range\n"
        );
    }

    #[test]
    fn goto_opens_the_menu_screen() {
        let mut state = new_state();
        let (c, mut rx) = named_session(&mut state);
        dispatch_line(&mut state, c, "menu_add_item \"\" n1 numeric Port");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "menu_goto n1");
        assert_eq!(rx.try_recv().unwrap(), "menuevent enter n1\n");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        assert_eq!(
            state.store.screen(state.menu_screen).unwrap().priority,
            Priority::Input
        );
        dispatch_line(&mut state, c, "menu_goto _quit_");
        assert_eq!(rx.try_recv().unwrap(), "menuevent leave n1\n");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        assert_eq!(
            state.store.screen(state.menu_screen).unwrap().priority,
            Priority::Hidden
        );
    }

    #[test]
    fn del_item_prunes_the_client_menu() {
        let mut state = new_state();
        let (c, mut rx) = named_session(&mut state);
        dispatch_line(&mut state, c, "menu_add_item \"\" a1 action One");
        rx.try_recv().unwrap();
        assert!(state.menu.client_root(c).is_some());
        dispatch_line(&mut state, c, "menu_del_item \"\" a1");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        assert!(state.menu.client_root(c).is_none());
        dispatch_line(&mut state, c, "menu_del_item \"\" a1");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? unknown menu item \"a1\"\n"
        );
    }

    #[test]
    fn goto_respects_client_scope_unless_permissive() {
        let mut state = new_state();
        let (a, mut rx_a) = named_session(&mut state);
        let (b, mut rx_b) = named_session(&mut state);
        dispatch_line(&mut state, a, "menu_add_item \"\" secret action Hidden");
        rx_a.try_recv().unwrap();
        dispatch_line(&mut state, b, "menu_goto secret");
        assert_eq!(
            rx_b.try_recv().unwrap(),
            "huh? unknown menu item \"secret\"\n"
        );
        state.settings.permissive_goto = true;
        dispatch_line(&mut state, b, "menu_goto secret");
        assert_eq!(rx_b.try_recv().unwrap(), "success\n");
    }
}
