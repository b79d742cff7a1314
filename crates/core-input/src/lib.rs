//! Key routing: every key pulled from an input-capable driver walks the
//! priority cascade.
//!
//! 1. the currently rendered screen's reserved keys (owner gets
//!    `key <k> <sid>`);
//! 2. the global reservation table; a reservation matches when it is
//!    exclusive, or when its client owns the current screen (owner gets
//!    `key <k>`);
//! 3. the server: menu handling first (the menu key opens it, and an open
//!    menu swallows the navigation keys), then the rotation keys.
//!
//! ScrollUpKey/ScrollDownKey are part of the configured key set but have
//! no bound display action.
//! TODO: give the scroll keys a semantics (manual scroll of the visible
//! screen) once one is agreed with the client protocol.

use core_menu::{input as menu_input, MenuToken};
use core_proto::response;
use core_state::ServerState;
use core_model::ScreenOwner;

/// Route one key through the cascade.
pub fn route_key(state: &mut ServerState, key: &str) {
    tracing::trace!(target: "input", key, "routing key");

    // 1. screen reservation of the visible screen
    if let Some(current) = state.screenlist.current() {
        if let Some(screen) = state.store.screen(current) {
            if screen.reserves_key(key) {
                if let ScreenOwner::Client(client) = screen.owner {
                    let line = response::key_event(key, Some(&screen.id));
                    state.send_to(client, line);
                    return;
                }
            }
        }
    }

    // 2. client reservations: exclusive always fires, shared only when the
    //    holder owns the visible screen
    let current_owner = state
        .screenlist
        .current()
        .and_then(|k| state.store.screen(k))
        .map(|s| s.owner);
    let holder = state
        .keys
        .holders(key)
        .find(|r| {
            r.exclusive || current_owner == Some(ScreenOwner::Client(r.client))
        })
        .map(|r| r.client);
    if let Some(client) = holder {
        state.send_to(client, response::key_event(key, None));
        return;
    }

    // 3. server handling: menu first, then rotation
    if key == state.settings.menu_keys.menu || state.menu.is_open() {
        if let Some(token) = menu_token_for(state, key) {
            handle_menu_token(state, token);
            return;
        }
        if state.menu.is_open() {
            // unmapped keys die inside an open menu
            return;
        }
    }

    let keys = state.settings.server_keys.clone();
    if key == keys.toggle_rotate {
        let rotating = state.screenlist.toggle_autorotate();
        state.post_toast(if rotating { "Rotate" } else { "Hold" });
    } else if key == keys.next_screen {
        state.screenlist.step(&state.store, true);
        state.post_toast("Next");
    } else if key == keys.prev_screen {
        state.screenlist.step(&state.store, false);
        state.post_toast("Prev");
    } else if key == keys.scroll_up || key == keys.scroll_down {
        // reserved, not bound (see module docs)
        tracing::debug!(target: "input", key, "scroll key ignored");
    } else {
        tracing::debug!(target: "input", key, "unrouted key dropped");
    }
}

/// Map a raw key name onto the menu's logical token set.
fn menu_token_for(state: &ServerState, key: &str) -> Option<MenuToken> {
    let keys = &state.settings.menu_keys;
    if key == keys.menu {
        Some(MenuToken::Menu)
    } else if key == keys.enter {
        Some(MenuToken::Enter)
    } else if key == keys.up {
        Some(MenuToken::Up)
    } else if key == keys.down {
        Some(MenuToken::Down)
    } else if key == keys.left {
        Some(MenuToken::Left)
    } else if key == keys.right {
        Some(MenuToken::Right)
    } else {
        None
    }
}

fn handle_menu_token(state: &mut ServerState, token: MenuToken) {
    let outcome = menu_input::process_key(&mut state.menu, token);
    for event in outcome.events {
        if let Some(client) = event.client {
            let line = response::menu_event(
                event.kind.wire_name(),
                &event.item_id,
                event.payload.as_deref(),
            );
            state.send_to(client, line);
        }
    }
    if let Some(screen) = outcome.goto_screen {
        state.screenlist.force_show(screen);
    }
    state.mark_menu_dirty();
    state.sync_menu_screen();
}
