//! Screen CRUD and per-screen key reservations.

use core_driver::CursorKind;
use core_model::{BacklightMode, ClientKey, HeartbeatOverride, Priority, ScreenKey, ScreenOwner};
use core_state::ServerState;

use crate::{
    handlers::{option_pairs, parse_u16, parse_u32},
    CmdResult, CommandError, Reply,
};

fn find_screen(state: &ServerState, client: ClientKey, id: &str) -> Result<ScreenKey, CommandError> {
    state
        .store
        .find_screen(ScreenOwner::Client(client), id)
        .ok_or_else(|| CommandError::NotFound(format!("unknown screen \"{id}\"")))
}

/// `screen_add <id>`
pub fn screen_add(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let [_, id] = args else {
        return Err(CommandError::Usage("screen_add <id>"));
    };
    let key = state.store.create_screen(
        ScreenOwner::Client(client),
        id,
        state.props.width,
        state.props.height,
    )?;
    // default hold time comes from the WaitTime setting
    let frames = (state.settings.wait_time.as_millis()
        / state.settings.frame_interval.as_millis().max(1))
    .max(1) as u32;
    state.store.screen_mut(key).expect("just created").duration = frames;
    state.screen_created(key);
    Ok(Reply::Success)
}

/// `screen_del <id>`
pub fn screen_del(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let [_, id] = args else {
        return Err(CommandError::Usage("screen_del <id>"));
    };
    let key = find_screen(state, client, id)?;
    state.store.destroy_screen(key);
    state.screen_destroyed(key);
    Ok(Reply::Success)
}

/// `screen_set <id> (-opt value)+`
pub fn screen_set(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 4 {
        return Err(CommandError::Usage("screen_set <id> (-opt value)+"));
    }
    let key = find_screen(state, client, &args[1])?;
    let mut renamed = None;
    {
        let screen = state.store.screen_mut(key).expect("looked up above");
        for (opt, value) in option_pairs(&args[2..])? {
            match opt {
                "name" => {
                    screen.name = Some(value.to_string());
                    renamed = Some(value.to_string());
                }
                "wid" => screen.width = parse_u16("width", value)?,
                "hgt" => screen.height = parse_u16("height", value)?,
                "priority" => {
                    screen.priority = Priority::parse(value).ok_or_else(|| {
                        CommandError::Protocol(format!("bad priority \"{value}\""))
                    })?;
                }
                "duration" => screen.duration = parse_u32("duration", value)?.max(1),
                "timeout" => {
                    let t = parse_u32("timeout", value)?;
                    screen.timeout = (t > 0).then_some(t);
                }
                "backlight" => {
                    screen.backlight = BacklightMode::parse(value, screen.backlight)
                        .ok_or_else(|| {
                            CommandError::Protocol(format!("bad backlight \"{value}\""))
                        })?;
                }
                "heartbeat" => {
                    screen.heartbeat = HeartbeatOverride::parse(value).ok_or_else(|| {
                        CommandError::Protocol(format!("bad heartbeat \"{value}\""))
                    })?;
                }
                "cursor" => {
                    screen.cursor = match value {
                        "off" => CursorKind::Off,
                        "on" => CursorKind::On,
                        "block" => CursorKind::Block,
                        "under" => CursorKind::Underline,
                        other => {
                            return Err(CommandError::Protocol(format!(
                                "bad cursor \"{other}\""
                            )));
                        }
                    };
                }
                "cursor_x" => screen.cursor_x = parse_u16("cursor_x", value)?,
                "cursor_y" => screen.cursor_y = parse_u16("cursor_y", value)?,
                other => {
                    return Err(CommandError::Protocol(format!(
                        "unknown option \"-{other}\""
                    )));
                }
            }
        }
    }
    if renamed.is_some() {
        // the screens menu shows the display name; rebuild its entry
        state.menu.screen_removed(key);
        let label = state
            .store
            .screen(key)
            .map(|s| s.display_name().to_string())
            .unwrap_or_default();
        state.menu.screen_added(key, &label);
        state.mark_menu_dirty();
    }
    Ok(Reply::Success)
}

/// `key_add <screen-id> <key>+`
pub fn key_add(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::Usage("key_add <screen-id> <key>+"));
    }
    let key = find_screen(state, client, &args[1])?;
    let screen = state.store.screen_mut(key).expect("looked up above");
    for k in &args[2..] {
        screen.add_key(k);
    }
    Ok(Reply::Success)
}

/// `key_del <screen-id> <key>+`
pub fn key_del(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 3 {
        return Err(CommandError::Usage("key_del <screen-id> <key>+"));
    }
    let key = find_screen(state, client, &args[1])?;
    let screen = state.store.screen_mut(key).expect("looked up above");
    for k in &args[2..] {
        screen.del_key(k);
    }
    Ok(Reply::Success)
}
