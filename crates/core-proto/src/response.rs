//! Outbound line formatting.
//!
//! Responses are either solicited (`success`, `huh?`, the `connect`
//! greeting, command-specific lines) or unsolicited events (`key`,
//! `listen`, `ignore`, `menuevent`). Every helper returns a complete line
//! including the trailing newline.

use crate::{PROTOCOL_VERSION, SERVER_VERSION};

pub fn success() -> String {
    "success\n".to_string()
}

pub fn huh(reason: &str) -> String {
    format!("huh? {reason}\n")
}

/// Greeting sent in reply to `hello`.
pub fn connect_greeting(width: u16, height: u16, cellwidth: u16, cellheight: u16) -> String {
    format!(
        "connect LCDproc {SERVER_VERSION} protocol {PROTOCOL_VERSION} \
         lcd wid {width} hgt {height} cellwid {cellwidth} cellhgt {cellheight}\n"
    )
}

/// Key delivery. With a screen id the key was reserved by that screen,
/// without one it was a client-level reservation.
pub fn key_event(key: &str, screen_id: Option<&str>) -> String {
    match screen_id {
        Some(sid) => format!("key {key} {sid}\n"),
        None => format!("key {key}\n"),
    }
}

/// Sent to a screen's owner when the scheduler puts the screen on display.
pub fn listen(screen_id: &str) -> String {
    format!("listen {screen_id}\n")
}

/// Sent to a screen's owner when the screen leaves the display.
pub fn ignore(screen_id: &str) -> String {
    format!("ignore {screen_id}\n")
}

/// Menu state-change notification: `menuevent <type> <item-id> [<payload>]`.
pub fn menu_event(kind: &str, item_id: &str, payload: Option<&str>) -> String {
    match payload {
        Some(value) => format!("menuevent {kind} {item_id} {value}\n"),
        None => format!("menuevent {kind} {item_id}\n"),
    }
}

pub fn noop_complete() -> String {
    "noop complete\n".to_string()
}
