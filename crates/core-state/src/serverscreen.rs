//! The server's own screens: the hello/status screen and the one-shot
//! goodbye screen.
//!
//! Until the first client connects the status screen shows the hello
//! banner (configurable, one `Hello` line per display row). Afterwards it
//! shows client and screen counts. The `ServerScreen` tristate picks its
//! rotation class: `on` keeps it rotating with client screens, `off`
//! demotes it to background (visible only when nothing else is), `blank`
//! is background with an empty face.

use core_config::Tristate;
use core_model::{Priority, ScreenKey, ScreenOwner, WidgetKind};

use crate::ServerState;

pub const SCREEN_ID: &str = "_server_screen_";

/// Build the status screen at startup.
pub fn create(state: &mut ServerState) -> ScreenKey {
    let key = state
        .store
        .create_screen(ScreenOwner::Server, SCREEN_ID, state.props.width, state.props.height)
        .expect("server screen id is reserved");
    let screen = state.store.screen_mut(key).expect("just created");
    screen.name = Some("Server status".to_string());
    screen.priority = match state.settings.server_screen {
        Tristate::On => Priority::Info,
        Tristate::Off | Tristate::Open => Priority::Background,
    };
    screen.duration = 32;
    refresh_at(state, key);
    key
}

/// Re-render the status content (client/screen counts or hello banner).
pub fn refresh(state: &mut ServerState) {
    let key = state.server_screen;
    if state.store.screen(key).is_some() {
        refresh_at(state, key);
    }
}

fn put_line(state: &mut ServerState, key: ScreenKey, id: &str, y: u16, text: &str) {
    if let Ok(w) = state
        .store
        .add_widget(key, id, WidgetKind::String { text: text.to_string() }, None)
    {
        let widget = state.store.widget_mut(w).expect("widget just created");
        widget.x = 1;
        widget.y = y;
    }
}

fn refresh_at(state: &mut ServerState, key: ScreenKey) {
    state.store.clear_widgets(key);
    // blank face: stays selectable but renders nothing
    if state.settings.server_screen == Tristate::Open {
        return;
    }
    if !state.had_client && !state.settings.hello.is_empty() {
        let banner = state.settings.hello.clone();
        for (i, line) in banner.iter().take(usize::from(state.props.height)).enumerate() {
            put_line(state, key, &format!("hello{i}"), i as u16 + 1, line);
        }
        return;
    }
    if let Ok(w) = state.store.add_widget(
        key,
        "title",
        WidgetKind::Title {
            text: "glint server".to_string(),
        },
        None,
    ) {
        let widget = state.store.widget_mut(w).expect("widget just created");
        widget.x = 1;
        widget.y = 1;
    }
    // the two server screens are not client work; keep them out of the count
    let clients = state.store.live_clients();
    let screens = state.store.live_screens().saturating_sub(2);
    put_line(state, key, "clients", 2, &format!("Clients: {clients}"));
    if state.props.height >= 3 {
        put_line(state, key, "screens", 3, &format!("Screens: {screens}"));
    }
}

/// Replace the status screen's face with the goodbye banner; called once
/// on shutdown right before the final frame.
pub fn show_goodbye(state: &mut ServerState) {
    let key = state.server_screen;
    if state.store.screen(key).is_none() {
        return;
    }
    state.store.clear_widgets(key);
    let lines = if state.settings.goodbye.is_empty() {
        vec!["Thanks for using".to_string(), "glint".to_string()]
    } else {
        state.settings.goodbye.clone()
    };
    for (i, line) in lines.iter().take(usize::from(state.props.height)).enumerate() {
        put_line(state, key, &format!("bye{i}"), i as u16 + 1, line);
    }
    if let Some(screen) = state.store.screen_mut(key) {
        screen.priority = Priority::Input;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::Settings;
    use core_driver::{DebugDriver, DriverSet};

    fn state_with(settings: Settings) -> ServerState {
        let drivers =
            DriverSet::assemble(vec![Box::new(DebugDriver::with_size(20, 4))]).unwrap();
        ServerState::new(drivers, settings)
    }

    #[test]
    fn status_screen_counts_clients_and_screens() {
        let mut state = state_with(Settings::default());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        std::mem::forget(rx);
        state.client_connected(tx);
        refresh(&mut state);
        let key = state.server_screen;
        let clients = state.store.widget_by_id(key, "clients").unwrap();
        match &state.store.widget(clients).unwrap().kind {
            WidgetKind::String { text } => assert_eq!(text, "Clients: 1"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn hello_banner_shows_until_first_client() {
        let mut settings = Settings::default();
        settings.hello = vec!["  Welcome".to_string()];
        let mut state = state_with(settings);
        let key = state.server_screen;
        assert!(state.store.widget_by_id(key, "hello0").is_some());
        assert!(state.store.widget_by_id(key, "title").is_none());
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        std::mem::forget(rx);
        state.client_connected(tx);
        refresh(&mut state);
        assert!(state.store.widget_by_id(key, "hello0").is_none());
        assert!(state.store.widget_by_id(key, "title").is_some());
    }

    #[test]
    fn blank_server_screen_renders_nothing() {
        let mut settings = Settings::default();
        settings.server_screen = Tristate::Open;
        let state = state_with(settings);
        let key = state.server_screen;
        assert!(state.store.screen(key).unwrap().widgets.is_empty());
        assert_eq!(state.store.screen(key).unwrap().priority, Priority::Background);
    }

    #[test]
    fn goodbye_banner_takes_over_the_display() {
        let mut state = state_with(Settings::default());
        show_goodbye(&mut state);
        let key = state.server_screen;
        assert!(state.store.widget_by_id(key, "bye0").is_some());
        assert_eq!(state.store.screen(key).unwrap().priority, Priority::Input);
    }
}
