//! Widget CRUD. `widget_set` argument shapes are type-specific; see the
//! match in [`widget_set`].

use core_driver::Icon;
use core_model::{
    ClientKey, FrameScroll, ScreenKey, ScreenOwner, ScrollDirection, WidgetKind,
};
use core_state::ServerState;

use crate::{
    handlers::{parse_i32, parse_u16},
    CmdResult, CommandError, Reply,
};

fn find_screen(state: &ServerState, client: ClientKey, id: &str) -> Result<ScreenKey, CommandError> {
    state
        .store
        .find_screen(ScreenOwner::Client(client), id)
        .ok_or_else(|| CommandError::NotFound(format!("unknown screen \"{id}\"")))
}

/// `widget_add <screen-id> <widget-id> <type> [-in <frame-id>]`
pub fn widget_add(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() != 4 && args.len() != 6 {
        return Err(CommandError::Usage(
            "widget_add <screen-id> <widget-id> <type> [-in <frame-id>]",
        ));
    }
    let screen = find_screen(state, client, &args[1])?;
    let kind = WidgetKind::from_type_name(&args[3])
        .ok_or_else(|| CommandError::Protocol(format!("invalid widget type \"{}\"", args[3])))?;
    let in_frame = if args.len() == 6 {
        if args[4] != "-in" {
            return Err(CommandError::Protocol(format!(
                "expected -in, got \"{}\"",
                args[4]
            )));
        }
        Some(args[5].as_str())
    } else {
        None
    };
    state.store.add_widget(screen, &args[2], kind, in_frame)?;
    Ok(Reply::Success)
}

/// `widget_del <screen-id> <widget-id>`
pub fn widget_del(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    let [_, sid, wid] = args else {
        return Err(CommandError::Usage("widget_del <screen-id> <widget-id>"));
    };
    let screen = find_screen(state, client, sid)?;
    state.store.destroy_widget(screen, wid)?;
    Ok(Reply::Success)
}

/// `widget_set <screen-id> <widget-id> <type-specific args...>`
pub fn widget_set(state: &mut ServerState, client: ClientKey, args: &[String]) -> CmdResult {
    if args.len() < 4 {
        return Err(CommandError::Usage(
            "widget_set <screen-id> <widget-id> <args...>",
        ));
    }
    let screen = find_screen(state, client, &args[1])?;
    let key = state
        .store
        .widget_by_id(screen, &args[2])
        .ok_or_else(|| CommandError::NotFound(format!("unknown widget \"{}\"", args[2])))?;
    let rest = &args[3..];
    let widget = state.store.widget_mut(key).expect("looked up above");
    match &mut widget.kind {
        WidgetKind::String { text } => {
            let [x, y, value] = rest else {
                return Err(CommandError::Usage("widget_set <sid> <wid> <x> <y> <text>"));
            };
            widget.x = parse_u16("x", x)?;
            widget.y = parse_u16("y", y)?;
            *text = value.clone();
        }
        WidgetKind::Title { text } => {
            let [value] = rest else {
                return Err(CommandError::Usage("widget_set <sid> <wid> <text>"));
            };
            *text = value.clone();
        }
        WidgetKind::Hbar { length } | WidgetKind::Vbar { length } => {
            let [x, y, len] = rest else {
                return Err(CommandError::Usage(
                    "widget_set <sid> <wid> <x> <y> <length>",
                ));
            };
            widget.x = parse_u16("x", x)?;
            widget.y = parse_u16("y", y)?;
            *length = parse_u16("length", len)?;
        }
        WidgetKind::Pbar {
            width,
            promille,
            begin_label,
            end_label,
        } => {
            if rest.len() != 4 && rest.len() != 6 {
                return Err(CommandError::Usage(
                    "widget_set <sid> <wid> <x> <y> <width> <promille> [<begin> <end>]",
                ));
            }
            widget.x = parse_u16("x", &rest[0])?;
            widget.y = parse_u16("y", &rest[1])?;
            *width = parse_u16("width", &rest[2])?;
            let p = parse_u16("promille", &rest[3])?;
            if p > 1000 {
                return Err(CommandError::Protocol(format!(
                    "promille out of range \"{p}\""
                )));
            }
            *promille = p;
            if rest.len() == 6 {
                *begin_label = Some(rest[4].clone());
                *end_label = Some(rest[5].clone());
            }
        }
        WidgetKind::Icon { icon } => {
            let [x, y, name] = rest else {
                return Err(CommandError::Usage(
                    "widget_set <sid> <wid> <x> <y> <icon-name>",
                ));
            };
            widget.x = parse_u16("x", x)?;
            widget.y = parse_u16("y", y)?;
            *icon = Icon::from_name(name)
                .ok_or_else(|| CommandError::Protocol(format!("invalid icon \"{name}\"")))?;
        }
        WidgetKind::Num { digit } => {
            let [x, value] = rest else {
                return Err(CommandError::Usage("widget_set <sid> <wid> <x> <digit>"));
            };
            widget.x = parse_u16("x", x)?;
            let d = parse_u16("digit", value)?;
            if d > 10 {
                return Err(CommandError::Protocol(format!(
                    "digit out of range \"{d}\""
                )));
            }
            *digit = d as u8;
        }
        WidgetKind::Scroller {
            left,
            top,
            right,
            bottom,
            direction,
            speed,
            text,
        } => {
            let [l, t, r, b, dir, spd, value] = rest else {
                return Err(CommandError::Usage(
                    "widget_set <sid> <wid> <left> <top> <right> <bottom> <direction> <speed> <text>",
                ));
            };
            *left = parse_u16("left", l)?;
            *top = parse_u16("top", t)?;
            *right = parse_u16("right", r)?;
            *bottom = parse_u16("bottom", b)?;
            *direction = ScrollDirection::parse(dir)
                .ok_or_else(|| CommandError::Protocol(format!("bad direction \"{dir}\"")))?;
            *speed = parse_i32("speed", spd)?;
            *text = value.clone();
        }
        WidgetKind::Frame {
            left,
            top,
            right,
            bottom,
            width,
            height,
            direction,
            speed,
            ..
        } => {
            let [l, t, r, b, w, h, dir, spd] = rest else {
                return Err(CommandError::Usage(
                    "widget_set <sid> <wid> <left> <top> <right> <bottom> <width> <height> <direction> <speed>",
                ));
            };
            *left = parse_u16("left", l)?;
            *top = parse_u16("top", t)?;
            *right = parse_u16("right", r)?;
            *bottom = parse_u16("bottom", b)?;
            *width = parse_u16("width", w)?;
            *height = parse_u16("height", h)?;
            *direction = FrameScroll::parse(dir)
                .ok_or_else(|| CommandError::Protocol(format!("bad direction \"{dir}\"")))?;
            *speed = parse_i32("speed", spd)?;
        }
    }
    Ok(Reply::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::dispatch_line;
    use crate::dispatcher::tests::{connect, new_state};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn session_with_screen(
        state: &mut ServerState,
    ) -> (ClientKey, UnboundedReceiver<String>, ScreenKey) {
        let (c, mut rx) = connect(state);
        dispatch_line(state, c, "hello");
        rx.try_recv().unwrap();
        dispatch_line(state, c, "screen_add s1");
        rx.try_recv().unwrap();
        let key = state
            .store
            .find_screen(ScreenOwner::Client(c), "s1")
            .unwrap();
        (c, rx, key)
    }

    #[test]
    fn status_screen_scenario_builds_the_expected_widgets() {
        let mut state = new_state();
        let (c, mut rx, screen) = session_with_screen(&mut state);
        for cmd in [
            "widget_add s1 t title",
            "widget_set s1 t {CPU Usage}",
            "widget_add s1 b hbar",
            "widget_set s1 b 1 2 500",
        ] {
            dispatch_line(&mut state, c, cmd);
            assert_eq!(rx.try_recv().unwrap(), "success\n", "command: {cmd}");
        }
        let t = state.store.widget_by_id(screen, "t").unwrap();
        match &state.store.widget(t).unwrap().kind {
            WidgetKind::Title { text } => assert_eq!(text, "CPU Usage"),
            other => panic!("expected a title, got {}", other.type_name()),
        }
        let b = state.store.widget_by_id(screen, "b").unwrap();
        let widget = state.store.widget(b).unwrap();
        assert_eq!((widget.x, widget.y), (1, 2));
        match &widget.kind {
            WidgetKind::Hbar { length } => assert_eq!(*length, 500),
            other => panic!("expected an hbar, got {}", other.type_name()),
        }
    }

    #[test]
    fn widgets_nest_into_frames() {
        let mut state = new_state();
        let (c, mut rx, screen) = session_with_screen(&mut state);
        dispatch_line(&mut state, c, "widget_add s1 f frame");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "widget_set s1 f 1 2 10 4 10 6 v 8");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        dispatch_line(&mut state, c, "widget_add s1 inner string -in f");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        dispatch_line(&mut state, c, "widget_set s1 inner 1 1 {in frame}");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        assert!(state.store.widget_by_id(screen, "inner").is_some());
        // deleting the frame cascades
        dispatch_line(&mut state, c, "widget_del s1 f");
        rx.try_recv().unwrap();
        assert!(state.store.widget_by_id(screen, "inner").is_none());
    }

    #[test]
    fn bad_type_and_bad_arity_are_reported() {
        let mut state = new_state();
        let (c, mut rx, _screen) = session_with_screen(&mut state);
        dispatch_line(&mut state, c, "widget_add s1 g gauge");
        assert_eq!(
            rx.try_recv().unwrap(),
            "huh? invalid widget type \"gauge\"\n"
        );
        dispatch_line(&mut state, c, "widget_add s1 w string");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "widget_set s1 w 1 2");
        assert!(rx.try_recv().unwrap().starts_with("huh? usage:"));
        dispatch_line(&mut state, c, "widget_set s1 w x 2 text");
        assert_eq!(rx.try_recv().unwrap(), "huh? bad x \"x\"\n");
    }

    #[test]
    fn scroller_takes_the_full_region_arguments() {
        let mut state = new_state();
        let (c, mut rx, screen) = session_with_screen(&mut state);
        dispatch_line(&mut state, c, "widget_add s1 m scroller");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "widget_set s1 m 1 1 20 1 m 2 \"HELLO WORLD\"");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        let m = state.store.widget_by_id(screen, "m").unwrap();
        match &state.store.widget(m).unwrap().kind {
            WidgetKind::Scroller {
                right,
                direction,
                speed,
                text,
                ..
            } => {
                assert_eq!(*right, 20);
                assert_eq!(*direction, ScrollDirection::Marquee);
                assert_eq!(*speed, 2);
                assert_eq!(text, "HELLO WORLD");
            }
            other => panic!("expected a scroller, got {}", other.type_name()),
        }
    }

    #[test]
    fn icon_names_are_validated() {
        let mut state = new_state();
        let (c, mut rx, screen) = session_with_screen(&mut state);
        dispatch_line(&mut state, c, "widget_add s1 i icon");
        rx.try_recv().unwrap();
        dispatch_line(&mut state, c, "widget_set s1 i 3 1 heart_filled");
        assert_eq!(rx.try_recv().unwrap(), "success\n");
        let i = state.store.widget_by_id(screen, "i").unwrap();
        match &state.store.widget(i).unwrap().kind {
            WidgetKind::Icon { icon } => assert_eq!(*icon, Icon::HeartFilled),
            other => panic!("expected an icon, got {}", other.type_name()),
        }
        dispatch_line(&mut state, c, "widget_set s1 i 3 1 sparkle");
        assert_eq!(rx.try_recv().unwrap(), "huh? invalid icon \"sparkle\"\n");
    }
}
