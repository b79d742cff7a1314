//! Widget layouts for the menu screen.
//!
//! After every menu state change the active item's screen is rebuilt from
//! scratch as ordinary widgets, so the frame renderer needs no menu
//! knowledge at all. Menus get a title, one row per visible child, a
//! selector arrow, and scroll arrows; editors get their bespoke rows.

use core_driver::{CursorKind, DisplayProps, Icon};
use core_model::{EntityStore, ScreenKey, WidgetKind};

use crate::{
    item::{EditState, ItemKind},
    tree::MenuTree,
    ItemKey,
};

/// Rebuild the menu screen's widgets for the current active item. With the
/// menu closed the screen is just emptied.
pub fn build(store: &mut EntityStore, screen: ScreenKey, tree: &mut MenuTree, props: DisplayProps) {
    store.clear_widgets(screen);
    if let Some(s) = store.screen_mut(screen) {
        s.cursor = CursorKind::Off;
    }
    let Some(active) = tree.active() else { return };
    let kind = tree.item(active).map(|i| i.kind.kind_name());
    match kind {
        Some("menu") => build_menu_list(store, screen, tree, active, props),
        Some("slider") => build_slider(store, screen, tree, active, props),
        Some("numeric") => build_numeric(store, screen, tree, active, props),
        Some("alpha") => build_alpha(store, screen, tree, active, props),
        Some("ip") => build_ip(store, screen, tree, active, props),
        // simple items never stay active; nothing to draw
        _ => {}
    }
}

fn put_string(store: &mut EntityStore, screen: ScreenKey, id: &str, x: u16, y: u16, text: &str) {
    if let Ok(key) = store.add_widget(
        screen,
        id,
        WidgetKind::String {
            text: text.to_string(),
        },
        None,
    ) {
        let w = store.widget_mut(key).expect("widget just created");
        w.x = x;
        w.y = y;
    }
}

fn put_icon(store: &mut EntityStore, screen: ScreenKey, id: &str, x: u16, y: u16, icon: Icon) {
    if let Ok(key) = store.add_widget(screen, id, WidgetKind::Icon { icon }, None) {
        let w = store.widget_mut(key).expect("widget just created");
        w.x = x;
        w.y = y;
    }
}

fn put_title(store: &mut EntityStore, screen: ScreenKey, text: &str) {
    if let Ok(key) = store.add_widget(
        screen,
        "menu_title",
        WidgetKind::Title {
            text: text.to_string(),
        },
        None,
    ) {
        let w = store.widget_mut(key).expect("widget just created");
        w.x = 1;
        w.y = 1;
    }
}

fn build_menu_list(
    store: &mut EntityStore,
    screen: ScreenKey,
    tree: &mut MenuTree,
    menu: ItemKey,
    props: DisplayProps,
) {
    let title = tree.item(menu).map(|i| i.text.clone()).unwrap_or_default();
    put_title(store, screen, &title);

    let visible = tree.visible_children(menu);
    let page = usize::from(props.height.saturating_sub(1)).max(1);

    // keep the selection inside the visible window
    let (selected, scroll) = match tree.item_mut(menu).map(|i| &mut i.kind) {
        Some(ItemKind::Menu {
            selected, scroll, ..
        }) => {
            if *selected < *scroll {
                *scroll = *selected;
            } else if *selected >= *scroll + page {
                *scroll = *selected + 1 - page;
            }
            (*selected, *scroll)
        }
        _ => (0, 0),
    };

    for (row, &child) in visible.iter().skip(scroll).take(page).enumerate() {
        let y = row as u16 + 2;
        let index = scroll + row;
        let Some(item) = tree.item(child) else { continue };
        if index == selected {
            put_icon(store, screen, &format!("sel{row}"), 1, y, Icon::SelectorLeft);
        }
        put_string(store, screen, &format!("line{row}"), 2, y, &item.text);
        match &item.kind {
            ItemKind::Checkbox { value, .. } => {
                let icon = match value {
                    crate::item::CheckState::Off => Icon::CheckboxOff,
                    crate::item::CheckState::On => Icon::CheckboxOn,
                    crate::item::CheckState::Gray => Icon::CheckboxGray,
                };
                put_icon(store, screen, &format!("val{row}"), props.width - 1, y, icon);
            }
            ItemKind::Menu { .. } => {
                put_string(store, screen, &format!("val{row}"), props.width, y, ">");
            }
            _ => {
                if let Some(value) = item.value_text() {
                    let shown: String = value.chars().take(6).collect();
                    let x = props.width.saturating_sub(shown.chars().count() as u16) + 1;
                    put_string(store, screen, &format!("val{row}"), x.max(2), y, &shown);
                }
            }
        }
    }

    if scroll > 0 {
        put_icon(store, screen, "scroll_up", props.width, 2, Icon::ArrowUp);
    }
    if scroll + page < visible.len() {
        put_icon(
            store,
            screen,
            "scroll_down",
            props.width,
            props.height,
            Icon::ArrowDown,
        );
    }
}

fn build_slider(
    store: &mut EntityStore,
    screen: ScreenKey,
    tree: &MenuTree,
    key: ItemKey,
    props: DisplayProps,
) {
    let Some(item) = tree.item(key) else { return };
    let ItemKind::Slider {
        value,
        min,
        max,
        mintext,
        maxtext,
        ..
    } = &item.kind
    else {
        return;
    };
    put_title(store, screen, &item.text);
    let span = (max - min).max(1);
    let promille = ((value - min).clamp(0, span) * 1000 / span) as u16;
    let bar_cells = props.width.saturating_sub(2).max(1);
    if let Ok(bar) = store.add_widget(
        screen,
        "slider_bar",
        WidgetKind::Pbar {
            width: bar_cells + 2,
            promille,
            begin_label: None,
            end_label: None,
        },
        None,
    ) {
        let w = store.widget_mut(bar).expect("widget just created");
        w.x = 1;
        w.y = 2;
    }
    if props.height >= 3 {
        let left = if mintext.is_empty() {
            min.to_string()
        } else {
            mintext.clone()
        };
        let right = if maxtext.is_empty() {
            max.to_string()
        } else {
            maxtext.clone()
        };
        put_string(store, screen, "slider_min", 1, 3, &left);
        let x = props
            .width
            .saturating_sub(right.chars().count() as u16)
            .max(1)
            + 1;
        put_string(store, screen, "slider_max", x.min(props.width), 3, &right);
    }
    if props.height >= 4 {
        put_string(store, screen, "slider_value", 1, 4, &value.to_string());
    }
}

/// Shared text-row layout of the numeric/alpha/ip editors: the buffer on
/// row 2 with a live cursor, the error message (if any) below.
fn build_edit_row(
    store: &mut EntityStore,
    screen: ScreenKey,
    props: DisplayProps,
    edit: &EditState,
    shown: &str,
    error: Option<&'static str>,
) {
    let width = usize::from(props.width);
    let offs = edit.pos.saturating_sub(width.saturating_sub(1));
    let window: String = shown.chars().skip(offs).take(width).collect();
    put_string(store, screen, "edit_buf", 1, 2, &window);
    if let Some(s) = store.screen_mut(screen) {
        s.cursor = CursorKind::On;
        s.cursor_x = (edit.pos - offs) as u16 + 1;
        s.cursor_y = 2;
    }
    if let Some(message) = error {
        if props.height >= 3 {
            put_string(store, screen, "edit_err", 1, 3, message);
        }
    }
}

fn build_numeric(
    store: &mut EntityStore,
    screen: ScreenKey,
    tree: &MenuTree,
    key: ItemKey,
    props: DisplayProps,
) {
    let Some(item) = tree.item(key) else { return };
    let ItemKind::Numeric { edit, .. } = &item.kind else {
        return;
    };
    put_title(store, screen, &item.text);
    let buf = edit.buf.clone();
    build_edit_row(store, screen, props, edit, &buf, item.error.message());
}

fn build_alpha(
    store: &mut EntityStore,
    screen: ScreenKey,
    tree: &MenuTree,
    key: ItemKey,
    props: DisplayProps,
) {
    let Some(item) = tree.item(key) else { return };
    let ItemKind::Alpha {
        password_char,
        edit,
        ..
    } = &item.kind
    else {
        return;
    };
    put_title(store, screen, &item.text);
    let shown = match password_char {
        Some(mask) => mask.to_string().repeat(edit.buf.chars().count()),
        None => edit.buf.clone(),
    };
    build_edit_row(store, screen, props, edit, &shown, item.error.message());
}

fn build_ip(
    store: &mut EntityStore,
    screen: ScreenKey,
    tree: &MenuTree,
    key: ItemKey,
    props: DisplayProps,
) {
    let Some(item) = tree.item(key) else { return };
    let ItemKind::Ip { edit, .. } = &item.kind else {
        return;
    };
    put_title(store, screen, &item.text);
    let buf = edit.buf.clone();
    build_edit_row(store, screen, props, edit, &buf, item.error.message());
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_driver::DisplayProps;
    use core_model::{ClientKey, ScreenOwner};
    use slotmap::SlotMap;

    fn setup() -> (EntityStore, ScreenKey, MenuTree, ClientKey) {
        let mut store = EntityStore::new();
        let screen = store
            .create_screen(ScreenOwner::Server, "_menu_", 20, 4)
            .unwrap();
        let tree = MenuTree::new();
        let mut map: SlotMap<ClientKey, ()> = SlotMap::with_key();
        let c = map.insert(());
        (store, screen, tree, c)
    }

    fn props() -> DisplayProps {
        DisplayProps::new(20, 4)
    }

    #[test]
    fn closed_menu_empties_the_screen() {
        let (mut store, screen, mut tree, _c) = setup();
        build(&mut store, screen, &mut tree, props());
        assert_eq!(store.screen(screen).unwrap().widgets.len(), 0);
    }

    #[test]
    fn menu_list_gets_title_selector_and_rows() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "a", "action", "First").unwrap();
        tree.add_item(c, "cli", "", "b", "action", "Second").unwrap();
        let root = tree.client_root(c).unwrap();
        tree.goto(root);
        build(&mut store, screen, &mut tree, props());
        assert!(store.widget_by_id(screen, "menu_title").is_some());
        assert!(store.widget_by_id(screen, "sel0").is_some());
        assert!(store.widget_by_id(screen, "line0").is_some());
        assert!(store.widget_by_id(screen, "line1").is_some());
        assert!(store.widget_by_id(screen, "scroll_down").is_none());
    }

    #[test]
    fn long_menus_scroll_and_show_arrows() {
        let (mut store, screen, mut tree, c) = setup();
        for i in 0..6 {
            tree.add_item(c, "cli", "", &format!("i{i}"), "action", &format!("Item {i}"))
                .unwrap();
        }
        let root = tree.client_root(c).unwrap();
        tree.goto(root);
        if let Some(ItemKind::Menu { selected, .. }) = tree.item_mut(root).map(|i| &mut i.kind) {
            *selected = 5;
        }
        build(&mut store, screen, &mut tree, props());
        // page = 3 rows; selection at the bottom forces scroll = 3
        assert!(store.widget_by_id(screen, "scroll_up").is_some());
        assert!(store.widget_by_id(screen, "scroll_down").is_none());
        match &store
            .widget(store.widget_by_id(screen, "line2").unwrap())
            .unwrap()
            .kind
        {
            WidgetKind::String { text } => assert_eq!(text, "Item 5"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn checkbox_rows_show_state_icons() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "cb", "checkbox", "Flag").unwrap();
        let root = tree.client_root(c).unwrap();
        tree.goto(root);
        build(&mut store, screen, &mut tree, props());
        let val = store.widget_by_id(screen, "val0").unwrap();
        match &store.widget(val).unwrap().kind {
            WidgetKind::Icon { icon } => assert_eq!(*icon, Icon::CheckboxOff),
            _ => unreachable!(),
        }
    }

    #[test]
    fn numeric_editor_places_the_cursor_on_the_edit_digit() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "n", "numeric", "Port").unwrap();
        let n = tree.find(Some(c), "n").unwrap();
        tree.item_mut(n).unwrap().set_option("value", "8080").unwrap();
        tree.goto(n);
        if let Some(ItemKind::Numeric { edit, .. }) = tree.item_mut(n).map(|i| &mut i.kind) {
            edit.pos = 2;
        }
        build(&mut store, screen, &mut tree, props());
        let s = store.screen(screen).unwrap();
        assert_eq!(s.cursor, CursorKind::On);
        assert_eq!((s.cursor_x, s.cursor_y), (3, 2));
        match &store
            .widget(store.widget_by_id(screen, "edit_buf").unwrap())
            .unwrap()
            .kind
        {
            WidgetKind::String { text } => assert_eq!(text, "8080"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn password_alpha_masks_the_display_only() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "pw", "alpha", "Secret").unwrap();
        let k = tree.find(Some(c), "pw").unwrap();
        let item = tree.item_mut(k).unwrap();
        item.set_option("password_char", "*").unwrap();
        item.set_option("value", "abc").unwrap();
        tree.goto(k);
        build(&mut store, screen, &mut tree, props());
        match &store
            .widget(store.widget_by_id(screen, "edit_buf").unwrap())
            .unwrap()
            .kind
        {
            WidgetKind::String { text } => assert_eq!(text, "***"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn slider_editor_builds_bar_and_labels() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "s", "slider", "Volume").unwrap();
        let k = tree.find(Some(c), "s").unwrap();
        let item = tree.item_mut(k).unwrap();
        item.set_option("maxvalue", "200").unwrap();
        item.set_option("value", "100").unwrap();
        tree.goto(k);
        build(&mut store, screen, &mut tree, props());
        match &store
            .widget(store.widget_by_id(screen, "slider_bar").unwrap())
            .unwrap()
            .kind
        {
            WidgetKind::Pbar { promille, .. } => assert_eq!(*promille, 500),
            _ => unreachable!(),
        }
        assert!(store.widget_by_id(screen, "slider_min").is_some());
        assert!(store.widget_by_id(screen, "slider_value").is_some());
    }

    #[test]
    fn error_row_appears_after_failed_commit() {
        let (mut store, screen, mut tree, c) = setup();
        tree.add_item(c, "cli", "", "n", "numeric", "Port").unwrap();
        let n = tree.find(Some(c), "n").unwrap();
        tree.item_mut(n).unwrap().set_option("minvalue", "10").unwrap();
        tree.goto(n);
        // buffer "0" commits below min
        crate::input::process_key(&mut tree, crate::input::MenuToken::Enter);
        build(&mut store, screen, &mut tree, props());
        match &store
            .widget(store.widget_by_id(screen, "edit_err").unwrap())
            .unwrap()
            .kind
        {
            WidgetKind::String { text } => assert_eq!(text, "out of range"),
            _ => unreachable!(),
        }
    }
}
