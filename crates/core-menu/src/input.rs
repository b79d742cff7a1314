//! Menu key processing: one logical token in, state changes and
//! `menuevent`s out.
//!
//! Every state-changing token emits exactly one event to the owning
//! client. Commit-time validation failures (numeric range, alpha length,
//! ip verification) never travel on the socket; they land in the item's
//! `error` field and the editor refuses to exit.

use core_model::ScreenKey;

use crate::{
    ip,
    item::{EditError, ItemKind, NavTarget},
    tree::{MenuEvent, MenuEventKind, MenuTree, Resolution},
    ItemKey,
};

/// Logical menu keys after config-table translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuToken {
    Menu,
    Enter,
    Up,
    Down,
    Left,
    Right,
}

/// What one key press did.
#[derive(Debug, Default)]
pub struct MenuOutcome {
    pub events: Vec<MenuEvent>,
    /// The menu just closed entirely.
    pub closed: bool,
    /// A screens-menu entry was chosen; the scheduler should display this.
    pub goto_screen: Option<ScreenKey>,
}

/// Process one token against the tree. The caller rebuilds the menu screen
/// layout afterwards.
pub fn process_key(tree: &mut MenuTree, token: MenuToken) -> MenuOutcome {
    let mut out = MenuOutcome::default();
    let Some(active) = tree.active() else {
        if token == MenuToken::Menu {
            out.events = tree.open();
        }
        return out;
    };
    let kind_is_menu = tree
        .item(active)
        .map(|i| i.kind.is_menu())
        .unwrap_or(false);
    if kind_is_menu {
        process_menu_list(tree, active, token, &mut out);
    } else {
        process_editor(tree, active, token, &mut out);
    }
    out
}

// --- menu lists -----------------------------------------------------------

fn process_menu_list(tree: &mut MenuTree, menu: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    let visible = tree.visible_children(menu);
    match token {
        MenuToken::Up | MenuToken::Down => {
            if visible.is_empty() {
                return;
            }
            if let Some(ItemKind::Menu { selected, .. }) =
                tree.item_mut(menu).map(|i| &mut i.kind)
            {
                let len = visible.len();
                *selected = if token == MenuToken::Down {
                    (*selected + 1) % len
                } else {
                    (*selected + len - 1) % len
                };
            }
        }
        MenuToken::Enter => {
            let Some(&child) = selected_child(tree, menu, &visible) else {
                return;
            };
            enter_child(tree, child, out);
        }
        MenuToken::Right | MenuToken::Left => {
            let Some(&child) = selected_child(tree, menu, &visible) else {
                return;
            };
            cycle_in_place(tree, child, token == MenuToken::Right, out);
        }
        MenuToken::Menu => {
            ascend(tree, menu, out);
        }
    }
}

fn selected_child<'a>(
    tree: &MenuTree,
    menu: ItemKey,
    visible: &'a [ItemKey],
) -> Option<&'a ItemKey> {
    match tree.item(menu).map(|i| &i.kind) {
        Some(ItemKind::Menu { selected, .. }) => visible.get(*selected),
        _ => None,
    }
}

fn enter_child(tree: &mut MenuTree, child: ItemKey, out: &mut MenuOutcome) {
    // screens-menu entries switch the display instead of navigating
    if let Some(screen) = tree.screen_for_item(child) {
        out.goto_screen = Some(screen);
        out.events.extend(tree.close());
        out.closed = true;
        return;
    }
    let Some(kind) = tree.item(child).map(|i| i.kind.kind_name()) else {
        return;
    };
    match kind {
        "menu" => {
            out.events.extend(tree.goto(child));
        }
        "action" => {
            if let Some(e) = tree.event(MenuEventKind::Select, child) {
                out.events.push(e);
            }
            let successor = item_successor(tree, child).unwrap_or(NavTarget::Stay);
            follow(tree, child, &successor, out);
        }
        "checkbox" | "ring" => {
            cycle_in_place(tree, child, true, out);
        }
        _ => {
            out.events.extend(tree.goto(child));
        }
    }
}

/// Checkbox/ring editing from the parent list.
fn cycle_in_place(tree: &mut MenuTree, child: ItemKey, forward: bool, out: &mut MenuOutcome) {
    let Some(item) = tree.item_mut(child) else { return };
    let changed = match &mut item.kind {
        ItemKind::Checkbox { value, allow_gray } => {
            *value = if forward {
                value.next(*allow_gray)
            } else {
                value.prev(*allow_gray)
            };
            true
        }
        ItemKind::Ring { index, strings } => {
            if strings.is_empty() {
                false
            } else {
                let len = strings.len();
                *index = if forward {
                    (*index + 1) % len
                } else {
                    (*index + len - 1) % len
                };
                true
            }
        }
        _ => false,
    };
    if changed {
        if let Some(e) = tree.event(MenuEventKind::Update, child) {
            out.events.push(e);
        }
    }
}

// --- editor screens -------------------------------------------------------

fn process_editor(tree: &mut MenuTree, key: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    let Some(kind) = tree.item(key).map(|i| i.kind.kind_name()) else {
        return;
    };
    match kind {
        "slider" => slider_key(tree, key, token, out),
        "numeric" => numeric_key(tree, key, token, out),
        "alpha" => alpha_key(tree, key, token, out),
        "ip" => ip_key(tree, key, token, out),
        // a simple item can only become active transiently; treat the menu
        // token as ascend and ignore the rest
        _ => {
            if token == MenuToken::Menu {
                ascend(tree, key, out);
            }
        }
    }
}

fn slider_key(tree: &mut MenuTree, key: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    match token {
        MenuToken::Up | MenuToken::Right | MenuToken::Down | MenuToken::Left => {
            let increase = matches!(token, MenuToken::Up | MenuToken::Right);
            let mut changed = false;
            if let Some(ItemKind::Slider {
                value, min, max, step, ..
            }) = tree.item_mut(key).map(|i| &mut i.kind)
            {
                let next = if increase {
                    value.saturating_add(*step).min(*max)
                } else {
                    value.saturating_sub(*step).max(*min)
                };
                changed = next != *value;
                *value = next;
            }
            if changed {
                let kind = if increase {
                    MenuEventKind::Plus
                } else {
                    MenuEventKind::Minus
                };
                if let Some(e) = tree.event(kind, key) {
                    out.events.push(e);
                }
            }
        }
        MenuToken::Enter => {
            let successor = item_successor(tree, key).unwrap_or(NavTarget::Close);
            follow(tree, key, &successor, out);
        }
        MenuToken::Menu => {
            let predecessor = item_predecessor(tree, key).unwrap_or(NavTarget::Close);
            follow(tree, key, &predecessor, out);
        }
    }
}

/// Characters the numeric editor cycles through at a position: digits,
/// plus a sign at position 0 when the range allows negatives.
fn cycle_numeric_char(c: char, up: bool, allow_sign: bool) -> char {
    let mut set: Vec<char> = ('0'..='9').collect();
    if allow_sign {
        set.push('-');
    }
    let idx = set.iter().position(|&s| s == c).unwrap_or(0);
    let len = set.len();
    let next = if up { (idx + 1) % len } else { (idx + len - 1) % len };
    set[next]
}

fn numeric_key(tree: &mut MenuTree, key: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    match token {
        MenuToken::Up | MenuToken::Down => {
            if let Some(ItemKind::Numeric { min, edit, .. }) =
                tree.item_mut(key).map(|i| &mut i.kind)
            {
                let allow_sign = *min < 0 && edit.pos == 0;
                if let Some(c) = edit.buf.chars().nth(edit.pos) {
                    let next = cycle_numeric_char(c, token == MenuToken::Up, allow_sign);
                    edit.buf
                        .replace_range(char_range(&edit.buf, edit.pos), &next.to_string());
                }
            }
        }
        MenuToken::Right => {
            if let Some(ItemKind::Numeric { min, max, edit, .. }) =
                tree.item_mut(key).map(|i| &mut i.kind)
            {
                let capacity = max.to_string().len().max(min.to_string().len());
                if edit.pos + 1 < edit.buf.len() {
                    edit.pos += 1;
                } else if edit.buf.len() < capacity {
                    edit.buf.push('0');
                    edit.pos = edit.buf.len() - 1;
                }
            }
        }
        MenuToken::Left => {
            if let Some(ItemKind::Numeric { edit, .. }) = tree.item_mut(key).map(|i| &mut i.kind) {
                edit.pos = edit.pos.saturating_sub(1);
            }
        }
        MenuToken::Enter => {
            let mut committed = false;
            if let Some(item) = tree.item_mut(key) {
                if let ItemKind::Numeric {
                    value, min, max, edit,
                } = &mut item.kind
                {
                    match edit.buf.parse::<i64>() {
                        Ok(v) if v >= *min && v <= *max => {
                            *value = v;
                            item.error = EditError::None;
                            committed = true;
                        }
                        _ => {
                            item.error = EditError::OutOfRange;
                        }
                    }
                }
            }
            if committed {
                if let Some(e) = tree.event(MenuEventKind::Update, key) {
                    out.events.push(e);
                }
                let successor = item_successor(tree, key).unwrap_or(NavTarget::Close);
                follow(tree, key, &successor, out);
            }
        }
        MenuToken::Menu => {
            let predecessor = item_predecessor(tree, key).unwrap_or(NavTarget::Close);
            follow(tree, key, &predecessor, out);
        }
    }
}

/// Character class the alpha editor cycles through, in display order.
fn alpha_charset(
    allow_caps: bool,
    allow_noncaps: bool,
    allow_numbers: bool,
    extra: &str,
) -> Vec<char> {
    let mut set = Vec::new();
    if allow_caps {
        set.extend('A'..='Z');
    }
    if allow_noncaps {
        set.extend('a'..='z');
    }
    if allow_numbers {
        set.extend('0'..='9');
    }
    let extra_chars: Vec<char> = extra.chars().filter(|c| !set.contains(c)).collect();
    set.extend(extra_chars);
    set
}

fn alpha_key(tree: &mut MenuTree, key: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    match token {
        MenuToken::Up | MenuToken::Down => {
            if let Some(ItemKind::Alpha {
                allow_caps,
                allow_noncaps,
                allow_numbers,
                allowed_extra,
                maxlength,
                edit,
                ..
            }) = tree.item_mut(key).map(|i| &mut i.kind)
            {
                let set = alpha_charset(*allow_caps, *allow_noncaps, *allow_numbers, allowed_extra);
                if set.is_empty() {
                    return;
                }
                if edit.pos < edit.buf.chars().count() {
                    let current = edit.buf.chars().nth(edit.pos).unwrap();
                    let idx = set.iter().position(|&c| c == current).unwrap_or(0);
                    let len = set.len();
                    let next = if token == MenuToken::Up {
                        set[(idx + 1) % len]
                    } else {
                        set[(idx + len - 1) % len]
                    };
                    edit.buf
                        .replace_range(char_range(&edit.buf, edit.pos), &next.to_string());
                } else if edit.buf.chars().count() < *maxlength {
                    // cursor on the append slot grows the string
                    edit.buf.push(set[0]);
                }
            }
        }
        MenuToken::Right => {
            if let Some(ItemKind::Alpha { maxlength, edit, .. }) =
                tree.item_mut(key).map(|i| &mut i.kind)
            {
                let len = edit.buf.chars().count();
                edit.pos = (edit.pos + 1).min(len).min(maxlength.saturating_sub(1));
            }
        }
        MenuToken::Left => {
            if let Some(ItemKind::Alpha { edit, .. }) = tree.item_mut(key).map(|i| &mut i.kind) {
                edit.pos = edit.pos.saturating_sub(1);
            }
        }
        MenuToken::Enter => {
            let mut committed = false;
            if let Some(item) = tree.item_mut(key) {
                if let ItemKind::Alpha {
                    value,
                    minlength,
                    edit,
                    ..
                } = &mut item.kind
                {
                    if edit.buf.chars().count() >= *minlength {
                        *value = edit.buf.clone();
                        item.error = EditError::None;
                        committed = true;
                    } else {
                        item.error = EditError::OutOfRange;
                    }
                }
            }
            if committed {
                if let Some(e) = tree.event(MenuEventKind::Update, key) {
                    out.events.push(e);
                }
                let successor = item_successor(tree, key).unwrap_or(NavTarget::Close);
                follow(tree, key, &successor, out);
            }
        }
        MenuToken::Menu => {
            let predecessor = item_predecessor(tree, key).unwrap_or(NavTarget::Close);
            follow(tree, key, &predecessor, out);
        }
    }
}

fn ip_key(tree: &mut MenuTree, key: ItemKey, token: MenuToken, out: &mut MenuOutcome) {
    match token {
        MenuToken::Up | MenuToken::Down => {
            if let Some(ItemKind::Ip { v6, edit, .. }) = tree.item_mut(key).map(|i| &mut i.kind) {
                let fam = ip::family(*v6);
                if let Some(c) = edit.buf.chars().nth(edit.pos) {
                    if ip::is_digit(c, fam) {
                        let next = ip::cycle_digit(c, fam, token == MenuToken::Up);
                        edit.buf
                            .replace_range(char_range(&edit.buf, edit.pos), &next.to_string());
                    }
                }
            }
        }
        MenuToken::Right | MenuToken::Left => {
            if let Some(ItemKind::Ip { edit, .. }) = tree.item_mut(key).map(|i| &mut i.kind) {
                if let Some(pos) = ip::step_cursor(&edit.buf, edit.pos, token == MenuToken::Right) {
                    edit.pos = pos;
                }
            }
        }
        MenuToken::Enter => {
            let mut committed = false;
            if let Some(item) = tree.item_mut(key) {
                if let ItemKind::Ip { value, v6, edit } = &mut item.kind {
                    match ip::normalize(&edit.buf, *v6) {
                        Some(normalized) => {
                            *value = normalized;
                            item.error = EditError::None;
                            committed = true;
                        }
                        None => {
                            item.error = EditError::InvalidAddress;
                        }
                    }
                }
            }
            if committed {
                if let Some(e) = tree.event(MenuEventKind::Update, key) {
                    out.events.push(e);
                }
                let successor = item_successor(tree, key).unwrap_or(NavTarget::Close);
                follow(tree, key, &successor, out);
            }
        }
        MenuToken::Menu => {
            let predecessor = item_predecessor(tree, key).unwrap_or(NavTarget::Close);
            follow(tree, key, &predecessor, out);
        }
    }
}

// --- navigation helpers ---------------------------------------------------

fn item_successor(tree: &MenuTree, key: ItemKey) -> Option<NavTarget> {
    tree.item(key).and_then(|i| i.successor.clone())
}

fn item_predecessor(tree: &MenuTree, key: ItemKey) -> Option<NavTarget> {
    tree.item(key).and_then(|i| i.predecessor.clone())
}

fn follow(tree: &mut MenuTree, from: ItemKey, target: &NavTarget, out: &mut MenuOutcome) {
    match tree.resolve_target(from, target) {
        Resolution::CloseAll => {
            out.events.extend(tree.close());
            out.closed = true;
        }
        Resolution::Ascend => ascend(tree, from, out),
        Resolution::Stay => {}
        Resolution::Goto(key) => out.events.extend(tree.goto(key)),
    }
}

fn ascend(tree: &mut MenuTree, from: ItemKey, out: &mut MenuOutcome) {
    match tree.item(from).and_then(|i| i.parent) {
        Some(parent) => out.events.extend(tree.goto(parent)),
        None => {
            out.events.extend(tree.close());
            out.closed = true;
        }
    }
}

fn char_range(s: &str, pos: usize) -> std::ops::Range<usize> {
    let start = s
        .char_indices()
        .nth(pos)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let end = s
        .char_indices()
        .nth(pos + 1)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MenuEventKind;
    use core_model::ClientKey;
    use proptest::prelude::*;
    use slotmap::SlotMap;

    fn client_key() -> ClientKey {
        let mut map: SlotMap<ClientKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn open_menu(tree: &mut MenuTree) {
        let out = process_key(tree, MenuToken::Menu);
        assert!(tree.is_open());
        assert!(!out.closed);
    }

    #[test]
    fn menu_key_opens_and_menu_at_root_closes() {
        let mut t = MenuTree::new();
        open_menu(&mut t);
        assert_eq!(t.active(), Some(t.root()));
        let out = process_key(&mut t, MenuToken::Menu);
        assert!(out.closed);
        assert!(!t.is_open());
    }

    #[test]
    fn selection_wraps_both_ways() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "action", "A").unwrap();
        t.add_item(c, "cli", "", "b", "action", "B").unwrap();
        let root = t.client_root(c).unwrap();
        t.goto(root);
        // two children: down, down wraps to 0
        process_key(&mut t, MenuToken::Down);
        process_key(&mut t, MenuToken::Down);
        match &t.item(root).unwrap().kind {
            ItemKind::Menu { selected, .. } => assert_eq!(*selected, 0),
            _ => unreachable!(),
        }
        process_key(&mut t, MenuToken::Up);
        match &t.item(root).unwrap().kind {
            ItemKind::Menu { selected, .. } => assert_eq!(*selected, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn hidden_items_are_skipped_by_selection() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "action", "A").unwrap();
        t.add_item(c, "cli", "", "h", "action", "H").unwrap();
        let h = t.find(Some(c), "h").unwrap();
        t.item_mut(h).unwrap().set_option("is_hidden", "true").unwrap();
        let root = t.client_root(c).unwrap();
        assert_eq!(t.visible_children(root).len(), 1);
    }

    #[test]
    fn action_enter_emits_select_and_stays_by_default() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "action", "A").unwrap();
        let root = t.client_root(c).unwrap();
        t.goto(root);
        let out = process_key(&mut t, MenuToken::Enter);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].kind, MenuEventKind::Select);
        assert_eq!(out.events[0].item_id, "a");
        assert_eq!(t.active(), Some(root));
    }

    #[test]
    fn action_with_quit_successor_closes_the_menu() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "action", "A").unwrap();
        let a = t.find(Some(c), "a").unwrap();
        t.item_mut(a).unwrap().set_option("next", "_quit_").unwrap();
        t.goto(t.client_root(c).unwrap());
        let out = process_key(&mut t, MenuToken::Enter);
        assert!(out.closed);
        assert!(!t.is_open());
    }

    #[test]
    fn checkbox_cycles_with_enter_and_arrows() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "cb", "checkbox", "Flag").unwrap();
        t.goto(t.client_root(c).unwrap());
        let out = process_key(&mut t, MenuToken::Enter);
        assert_eq!(out.events[0].kind, MenuEventKind::Update);
        assert_eq!(out.events[0].payload.as_deref(), Some("on"));
        let out = process_key(&mut t, MenuToken::Left);
        assert_eq!(out.events[0].payload.as_deref(), Some("off"));
    }

    #[test]
    fn ring_advances_modulo_length() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "r", "ring", "Mode").unwrap();
        let r = t.find(Some(c), "r").unwrap();
        t.item_mut(r).unwrap().set_option("strings", "a\tb\tc").unwrap();
        t.goto(t.client_root(c).unwrap());
        for expected in ["1", "2", "0", "1"] {
            let out = process_key(&mut t, MenuToken::Right);
            assert_eq!(out.events[0].payload.as_deref(), Some(expected));
        }
        let out = process_key(&mut t, MenuToken::Left);
        assert_eq!(out.events[0].payload.as_deref(), Some("0"));
    }

    fn slider_tree() -> (MenuTree, ItemKey) {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "s", "slider", "Volume").unwrap();
        let s = t.find(Some(c), "s").unwrap();
        let item = t.item_mut(s).unwrap();
        item.set_option("minvalue", "0").unwrap();
        item.set_option("maxvalue", "10").unwrap();
        item.set_option("stepsize", "3").unwrap();
        item.set_option("value", "5").unwrap();
        t.goto(s);
        (t, s)
    }

    #[test]
    fn slider_clamps_and_reports_plus_minus() {
        let (mut t, s) = slider_tree();
        let out = process_key(&mut t, MenuToken::Right);
        assert_eq!(out.events[0].kind, MenuEventKind::Plus);
        assert_eq!(out.events[0].payload.as_deref(), Some("8"));
        let out = process_key(&mut t, MenuToken::Up);
        assert_eq!(out.events[0].payload.as_deref(), Some("10")); // clamped
        let out = process_key(&mut t, MenuToken::Up);
        assert!(out.events.is_empty()); // no event when nothing changed
        let out = process_key(&mut t, MenuToken::Down);
        assert_eq!(out.events[0].kind, MenuEventKind::Minus);
        assert_eq!(out.events[0].payload.as_deref(), Some("7"));
        let _ = s;
    }

    proptest! {
        /// Slider invariant: any press sequence keeps min <= value <= max.
        #[test]
        fn slider_stays_in_bounds(presses in proptest::collection::vec(0u8..4, 0..100)) {
            let (mut t, s) = slider_tree();
            for p in presses {
                let token = match p {
                    0 => MenuToken::Up,
                    1 => MenuToken::Down,
                    2 => MenuToken::Left,
                    _ => MenuToken::Right,
                };
                process_key(&mut t, token);
                match &t.item(s).unwrap().kind {
                    ItemKind::Slider { value, min, max, .. } => {
                        prop_assert!(value >= min && value <= max);
                    }
                    _ => unreachable!(),
                }
            }
        }
    }

    fn numeric_tree(value: &str) -> (MenuTree, ItemKey) {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "n1", "numeric", "Port").unwrap();
        let n = t.find(Some(c), "n1").unwrap();
        let item = t.item_mut(n).unwrap();
        item.set_option("minvalue", "1").unwrap();
        item.set_option("maxvalue", "65535").unwrap();
        item.set_option("value", value).unwrap();
        t.goto(n);
        (t, n)
    }

    #[test]
    fn numeric_digit_edit_commits_and_returns_to_parent() {
        let (mut t, n) = numeric_tree("8080");
        // move the cursor to the third digit and decrement it: 8080 -> 8070
        process_key(&mut t, MenuToken::Right);
        process_key(&mut t, MenuToken::Right);
        process_key(&mut t, MenuToken::Down);
        let out = process_key(&mut t, MenuToken::Enter);
        assert_eq!(out.events[0].kind, MenuEventKind::Update);
        assert_eq!(out.events[0].payload.as_deref(), Some("8070"));
        // default successor is one level up: back to the client menu
        assert_ne!(t.active(), Some(n));
    }

    #[test]
    fn numeric_out_of_range_commit_refuses_to_exit() {
        let (mut t, n) = numeric_tree("9");
        // 9 -> 0 via Up cycling past the top, then commit: 0 < min
        process_key(&mut t, MenuToken::Up);
        let out = process_key(&mut t, MenuToken::Enter);
        assert!(out.events.is_empty());
        assert_eq!(t.active(), Some(n));
        let item = t.item(n).unwrap();
        assert_eq!(item.error, EditError::OutOfRange);
        // stored value unchanged
        assert_eq!(item.value_text().as_deref(), Some("9"));
    }

    #[test]
    fn numeric_right_extends_within_capacity() {
        let (mut t, n) = numeric_tree("9");
        process_key(&mut t, MenuToken::Right); // appends a digit
        match &t.item(n).unwrap().kind {
            ItemKind::Numeric { edit, .. } => {
                assert_eq!(edit.buf, "90");
                assert_eq!(edit.pos, 1);
            }
            _ => unreachable!(),
        }
    }

    proptest! {
        /// Commit succeeds iff min <= parsed <= max; on failure the value
        /// is unchanged and the error code is set.
        #[test]
        fn numeric_commit_iff_in_range(target in 0u32..200_000) {
            let (mut t, n) = numeric_tree("42");
            if let Some(ItemKind::Numeric { edit, .. }) = t.item_mut(n).map(|i| &mut i.kind) {
                edit.buf = target.to_string();
            }
            let out = process_key(&mut t, MenuToken::Enter);
            let in_range = (1..=65535).contains(&target);
            if in_range {
                prop_assert_eq!(out.events.len(), 1);
                let target_str = target.to_string();
                let value_text = t.item(n).unwrap().value_text();
                prop_assert_eq!(value_text.as_deref(), Some(target_str.as_str()));
            } else {
                prop_assert!(out.events.is_empty());
                let value_text = t.item(n).unwrap().value_text();
                prop_assert_eq!(value_text.as_deref(), Some("42"));
                prop_assert_eq!(t.item(n).unwrap().error, EditError::OutOfRange);
            }
        }
    }

    #[test]
    fn alpha_cycles_through_the_composed_charset() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "alpha", "Name").unwrap();
        let a = t.find(Some(c), "a").unwrap();
        let item = t.item_mut(a).unwrap();
        item.set_option("allow_caps", "false").unwrap();
        item.set_option("allow_noncaps", "false").unwrap();
        item.set_option("allow_numbers", "true").unwrap();
        item.set_option("allowed_extra", ".").unwrap();
        item.set_option("value", "1").unwrap();
        t.goto(a);
        process_key(&mut t, MenuToken::Up); // '1' -> '2'
        match &t.item(a).unwrap().kind {
            ItemKind::Alpha { edit, .. } => assert_eq!(edit.buf, "2"),
            _ => unreachable!(),
        }
        // append via the cursor slot past the end
        process_key(&mut t, MenuToken::Right);
        process_key(&mut t, MenuToken::Up);
        match &t.item(a).unwrap().kind {
            ItemKind::Alpha { edit, .. } => assert_eq!(edit.buf, "20"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn alpha_minlength_gates_the_commit() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "a", "alpha", "Name").unwrap();
        let a = t.find(Some(c), "a").unwrap();
        t.item_mut(a).unwrap().set_option("minlength", "2").unwrap();
        t.goto(a);
        let out = process_key(&mut t, MenuToken::Enter);
        assert!(out.events.is_empty());
        assert_eq!(t.item(a).unwrap().error, EditError::OutOfRange);
    }

    #[test]
    fn ip_editor_validates_on_commit() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "addr", "ip", "Addr").unwrap();
        let k = t.find(Some(c), "addr").unwrap();
        t.item_mut(k).unwrap().set_option("value", "10.0.0.250").unwrap();
        t.goto(k);
        // buffer 010.000.000.250: walk to the tens digit of the last field
        // and push it past 255
        if let Some(ItemKind::Ip { edit, .. }) = t.item_mut(k).map(|i| &mut i.kind) {
            edit.pos = 13; // '5' in "...250"
        }
        process_key(&mut t, MenuToken::Up); // 250 -> 260
        let out = process_key(&mut t, MenuToken::Enter);
        assert!(out.events.is_empty());
        let item = t.item(k).unwrap();
        assert_eq!(item.error, EditError::InvalidAddress);
        assert_eq!(item.value_text().as_deref(), Some("10.0.0.250"));
        // fix it back down and commit
        process_key(&mut t, MenuToken::Down);
        let out = process_key(&mut t, MenuToken::Enter);
        assert_eq!(out.events.len(), 2); // update + leave on exit
        assert_eq!(out.events[0].kind, MenuEventKind::Update);
        assert_eq!(out.events[0].payload.as_deref(), Some("10.0.0.250"));
    }

    #[test]
    fn ip_cursor_skips_separators() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "addr", "ip", "Addr").unwrap();
        let k = t.find(Some(c), "addr").unwrap();
        t.goto(k);
        process_key(&mut t, MenuToken::Right);
        process_key(&mut t, MenuToken::Right);
        process_key(&mut t, MenuToken::Right); // 0,1,2 then hop the dot
        match &t.item(k).unwrap().kind {
            ItemKind::Ip { edit, .. } => assert_eq!(edit.pos, 4),
            _ => unreachable!(),
        }
    }

    #[test]
    fn wizard_successor_chains_editors() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "n1", "numeric", "Step 1").unwrap();
        t.add_item(c, "cli", "", "n2", "numeric", "Step 2").unwrap();
        let n1 = t.find(Some(c), "n1").unwrap();
        let n2 = t.find(Some(c), "n2").unwrap();
        t.item_mut(n1).unwrap().set_option("next", "n2").unwrap();
        t.goto(n1);
        let out = process_key(&mut t, MenuToken::Enter);
        assert_eq!(t.active(), Some(n2));
        // update for n1, leave n1, enter n2
        let kinds: Vec<_> = out.events.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&MenuEventKind::Update));
        assert!(kinds.contains(&MenuEventKind::Enter));
    }
}
