//! The menu tree: item arena, client subtrees, the screens menu, and the
//! active-item pointer.
//!
//! The server owns the root menu and a "Screens" submenu with one entry per
//! live screen. Each named client gets a root grafted under the main root
//! on its first `menu_add_item`; its items live in that subtree and are
//! scoped to the client for id lookup.

use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

use core_model::{ClientKey, ScreenKey};

use crate::{
    ip,
    item::{EditError, EditState, ItemKind, MenuItem, NavTarget, OptionError},
    ItemKey,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MenuError {
    #[error("unknown menu item \"{0}\"")]
    UnknownItem(String),
    #[error("menu item \"{0}\" already exists")]
    DuplicateItem(String),
    #[error("item \"{0}\" is not a menu")]
    NotAMenu(String),
    #[error("invalid item type \"{0}\"")]
    BadKind(String),
    #[error("menu item \"{0}\" belongs to another client")]
    Denied(String),
    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Event kinds carried by `menuevent` lines, in wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEventKind {
    Select,
    Update,
    Plus,
    Minus,
    Enter,
    Leave,
}

impl MenuEventKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Update => "update",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Enter => "enter",
            Self::Leave => "leave",
        }
    }
}

/// One `menuevent` to deliver to an owning client. Server-owned items
/// produce no event (client is `None` and the caller drops them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEvent {
    pub client: Option<ClientKey>,
    pub kind: MenuEventKind,
    pub item_id: String,
    pub payload: Option<String>,
}

pub struct MenuTree {
    items: SlotMap<ItemKey, MenuItem>,
    root: ItemKey,
    screens_menu: ItemKey,
    client_roots: SecondaryMap<ClientKey, ItemKey>,
    screen_items: HashMap<ScreenKey, ItemKey>,
    custom_main: Option<ItemKey>,
    active: Option<ItemKey>,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuTree {
    pub fn new() -> Self {
        let mut items = SlotMap::with_key();
        let root = items.insert(MenuItem::new(
            "_main_",
            "Main menu",
            None,
            ItemKind::from_kind_name("menu").unwrap(),
        ));
        let mut screens = MenuItem::new(
            "_screens_",
            "Screens",
            None,
            ItemKind::from_kind_name("menu").unwrap(),
        );
        screens.parent = Some(root);
        let screens_menu = items.insert(screens);
        if let ItemKind::Menu { children, .. } = &mut items[root].kind {
            children.push(screens_menu);
        }
        Self {
            items,
            root,
            screens_menu,
            client_roots: SecondaryMap::new(),
            screen_items: HashMap::new(),
            custom_main: None,
            active: None,
        }
    }

    // --- basic access -----------------------------------------------------

    pub fn root(&self) -> ItemKey {
        self.root
    }

    pub fn active(&self) -> Option<ItemKey> {
        self.active
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn item(&self, key: ItemKey) -> Option<&MenuItem> {
        self.items.get(key)
    }

    pub fn item_mut(&mut self, key: ItemKey) -> Option<&mut MenuItem> {
        self.items.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Children of a menu that are eligible for display and selection.
    pub fn visible_children(&self, menu: ItemKey) -> Vec<ItemKey> {
        match self.items.get(menu).map(|i| &i.kind) {
            Some(ItemKind::Menu { children, .. }) => children
                .iter()
                .copied()
                .filter(|&c| self.items.get(c).is_some_and(|i| !i.hidden))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Walk up to the root, proving reachability (test support).
    pub fn reachable_from_root(&self, key: ItemKey) -> bool {
        let mut cur = Some(key);
        let mut hops = 0;
        while let Some(k) = cur {
            if k == self.root {
                return true;
            }
            cur = self.items.get(k).and_then(|i| i.parent);
            hops += 1;
            if hops > self.items.len() {
                return false;
            }
        }
        false
    }

    // --- lookup -----------------------------------------------------------

    /// Find an item by id within one client's scope (`None` = server scope).
    pub fn find(&self, client: Option<ClientKey>, id: &str) -> Option<ItemKey> {
        self.items
            .iter()
            .find(|(_, item)| item.owner == client && item.id == id)
            .map(|(k, _)| k)
    }

    /// Find an item by id in any scope (`PermissiveGoto`).
    pub fn find_anywhere(&self, id: &str) -> Option<ItemKey> {
        self.items
            .iter()
            .find(|(_, item)| item.id == id)
            .map(|(k, _)| k)
    }

    pub fn client_root(&self, client: ClientKey) -> Option<ItemKey> {
        self.client_roots.get(client).copied()
    }

    // --- construction -----------------------------------------------------

    /// Client root menu, created under the main root on first use. `name`
    /// labels the entry in the main menu.
    pub fn ensure_client_root(&mut self, client: ClientKey, name: &str) -> ItemKey {
        if let Some(&key) = self.client_roots.get(client) {
            return key;
        }
        let mut item = MenuItem::new(
            "_client_",
            name,
            Some(client),
            ItemKind::from_kind_name("menu").unwrap(),
        );
        item.parent = Some(self.root);
        let key = self.items.insert(item);
        if let ItemKind::Menu { children, .. } = &mut self.items[self.root].kind {
            children.push(key);
        }
        self.client_roots.insert(client, key);
        tracing::debug!(target: "menu", client_menu = name, "client menu created");
        key
    }

    /// `menu_add_item`: create an item under one of the client's menus.
    /// An empty `menu_id` addresses the client's root.
    pub fn add_item(
        &mut self,
        client: ClientKey,
        client_name: &str,
        menu_id: &str,
        new_id: &str,
        kind_name: &str,
        text: &str,
    ) -> Result<ItemKey, MenuError> {
        let kind = ItemKind::from_kind_name(kind_name)
            .ok_or_else(|| MenuError::BadKind(kind_name.to_string()))?;
        let parent = if menu_id.is_empty() {
            self.ensure_client_root(client, client_name)
        } else {
            let key = self
                .find(Some(client), menu_id)
                .ok_or_else(|| MenuError::UnknownItem(menu_id.to_string()))?;
            if !self.items[key].kind.is_menu() {
                return Err(MenuError::NotAMenu(menu_id.to_string()));
            }
            key
        };
        if self.find(Some(client), new_id).is_some() {
            return Err(MenuError::DuplicateItem(new_id.to_string()));
        }
        let mut item = MenuItem::new(new_id, text, Some(client), kind);
        item.parent = Some(parent);
        let key = self.items.insert(item);
        if let ItemKind::Menu { children, .. } = &mut self.items[parent].kind {
            children.push(key);
        }
        Ok(key)
    }

    /// `menu_del_item`: destroy an item (and its subtree). The client's
    /// root is removed from the main menu once its last item is gone.
    pub fn del_item(&mut self, client: ClientKey, id: &str) -> Result<(), MenuError> {
        let key = self
            .find(Some(client), id)
            .ok_or_else(|| MenuError::UnknownItem(id.to_string()))?;
        self.remove_subtree(key);
        if let Some(&root) = self.client_roots.get(client) {
            if self.visible_children(root).is_empty() && self.all_children(root).is_empty() {
                self.remove_subtree(root);
                self.client_roots.remove(client);
            }
        }
        Ok(())
    }

    /// Tear down a client's whole subtree (disconnect path).
    pub fn remove_client(&mut self, client: ClientKey) {
        if let Some(root) = self.client_roots.remove(client) {
            self.remove_subtree(root);
        }
        if self
            .custom_main
            .is_some_and(|k| !self.items.contains_key(k))
        {
            self.custom_main = None;
        }
    }

    /// Whether `node` is `ancestor` or lies in its subtree.
    fn is_ancestor_or_self(&self, ancestor: ItemKey, node: ItemKey) -> bool {
        let mut cur = Some(node);
        let mut hops = 0;
        while let Some(k) = cur {
            if k == ancestor {
                return true;
            }
            cur = self.items.get(k).and_then(|i| i.parent);
            hops += 1;
            if hops > self.items.len() {
                return false;
            }
        }
        false
    }

    fn all_children(&self, menu: ItemKey) -> Vec<ItemKey> {
        match self.items.get(menu).map(|i| &i.kind) {
            Some(ItemKind::Menu { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Remove an item and its descendants, repairing the active pointer,
    /// selection indices, and the custom main menu.
    fn remove_subtree(&mut self, key: ItemKey) {
        // if the active item is inside the doomed subtree, retreat to the
        // nearest surviving ancestor
        if let Some(active) = self.active {
            if self.is_ancestor_or_self(key, active) {
                let mut candidate = self.items.get(key).and_then(|i| i.parent);
                while let Some(k) = candidate {
                    if self.items.contains_key(k) {
                        break;
                    }
                    candidate = self.items.get(k).and_then(|i| i.parent);
                }
                self.active = candidate;
            }
        }
        if self.custom_main.is_some_and(|k| self.is_ancestor_or_self(key, k)) {
            self.custom_main = None;
        }
        // detach from parent and clamp its selection
        if let Some(parent) = self.items.get(key).and_then(|i| i.parent) {
            if let Some(ItemKind::Menu {
                children,
                selected,
                scroll,
            }) = self.items.get_mut(parent).map(|i| &mut i.kind)
            {
                children.retain(|&c| c != key);
                let len = children.len();
                if *selected >= len {
                    *selected = len.saturating_sub(1);
                }
                if *scroll >= len {
                    *scroll = len.saturating_sub(1);
                }
            }
        }
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(item) = self.items.remove(k) {
                if let ItemKind::Menu { children, .. } = item.kind {
                    stack.extend(children);
                }
            }
        }
        let items = &self.items;
        self.screen_items.retain(|_, v| items.contains_key(*v));
    }

    // --- screens menu -----------------------------------------------------

    /// Synthesize a menu entry for a newly created screen.
    pub fn screen_added(&mut self, screen: ScreenKey, label: &str) {
        let mut item = MenuItem::new(
            format!("_screen_{label}"),
            label,
            None,
            ItemKind::Action,
        );
        item.parent = Some(self.screens_menu);
        let key = self.items.insert(item);
        if let ItemKind::Menu { children, .. } = &mut self.items[self.screens_menu].kind {
            children.push(key);
        }
        self.screen_items.insert(screen, key);
    }

    pub fn screen_removed(&mut self, screen: ScreenKey) {
        if let Some(key) = self.screen_items.remove(&screen) {
            self.remove_subtree(key);
        }
    }

    /// Reverse lookup: selecting this item means "show that screen".
    pub fn screen_for_item(&self, key: ItemKey) -> Option<ScreenKey> {
        self.screen_items
            .iter()
            .find(|&(_, &v)| v == key)
            .map(|(&s, _)| s)
    }

    // --- activation -------------------------------------------------------

    /// `menu_set_main`: where the menu key lands. Empty id resets to the
    /// server root.
    pub fn set_main(&mut self, client: ClientKey, id: &str) -> Result<(), MenuError> {
        if id.is_empty() {
            self.custom_main = None;
            return Ok(());
        }
        let key = self
            .find(Some(client), id)
            .ok_or_else(|| MenuError::UnknownItem(id.to_string()))?;
        if !self.items[key].kind.is_menu() {
            return Err(MenuError::NotAMenu(id.to_string()));
        }
        self.custom_main = Some(key);
        Ok(())
    }

    pub fn main_entry(&self) -> ItemKey {
        self.custom_main.unwrap_or(self.root)
    }

    /// Open the menu at the main entry. No-op when already open.
    pub fn open(&mut self) -> Vec<MenuEvent> {
        if self.active.is_some() {
            return Vec::new();
        }
        let entry = self.main_entry();
        self.goto(entry)
    }

    /// Close the menu entirely.
    pub fn close(&mut self) -> Vec<MenuEvent> {
        let mut events = Vec::new();
        if let Some(old) = self.active.take() {
            if let Some(e) = self.leave_event(old) {
                events.push(e);
            }
        }
        events
    }

    /// Switch the active item, emitting leave/enter for editor screens and
    /// resetting the target's edit state.
    pub fn goto(&mut self, target: ItemKey) -> Vec<MenuEvent> {
        let mut events = Vec::new();
        if self.active == Some(target) {
            return events;
        }
        if let Some(old) = self.active {
            if let Some(e) = self.leave_event(old) {
                events.push(e);
            }
        }
        // entering a simple item means selecting it inside its parent menu
        let simple = matches!(
            self.items.get(target).map(|i| i.kind.kind_name()),
            Some("action" | "checkbox" | "ring")
        );
        let target = if simple {
            let parent = self.items[target].parent.unwrap_or(self.root);
            if let Some(pos) = self
                .visible_children(parent)
                .iter()
                .position(|&c| c == target)
            {
                if let Some(ItemKind::Menu { selected, .. }) =
                    self.items.get_mut(parent).map(|i| &mut i.kind)
                {
                    *selected = pos;
                }
            }
            parent
        } else {
            target
        };
        self.reset_edit(target);
        if let Some(item) = self.items.get(target) {
            if item.kind.has_editor_screen() {
                if let Some(e) = self.event(MenuEventKind::Enter, target) {
                    events.push(e);
                }
            }
        }
        self.active = Some(target);
        events
    }

    fn leave_event(&self, key: ItemKey) -> Option<MenuEvent> {
        let item = self.items.get(key)?;
        if item.kind.has_editor_screen() {
            self.event(MenuEventKind::Leave, key)
        } else {
            None
        }
    }

    /// Seed the work-in-progress buffer when an editor item becomes active.
    pub fn reset_edit(&mut self, key: ItemKey) {
        let Some(item) = self.items.get_mut(key) else {
            return;
        };
        item.error = EditError::None;
        match &mut item.kind {
            ItemKind::Numeric { value, edit, .. } => {
                *edit = EditState {
                    buf: value.to_string(),
                    pos: 0,
                    offs: 0,
                };
            }
            ItemKind::Alpha { value, edit, .. } => {
                *edit = EditState {
                    buf: value.clone(),
                    pos: 0,
                    offs: 0,
                };
            }
            ItemKind::Ip { value, v6, edit } => {
                let normalized = ip::normalize(value, *v6).unwrap_or_else(|| {
                    tracing::debug!(target: "menu", bad = %value, "invalid ip value replaced by dummy");
                    ip::dummy(*v6).to_string()
                });
                *value = normalized;
                *edit = EditState {
                    buf: ip::pad(value, *v6).unwrap_or_else(|| ip::pad(ip::dummy(*v6), *v6).unwrap()),
                    pos: 0,
                    offs: 0,
                };
            }
            _ => {}
        }
    }

    /// Resolve a navigation target relative to an item, in its owner scope.
    pub fn resolve_target(&self, from: ItemKey, target: &NavTarget) -> Resolution {
        match target {
            NavTarget::Quit => Resolution::CloseAll,
            NavTarget::Close => Resolution::Ascend,
            NavTarget::Stay => Resolution::Stay,
            NavTarget::Item(id) => {
                let owner = self.items.get(from).and_then(|i| i.owner);
                match self.find(owner, id) {
                    Some(key) => Resolution::Goto(key),
                    None => Resolution::Stay,
                }
            }
        }
    }

    /// Build a `menuevent` for an item; `None` for server-owned items.
    pub fn event(&self, kind: MenuEventKind, key: ItemKey) -> Option<MenuEvent> {
        let item = self.items.get(key)?;
        item.owner?;
        Some(MenuEvent {
            client: item.owner,
            kind,
            item_id: item.id.clone(),
            payload: match kind {
                MenuEventKind::Select | MenuEventKind::Enter | MenuEventKind::Leave => None,
                _ => item.event_payload(),
            },
        })
    }
}

/// Outcome of resolving a [`NavTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    CloseAll,
    Ascend,
    Stay,
    Goto(ItemKey),
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn client_key() -> ClientKey {
        let mut map: SlotMap<ClientKey, ()> = SlotMap::with_key();
        map.insert(())
    }

    fn tree_with_items() -> (MenuTree, ClientKey) {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "sub", "menu", "Submenu").unwrap();
        t.add_item(c, "cli", "sub", "a1", "action", "Do it").unwrap();
        t.add_item(c, "cli", "", "n1", "numeric", "Port").unwrap();
        (t, c)
    }

    #[test]
    fn first_item_creates_the_client_root() {
        let (t, c) = tree_with_items();
        let root = t.client_root(c).unwrap();
        assert!(t.reachable_from_root(root));
        assert_eq!(t.visible_children(root).len(), 2);
    }

    #[test]
    fn duplicate_ids_are_scoped_per_client() {
        let (mut t, c) = tree_with_items();
        let err = t.add_item(c, "cli", "", "n1", "action", "x").unwrap_err();
        assert_eq!(err, MenuError::DuplicateItem("n1".into()));
        let c2 = client_key();
        t.add_item(c2, "other", "", "n1", "action", "x").unwrap();
    }

    #[test]
    fn adding_under_a_non_menu_fails() {
        let (mut t, c) = tree_with_items();
        let err = t.add_item(c, "cli", "n1", "x", "action", "x").unwrap_err();
        assert_eq!(err, MenuError::NotAMenu("n1".into()));
    }

    #[test]
    fn del_last_item_removes_the_client_root() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "only", "action", "x").unwrap();
        assert!(t.client_root(c).is_some());
        t.del_item(c, "only").unwrap();
        assert!(t.client_root(c).is_none());
    }

    #[test]
    fn deleting_the_active_chain_retreats_to_an_ancestor() {
        let (mut t, c) = tree_with_items();
        let sub = t.find(Some(c), "sub").unwrap();
        let root = t.client_root(c).unwrap();
        t.goto(sub);
        assert_eq!(t.active(), Some(sub));
        t.del_item(c, "sub").unwrap();
        assert_eq!(t.active(), Some(root));
        assert!(t.reachable_from_root(root));
    }

    #[test]
    fn removing_a_client_closes_its_active_menu() {
        let (mut t, c) = tree_with_items();
        let sub = t.find(Some(c), "sub").unwrap();
        t.goto(sub);
        t.remove_client(c);
        // retreats to the main root, which survives
        assert_eq!(t.active(), Some(t.root()));
        assert!(t.find(Some(c), "sub").is_none());
    }

    #[test]
    fn screens_menu_tracks_screen_lifecycle() {
        let mut t = MenuTree::new();
        let mut screens: SlotMap<ScreenKey, ()> = SlotMap::with_key();
        let s = screens.insert(());
        t.screen_added(s, "CPU");
        let key = t.screen_items[&s];
        assert_eq!(t.screen_for_item(key), Some(s));
        t.screen_removed(s);
        assert!(t.screen_for_item(key).is_none());
    }

    #[test]
    fn goto_simple_item_selects_it_in_the_parent() {
        let (mut t, c) = tree_with_items();
        let a1 = t.find(Some(c), "a1").unwrap();
        let sub = t.find(Some(c), "sub").unwrap();
        t.goto(a1);
        assert_eq!(t.active(), Some(sub));
    }

    #[test]
    fn entering_an_editor_emits_enter_and_seeds_the_buffer() {
        let (mut t, c) = tree_with_items();
        let n1 = t.find(Some(c), "n1").unwrap();
        t.item_mut(n1).unwrap().set_option("value", "42").unwrap();
        let events = t.goto(n1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, MenuEventKind::Enter);
        match &t.item(n1).unwrap().kind {
            ItemKind::Numeric { edit, .. } => assert_eq!(edit.buf, "42"),
            _ => unreachable!(),
        }
        let closed = t.close();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].kind, MenuEventKind::Leave);
    }

    #[test]
    fn invalid_ip_value_is_replaced_with_the_dummy() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "addr", "ip", "Address").unwrap();
        let key = t.find(Some(c), "addr").unwrap();
        t.item_mut(key).unwrap().set_option("value", "10.0.0.999").unwrap();
        t.goto(key);
        match &t.item(key).unwrap().kind {
            ItemKind::Ip { value, edit, .. } => {
                assert_eq!(value, "0.0.0.0");
                assert_eq!(edit.buf, "000.000.000.000");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn ip_value_normalizes_on_open() {
        let mut t = MenuTree::new();
        let c = client_key();
        t.add_item(c, "cli", "", "addr", "ip", "Address").unwrap();
        let key = t.find(Some(c), "addr").unwrap();
        t.item_mut(key).unwrap().set_option("value", "010.0.0.01").unwrap();
        t.goto(key);
        match &t.item(key).unwrap().kind {
            ItemKind::Ip { value, edit, .. } => {
                assert_eq!(value, "10.0.0.1");
                assert_eq!(edit.buf, "010.000.000.001");
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn set_main_requires_a_menu_item() {
        let (mut t, c) = tree_with_items();
        assert_eq!(t.set_main(c, "n1"), Err(MenuError::NotAMenu("n1".into())));
        t.set_main(c, "sub").unwrap();
        assert_eq!(t.main_entry(), t.find(Some(c), "sub").unwrap());
        t.set_main(c, "").unwrap();
        assert_eq!(t.main_entry(), t.root());
    }
}
