//! The entity arenas and every structural mutation on them.
//!
//! All creation/destruction of clients, screens, and widgets goes through
//! [`EntityStore`] so the ownership invariants hold after every public
//! call. Key reservations and menu items have their own owners
//! ([`crate::KeyTable`], the menu crate); callers coordinate those on
//! client teardown.

use slotmap::SlotMap;

use crate::{
    client::Client,
    screen::{Screen, ScreenOwner},
    widget::{Widget, WidgetKind, WidgetParent},
    ClientKey, Outbox, ScreenKey, WidgetKey,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("screen \"{0}\" already exists")]
    DuplicateScreen(String),
    #[error("unknown screen \"{0}\"")]
    UnknownScreen(String),
    #[error("widget \"{0}\" already exists")]
    DuplicateWidget(String),
    #[error("unknown widget \"{0}\"")]
    UnknownWidget(String),
    #[error("unknown frame \"{0}\"")]
    UnknownFrame(String),
    #[error("widget \"{0}\" is not a frame")]
    NotAFrame(String),
}

#[derive(Default)]
pub struct EntityStore {
    pub clients: SlotMap<ClientKey, Client>,
    pub screens: SlotMap<ScreenKey, Screen>,
    pub widgets: SlotMap<WidgetKey, Widget>,
    /// Global rotation order: screens in creation order across all owners.
    screen_order: Vec<ScreenKey>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- clients ----------------------------------------------------------

    pub fn add_client(&mut self, sink: Outbox) -> ClientKey {
        let key = self.clients.insert(Client::new(sink));
        tracing::info!(target: "net", clients = self.clients.len(), "client connected");
        key
    }

    pub fn client(&self, key: ClientKey) -> Option<&Client> {
        self.clients.get(key)
    }

    pub fn client_mut(&mut self, key: ClientKey) -> Option<&mut Client> {
        self.clients.get_mut(key)
    }

    /// Destroy a client and everything it owns. Returns the (key, id)
    /// pairs of destroyed screens so the caller can notify the menu
    /// subsystem and the scheduler.
    pub fn remove_client(&mut self, key: ClientKey) -> Vec<(ScreenKey, String)> {
        let Some(client) = self.clients.remove(key) else {
            return Vec::new();
        };
        let mut destroyed = Vec::new();
        for screen_key in client.screens {
            if let Some(screen) = self.destroy_screen(screen_key) {
                destroyed.push((screen_key, screen.id));
            }
        }
        tracing::info!(
            target: "net",
            name = client.name.as_deref().unwrap_or("(unnamed)"),
            screens = destroyed.len(),
            "client destroyed"
        );
        destroyed
    }

    // --- screens ----------------------------------------------------------

    /// Create a screen and join the global rotation. The id must be unique
    /// within the owner.
    pub fn create_screen(
        &mut self,
        owner: ScreenOwner,
        id: &str,
        width: u16,
        height: u16,
    ) -> Result<ScreenKey, ModelError> {
        if self.find_screen(owner, id).is_some() {
            return Err(ModelError::DuplicateScreen(id.to_string()));
        }
        let key = self
            .screens
            .insert(Screen::new(id, owner, width, height));
        self.screen_order.push(key);
        if let ScreenOwner::Client(client_key) = owner {
            if let Some(client) = self.clients.get_mut(client_key) {
                client.screens.push(key);
            }
        }
        tracing::debug!(target: "command", screen = id, "screen created");
        Ok(key)
    }

    /// Destroy a screen, its whole widget tree, and its rotation slot.
    pub fn destroy_screen(&mut self, key: ScreenKey) -> Option<Screen> {
        let screen = self.screens.remove(key)?;
        for &w in &screen.widgets {
            self.destroy_widget_tree(w);
        }
        self.screen_order.retain(|&k| k != key);
        if let ScreenOwner::Client(client_key) = screen.owner {
            if let Some(client) = self.clients.get_mut(client_key) {
                client.screens.retain(|&k| k != key);
            }
        }
        Some(screen)
    }

    pub fn screen(&self, key: ScreenKey) -> Option<&Screen> {
        self.screens.get(key)
    }

    pub fn screen_mut(&mut self, key: ScreenKey) -> Option<&mut Screen> {
        self.screens.get_mut(key)
    }

    /// Look up a screen by owner and client-assigned id.
    pub fn find_screen(&self, owner: ScreenOwner, id: &str) -> Option<ScreenKey> {
        let owned: &[ScreenKey] = match owner {
            ScreenOwner::Client(client_key) => &self.clients.get(client_key)?.screens,
            ScreenOwner::Server => {
                return self
                    .screen_order
                    .iter()
                    .copied()
                    .find(|&k| {
                        self.screens
                            .get(k)
                            .is_some_and(|s| s.owner == ScreenOwner::Server && s.id == id)
                    });
            }
        };
        owned
            .iter()
            .copied()
            .find(|&k| self.screens.get(k).is_some_and(|s| s.id == id))
    }

    /// Rotation order, oldest screen first.
    pub fn screen_order(&self) -> &[ScreenKey] {
        &self.screen_order
    }

    // --- widgets ----------------------------------------------------------

    /// Create a widget on a screen, optionally inside one of its frames.
    /// The id must be unique across the screen's whole tree.
    pub fn add_widget(
        &mut self,
        screen_key: ScreenKey,
        id: &str,
        kind: WidgetKind,
        in_frame: Option<&str>,
    ) -> Result<WidgetKey, ModelError> {
        if self.widget_by_id(screen_key, id).is_some() {
            return Err(ModelError::DuplicateWidget(id.to_string()));
        }
        let parent = match in_frame {
            None => WidgetParent::Screen(screen_key),
            Some(frame_id) => {
                let frame_key = self
                    .widget_by_id(screen_key, frame_id)
                    .ok_or_else(|| ModelError::UnknownFrame(frame_id.to_string()))?;
                if !self.widgets[frame_key].kind.is_frame() {
                    return Err(ModelError::NotAFrame(frame_id.to_string()));
                }
                WidgetParent::Frame(frame_key)
            }
        };
        let key = self.widgets.insert(Widget::new(id, parent, kind));
        match parent {
            WidgetParent::Screen(s) => self.screens[s].widgets.push(key),
            WidgetParent::Frame(f) => {
                if let WidgetKind::Frame { children, .. } = &mut self.widgets[f].kind {
                    children.push(key);
                }
            }
        }
        Ok(key)
    }

    /// Depth-first search for a widget id across the screen's tree.
    pub fn widget_by_id(&self, screen_key: ScreenKey, id: &str) -> Option<WidgetKey> {
        let screen = self.screens.get(screen_key)?;
        let mut stack: Vec<WidgetKey> = screen.widgets.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let widget = self.widgets.get(key)?;
            if widget.id == id {
                return Some(key);
            }
            if let WidgetKind::Frame { children, .. } = &widget.kind {
                stack.extend(children.iter().rev().copied());
            }
        }
        None
    }

    pub fn widget(&self, key: WidgetKey) -> Option<&Widget> {
        self.widgets.get(key)
    }

    pub fn widget_mut(&mut self, key: WidgetKey) -> Option<&mut Widget> {
        self.widgets.get_mut(key)
    }

    /// Remove a widget by id, cascading through frame children, and detach
    /// it from its parent's list.
    pub fn destroy_widget(&mut self, screen_key: ScreenKey, id: &str) -> Result<(), ModelError> {
        let key = self
            .widget_by_id(screen_key, id)
            .ok_or_else(|| ModelError::UnknownWidget(id.to_string()))?;
        match self.widgets[key].parent {
            WidgetParent::Screen(s) => {
                if let Some(screen) = self.screens.get_mut(s) {
                    screen.widgets.retain(|&k| k != key);
                }
            }
            WidgetParent::Frame(f) => {
                if let Some(WidgetKind::Frame { children, .. }) =
                    self.widgets.get_mut(f).map(|w| &mut w.kind)
                {
                    children.retain(|&k| k != key);
                }
            }
        }
        self.destroy_widget_tree(key);
        Ok(())
    }

    fn destroy_widget_tree(&mut self, key: WidgetKey) {
        let Some(widget) = self.widgets.remove(key) else {
            return;
        };
        if let WidgetKind::Frame { children, .. } = widget.kind {
            for child in children {
                self.destroy_widget_tree(child);
            }
        }
    }

    /// Destroy a screen's whole widget tree (used when a screen's layout
    /// is rebuilt from scratch).
    pub fn clear_widgets(&mut self, screen_key: ScreenKey) {
        let Some(screen) = self.screens.get_mut(screen_key) else {
            return;
        };
        let top: Vec<WidgetKey> = std::mem::take(&mut screen.widgets);
        for key in top {
            self.destroy_widget_tree(key);
        }
    }

    pub fn live_widgets(&self) -> usize {
        self.widgets.len()
    }

    pub fn live_screens(&self) -> usize {
        self.screens.len()
    }

    pub fn live_clients(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_with_client() -> (EntityStore, ClientKey) {
        let mut store = EntityStore::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        // keep the receiver alive long enough for the tests that send
        std::mem::forget(_rx);
        let key = store.add_client(tx);
        (store, key)
    }

    fn kind(name: &str) -> WidgetKind {
        WidgetKind::from_type_name(name).unwrap()
    }

    #[test]
    fn screen_ids_are_scoped_per_owner() {
        let (mut store, c1) = store_with_client();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        std::mem::forget(rx);
        let c2 = store.add_client(tx);
        store
            .create_screen(ScreenOwner::Client(c1), "s1", 20, 4)
            .unwrap();
        // same id under a different owner is fine
        store
            .create_screen(ScreenOwner::Client(c2), "s1", 20, 4)
            .unwrap();
        let err = store
            .create_screen(ScreenOwner::Client(c1), "s1", 20, 4)
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateScreen("s1".into()));
    }

    #[test]
    fn widget_ids_are_unique_across_frame_nesting() {
        let (mut store, c) = store_with_client();
        let s = store
            .create_screen(ScreenOwner::Client(c), "s1", 20, 4)
            .unwrap();
        store.add_widget(s, "f", kind("frame"), None).unwrap();
        store.add_widget(s, "inner", kind("string"), Some("f")).unwrap();
        let err = store
            .add_widget(s, "inner", kind("string"), None)
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateWidget("inner".into()));
        assert!(store.widget_by_id(s, "inner").is_some());
    }

    #[test]
    fn adding_into_a_non_frame_is_rejected() {
        let (mut store, c) = store_with_client();
        let s = store
            .create_screen(ScreenOwner::Client(c), "s1", 20, 4)
            .unwrap();
        store.add_widget(s, "t", kind("title"), None).unwrap();
        assert_eq!(
            store.add_widget(s, "x", kind("string"), Some("t")),
            Err(ModelError::NotAFrame("t".into()))
        );
        assert_eq!(
            store.add_widget(s, "x", kind("string"), Some("ghost")),
            Err(ModelError::UnknownFrame("ghost".into()))
        );
    }

    #[test]
    fn frame_destruction_cascades_to_children() {
        let (mut store, c) = store_with_client();
        let s = store
            .create_screen(ScreenOwner::Client(c), "s1", 20, 4)
            .unwrap();
        store.add_widget(s, "f", kind("frame"), None).unwrap();
        store.add_widget(s, "inner1", kind("string"), Some("f")).unwrap();
        store.add_widget(s, "inner2", kind("hbar"), Some("f")).unwrap();
        assert_eq!(store.live_widgets(), 3);
        store.destroy_widget(s, "f").unwrap();
        assert_eq!(store.live_widgets(), 0);
        assert!(store.widget_by_id(s, "inner1").is_none());
    }

    #[test]
    fn screen_destruction_cascades_and_leaves_rotation() {
        let (mut store, c) = store_with_client();
        let s = store
            .create_screen(ScreenOwner::Client(c), "s1", 20, 4)
            .unwrap();
        store.add_widget(s, "f", kind("frame"), None).unwrap();
        store.add_widget(s, "x", kind("string"), Some("f")).unwrap();
        assert_eq!(store.screen_order().len(), 1);
        store.destroy_screen(s);
        assert_eq!(store.live_widgets(), 0);
        assert!(store.screen_order().is_empty());
        assert!(store.clients[c].screens.is_empty());
    }

    #[test]
    fn client_removal_destroys_owned_screens_only() {
        let (mut store, c1) = store_with_client();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        std::mem::forget(rx);
        let c2 = store.add_client(tx);
        store
            .create_screen(ScreenOwner::Client(c1), "a", 20, 4)
            .unwrap();
        store
            .create_screen(ScreenOwner::Client(c2), "b", 20, 4)
            .unwrap();
        let destroyed = store.remove_client(c1);
        assert_eq!(destroyed.len(), 1);
        assert_eq!(destroyed[0].1, "a");
        assert_eq!(store.live_screens(), 1);
    }

    proptest! {
        /// Widget conservation: live count equals adds minus explicit
        /// deletes minus widgets destroyed transitively by a frame delete.
        #[test]
        fn widget_count_is_conserved(
            ops in proptest::collection::vec(
                (0usize..24, any::<bool>(), any::<bool>(), any::<bool>()),
                1..80,
            )
        ) {
            let (mut store, c) = store_with_client();
            let s = store.create_screen(ScreenOwner::Client(c), "s", 20, 4).unwrap();
            let mut expected_live = 0usize;
            for (n, deleting, frame, nest) in ops {
                let id = format!("w{n}");
                if deleting {
                    let removed_tree = match store.widget_by_id(s, &id) {
                        Some(key) => count_tree(&store, key),
                        None => 0,
                    };
                    if store.destroy_widget(s, &id).is_ok() {
                        expected_live -= removed_tree;
                    }
                } else {
                    let k = if frame { kind("frame") } else { kind("string") };
                    let target = format!("w{}", n / 2);
                    let in_frame = if nest { Some(target.as_str()) } else { None };
                    if store.add_widget(s, &id, k, in_frame).is_ok() {
                        expected_live += 1;
                    }
                }
                prop_assert_eq!(store.live_widgets(), expected_live);
            }
        }
    }

    fn count_tree(store: &EntityStore, key: WidgetKey) -> usize {
        let mut n = 1;
        if let WidgetKind::Frame { children, .. } = &store.widgets[key].kind {
            for &child in children {
                n += count_tree(store, child);
            }
        }
        n
    }
}
