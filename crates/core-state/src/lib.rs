//! The server's whole mutable world, threaded by reference through command
//! handlers, the input router, and the renderer.
//!
//! [`ServerState`] bundles the entity arenas, key reservations, the menu
//! tree and its screen, the loaded drivers, the frame counter, and the
//! rotation state. Only the main loop task touches it, so there is no
//! locking anywhere in the data graph.

pub mod screenlist;
pub mod serverscreen;

pub use screenlist::{ScreenList, Visibility};

use core_config::{Settings, Tristate};
use core_driver::{DisplayProps, DriverSet};
use core_menu::{layout, MenuTree};
use core_model::{
    BacklightMode, ClientKey, ClientState, EntityStore, KeyTable, Outbox, Priority, ScreenKey,
    ScreenOwner,
};

/// Frames a toast message stays in the corner.
pub const TOAST_EXPIRE: u64 = 16;

/// Transient server message pinned to the bottom-right corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub text: String,
    /// Frame number at which the toast disappears.
    pub expires: u64,
}

pub struct ServerState {
    pub store: EntityStore,
    pub keys: KeyTable,
    pub menu: MenuTree,
    pub drivers: DriverSet,
    pub settings: Settings,
    pub props: DisplayProps,
    /// Render frame counter; drives every animation.
    pub frame: u64,
    pub screenlist: ScreenList,
    pub output_state: i64,
    pub toast: Option<Toast>,
    /// The menu's server screen; hidden unless an item is active.
    pub menu_screen: ScreenKey,
    /// The hello/status server screen.
    pub server_screen: ScreenKey,
    /// Set once any client has connected (retires the hello banner).
    pub had_client: bool,
    /// The menu changed; its screen layout must be rebuilt.
    menu_dirty: bool,
}

impl ServerState {
    pub fn new(drivers: DriverSet, settings: Settings) -> Self {
        let props = drivers.props();
        let mut store = EntityStore::new();
        let menu_screen = store
            .create_screen(ScreenOwner::Server, "_menu_screen_", props.width, props.height)
            .expect("fresh store cannot collide");
        store.screen_mut(menu_screen).expect("just created").priority = Priority::Hidden;
        let autorotate = settings.auto_rotate;
        let mut state = Self {
            store,
            keys: KeyTable::new(),
            menu: MenuTree::new(),
            drivers,
            settings,
            props,
            frame: 0,
            screenlist: ScreenList::new(autorotate),
            output_state: 0,
            toast: None,
            menu_screen,
            server_screen: ScreenKey::default(),
            had_client: false,
            menu_dirty: false,
        };
        state.server_screen = serverscreen::create(&mut state);
        state
    }

    // --- client lifecycle -------------------------------------------------

    pub fn client_connected(&mut self, sink: Outbox) -> ClientKey {
        self.had_client = true;
        self.store.add_client(sink)
    }

    /// Mark a client dead; actual teardown happens at end of tick.
    pub fn mark_gone(&mut self, client: ClientKey) {
        if let Some(c) = self.store.client_mut(client) {
            c.state = ClientState::Gone;
            c.clear_inbox();
        }
    }

    /// Destroy every client in state `Gone`, releasing screens, menu
    /// subtrees, and key reservations.
    pub fn reap_gone_clients(&mut self) {
        let gone: Vec<ClientKey> = self
            .store
            .clients
            .iter()
            .filter(|(_, c)| c.state == ClientState::Gone)
            .map(|(k, _)| k)
            .collect();
        for client in gone {
            let destroyed = self.store.remove_client(client);
            for (screen_key, _) in destroyed {
                self.menu.screen_removed(screen_key);
                self.screenlist.screen_gone(screen_key);
            }
            self.keys.release_client(client);
            self.menu.remove_client(client);
            self.menu_dirty = true;
        }
        serverscreen::refresh(self);
    }

    // --- screen lifecycle hooks (called by command handlers) --------------

    pub fn screen_created(&mut self, screen: ScreenKey) {
        let label = self
            .store
            .screen(screen)
            .map(|s| s.display_name().to_string())
            .unwrap_or_default();
        self.menu.screen_added(screen, &label);
        self.menu_dirty = true;
        serverscreen::refresh(self);
    }

    pub fn screen_destroyed(&mut self, screen: ScreenKey) {
        self.menu.screen_removed(screen);
        self.screenlist.screen_gone(screen);
        self.menu_dirty = true;
        serverscreen::refresh(self);
    }

    // --- menu plumbing ----------------------------------------------------

    pub fn mark_menu_dirty(&mut self) {
        self.menu_dirty = true;
    }

    /// Rebuild the menu screen when needed and keep its priority in sync
    /// with the active pointer (`Input` while open, `Hidden` otherwise).
    pub fn sync_menu_screen(&mut self) {
        let open = self.menu.is_open();
        if let Some(screen) = self.store.screen_mut(self.menu_screen) {
            let want = if open { Priority::Input } else { Priority::Hidden };
            if screen.priority != want {
                screen.priority = want;
                if !open {
                    self.screenlist.screen_gone(self.menu_screen);
                }
                self.menu_dirty = true;
            }
        }
        if self.menu_dirty {
            layout::build(&mut self.store, self.menu_screen, &mut self.menu, self.props);
            self.menu_dirty = false;
        }
    }

    // --- cascades ---------------------------------------------------------

    /// Backlight for the visible screen: server tristate, then the screen
    /// override, then the owning client's preference, then lit.
    pub fn effective_backlight(&self, screen: Option<ScreenKey>) -> BacklightMode {
        match self.settings.backlight {
            Tristate::Off => return BacklightMode::OFF,
            Tristate::On => return BacklightMode::ON,
            Tristate::Open => {}
        }
        let Some(screen) = screen.and_then(|k| self.store.screen(k)) else {
            return BacklightMode::ON;
        };
        if let Some(mode) = screen.backlight {
            return mode;
        }
        if let ScreenOwner::Client(c) = screen.owner {
            if let Some(mode) = self.store.client(c).and_then(|c| c.backlight) {
                return mode;
            }
        }
        BacklightMode::ON
    }

    /// Heartbeat for the visible screen, same cascade shape.
    pub fn effective_heartbeat(&self, screen: Option<ScreenKey>) -> bool {
        match self.settings.heartbeat {
            Tristate::Off => return false,
            Tristate::On => return true,
            Tristate::Open => {}
        }
        let Some(screen) = screen.and_then(|k| self.store.screen(k)) else {
            return true;
        };
        match screen.heartbeat {
            core_model::HeartbeatOverride::On => true,
            core_model::HeartbeatOverride::Off => false,
            core_model::HeartbeatOverride::Open => {
                if let ScreenOwner::Client(c) = screen.owner {
                    self.store
                        .client(c)
                        .and_then(|c| c.heartbeat)
                        .unwrap_or(true)
                } else {
                    true
                }
            }
        }
    }

    // --- toasts -----------------------------------------------------------

    pub fn post_toast(&mut self, text: &str) {
        self.toast = Some(Toast {
            text: text.to_string(),
            expires: self.frame + TOAST_EXPIRE,
        });
    }

    /// The toast to draw this frame, dropping it once expired.
    pub fn current_toast(&mut self) -> Option<String> {
        match &self.toast {
            Some(t) if t.expires > self.frame => Some(t.text.clone()),
            Some(_) => {
                self.toast = None;
                None
            }
            None => None,
        }
    }

    /// Send one line to a client, if it still exists.
    pub fn send_to(&self, client: ClientKey, line: String) {
        if let Some(c) = self.store.client(client) {
            c.send(line);
        }
    }
}
