//! Server data model: clients, screens, widgets, and key reservations.
//!
//! Entities live in slotmap arenas keyed by small opaque handles; all
//! relationships (client -> screens, screen -> widgets, frame -> children)
//! are handle lists, and parent back-references are handles. Destruction is
//! a traversal from the owner, so the arenas can never leak an orphan.
//!
//! Invariants maintained by [`EntityStore`]:
//! * every screen in the global rotation order is owned by exactly one live
//!   client or by the server;
//! * every widget is reachable from exactly one screen (possibly through
//!   frame nesting) and its id is unique within that screen's whole tree;
//! * a client in state `Gone` owns nothing once `remove_client` returns.

pub mod client;
pub mod reservation;
pub mod screen;
pub mod store;
pub mod widget;

pub use client::{Client, ClientState, Outbox};
pub use reservation::{KeyTable, ReserveError};
pub use screen::{BacklightMode, HeartbeatOverride, Priority, Screen, ScreenOwner};
pub use store::{EntityStore, ModelError};
pub use widget::{FrameScroll, ScrollDirection, Widget, WidgetKind, WidgetParent};

slotmap::new_key_type! {
    pub struct ClientKey;
    pub struct ScreenKey;
    pub struct WidgetKey;
}
