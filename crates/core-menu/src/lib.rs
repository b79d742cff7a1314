//! The menu subsystem: a server-owned tree clients may graft subtrees
//! onto, navigated with six logical keys, with in-place editors for eight
//! item kinds.
//!
//! Structure:
//! * [`item`]: item kinds, per-kind state, and the typed option table
//!   behind `menu_set_item`;
//! * [`tree`]: the item arena, client subtrees, the screens menu, and the
//!   active-item pointer;
//! * [`input`]: the per-kind key state machines and event emission;
//! * [`layout`]: widget layouts for the menu screen.
//!
//! Invariants:
//! * every item is reachable from the root; `parent` closes the cycle;
//! * the active item, when set, is reachable from the root;
//! * removing an item moves the active pointer to the nearest surviving
//!   ancestor before the item is freed.

pub mod input;
pub mod ip;
pub mod item;
pub mod layout;
pub mod tree;

pub use input::{MenuOutcome, MenuToken};
pub use item::{CheckState, EditError, EditState, ItemKind, MenuItem, NavTarget};
pub use tree::{MenuEvent, MenuEventKind, MenuError, MenuTree};

slotmap::new_key_type! {
    pub struct ItemKey;
}
