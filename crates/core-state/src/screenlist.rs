//! Screen rotation: which screen owns the display this frame.
//!
//! Selection rule, applied once per render tick:
//! 1. an `Input`-class screen preempts everything (the menu);
//! 2. with autorotate off, the current screen is held while it stays
//!    eligible;
//! 3. otherwise the highest non-hidden class wins, round-robined in global
//!    creation order, each screen holding for its `duration` frames;
//! 4. a positive `timeout` hides the screen after that many frames of
//!    being selected.
//!
//! Visibility changes produce `listen`/`ignore` notifications for the
//! screen owners.

use std::collections::HashMap;

use core_model::{ClientKey, EntityStore, Priority, ScreenKey, ScreenOwner};

/// A visibility notification for a screen's owning client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Listen(ClientKey, String),
    Ignore(ClientKey, String),
}

pub struct ScreenList {
    current: Option<ScreenKey>,
    /// Frames the current screen has held the display.
    held: u32,
    autorotate: bool,
    /// Frames each timed screen has been selected so far.
    timeout_spent: HashMap<ScreenKey, u32>,
}

impl ScreenList {
    pub fn new(autorotate: bool) -> Self {
        Self {
            current: None,
            held: 0,
            autorotate,
            timeout_spent: HashMap::new(),
        }
    }

    pub fn current(&self) -> Option<ScreenKey> {
        self.current
    }

    pub fn autorotate(&self) -> bool {
        self.autorotate
    }

    /// Toggle rotation; returns the new state.
    pub fn toggle_autorotate(&mut self) -> bool {
        self.autorotate = !self.autorotate;
        self.autorotate
    }

    /// Forget a destroyed or hidden screen.
    pub fn screen_gone(&mut self, key: ScreenKey) {
        if self.current == Some(key) {
            self.current = None;
            self.held = 0;
        }
        self.timeout_spent.remove(&key);
    }

    /// Force a screen onto the display (screens menu, tests).
    pub fn force_show(&mut self, key: ScreenKey) {
        self.current = Some(key);
        self.held = 0;
    }

    fn eligible<'a>(&self, store: &'a EntityStore) -> Vec<(ScreenKey, Priority)> {
        store
            .screen_order()
            .iter()
            .filter_map(|&k| {
                store
                    .screen(k)
                    .filter(|s| s.priority > Priority::Hidden)
                    .map(|s| (k, s.priority))
            })
            .collect()
    }

    fn class_members(&self, store: &EntityStore) -> Vec<ScreenKey> {
        let eligible = self.eligible(store);
        let Some(top) = eligible.iter().map(|&(_, p)| p).max() else {
            return Vec::new();
        };
        eligible
            .into_iter()
            .filter(|&(_, p)| p == top)
            .map(|(k, _)| k)
            .collect()
    }

    /// Advance one render frame and pick the screen to draw. Returns the
    /// selection plus any listen/ignore notifications.
    pub fn tick(&mut self, store: &mut EntityStore) -> (Option<ScreenKey>, Vec<Visibility>) {
        // expire timed screens that have had their share of display time
        if let Some(cur) = self.current {
            if let Some(screen) = store.screen(cur) {
                if let Some(limit) = screen.timeout {
                    let spent = self.timeout_spent.entry(cur).or_insert(0);
                    *spent += 1;
                    if *spent >= limit {
                        tracing::debug!(target: "render.scheduler", screen = %screen.id, "screen timed out");
                        if let Some(s) = store.screen_mut(cur) {
                            s.priority = Priority::Hidden;
                        }
                    }
                }
            }
        }

        let members = self.class_members(store);
        let previous = self.current;

        let next = if members.is_empty() {
            None
        } else if let Some(cur) = self.current.filter(|k| members.contains(k)) {
            let top_is_input = store
                .screen(cur)
                .is_some_and(|s| s.priority == Priority::Input);
            self.held += 1;
            let duration = store
                .screen(cur)
                .map(|s| s.duration.max(1))
                .unwrap_or(1);
            if !self.autorotate || top_is_input || self.held < duration || members.len() == 1 {
                Some(cur)
            } else {
                self.held = 0;
                Some(Self::neighbor(&members, cur, 1))
            }
        } else {
            // current vanished or was outclassed: start of a fresh turn
            self.held = 0;
            Some(members[0])
        };

        self.current = next;
        (next, self.transitions(store, previous, next))
    }

    /// Step manually to the next/previous screen of the dominant class.
    pub fn step(&mut self, store: &EntityStore, forward: bool) -> Option<ScreenKey> {
        let members = self.class_members(store);
        if members.is_empty() {
            return None;
        }
        let next = match self.current.filter(|k| members.contains(k)) {
            Some(cur) => Self::neighbor(&members, cur, if forward { 1 } else { -1 }),
            None => members[0],
        };
        self.current = Some(next);
        self.held = 0;
        Some(next)
    }

    fn neighbor(members: &[ScreenKey], current: ScreenKey, dir: isize) -> ScreenKey {
        let len = members.len() as isize;
        let idx = members
            .iter()
            .position(|&k| k == current)
            .map(|i| i as isize)
            .unwrap_or(0);
        members[((idx + dir + len) % len) as usize]
    }

    fn transitions(
        &self,
        store: &EntityStore,
        previous: Option<ScreenKey>,
        next: Option<ScreenKey>,
    ) -> Vec<Visibility> {
        if previous == next {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(old) = previous {
            if let Some(screen) = store.screen(old) {
                if let ScreenOwner::Client(c) = screen.owner {
                    events.push(Visibility::Ignore(c, screen.id.clone()));
                }
            }
        }
        if let Some(new) = next {
            if let Some(screen) = store.screen(new) {
                if let ScreenOwner::Client(c) = screen.owner {
                    events.push(Visibility::Listen(c, screen.id.clone()));
                }
            }
        }
        events
    }
}
