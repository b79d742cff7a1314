//! One accepted TCP connection and its session state.

use std::collections::VecDeque;

use crate::{screen::BacklightMode, ScreenKey};

/// Handle for pushing outbound protocol lines to a client's writer task.
pub type Outbox = tokio::sync::mpsc::UnboundedSender<String>;

/// Lines a single client may have queued before the process tick drains
/// them; beyond this the oldest lines are dropped with a warning.
pub const INBOX_CAP: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    /// Accepted, `hello` not yet seen.
    #[default]
    New,
    /// Session established.
    Active,
    /// Marked for destruction at the end of the current tick.
    Gone,
}

pub struct Client {
    pub state: ClientState,
    /// Display name, set by `client_set -name`.
    pub name: Option<String>,
    /// Client-level backlight preference, consulted when the visible screen
    /// has no override.
    pub backlight: Option<BacklightMode>,
    /// Client-level heartbeat preference.
    pub heartbeat: Option<bool>,
    /// Screens owned by this client, in creation order.
    pub screens: Vec<ScreenKey>,
    inbox: VecDeque<String>,
    sink: Outbox,
}

impl Client {
    pub fn new(sink: Outbox) -> Self {
        Self {
            state: ClientState::New,
            name: None,
            backlight: None,
            heartbeat: None,
            screens: Vec::new(),
            inbox: VecDeque::new(),
            sink,
        }
    }

    /// Queue one received command line for the next process tick. Returns
    /// false when the line was dropped because the inbox is full.
    pub fn enqueue_line(&mut self, line: String) -> bool {
        if self.inbox.len() >= INBOX_CAP {
            tracing::warn!(target: "net", dropped_len = line.len(), "client inbox full, dropping line");
            return false;
        }
        self.inbox.push_back(line);
        true
    }

    pub fn next_line(&mut self) -> Option<String> {
        self.inbox.pop_front()
    }

    pub fn pending_lines(&self) -> usize {
        self.inbox.len()
    }

    pub fn clear_inbox(&mut self) {
        self.inbox.clear();
    }

    /// Push one outbound line. Failures mean the writer task is gone; the
    /// reader side will surface the disconnect, so errors are dropped here.
    pub fn send(&self, line: String) {
        debug_assert!(line.ends_with('\n'), "protocol lines are newline terminated");
        if self.sink.send(line).is_err() {
            tracing::trace!(target: "net", "send to disconnected client ignored");
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ClientState::Active
    }

    /// Name used in log lines; falls back to a placeholder before
    /// `client_set -name`.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}
