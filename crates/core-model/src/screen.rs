//! Screens: named widget layouts competing for the display.

use core_driver::CursorKind;

use crate::{ClientKey, WidgetKey};

/// Scheduling class. Order matters: later variants preempt earlier ones.
/// `Hidden` screens are never chosen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    Hidden,
    Background,
    #[default]
    Info,
    Foreground,
    Alert,
    Input,
}

impl Priority {
    /// Parse a priority from the wire: a class name or the ordinal 0..=5.
    pub fn parse(token: &str) -> Option<Self> {
        if let Ok(n) = token.parse::<u8>() {
            return match n {
                0 => Some(Self::Hidden),
                1 => Some(Self::Background),
                2 => Some(Self::Info),
                3 => Some(Self::Foreground),
                4 => Some(Self::Alert),
                5 => Some(Self::Input),
                _ => None,
            };
        }
        match token.to_ascii_lowercase().as_str() {
            "hidden" => Some(Self::Hidden),
            "background" => Some(Self::Background),
            "info" => Some(Self::Info),
            "foreground" => Some(Self::Foreground),
            "alert" => Some(Self::Alert),
            "input" => Some(Self::Input),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Background => "background",
            Self::Info => "info",
            Self::Foreground => "foreground",
            Self::Alert => "alert",
            Self::Input => "input",
        }
    }
}

/// Backlight level plus the blink/flash modifiers, at any level of the
/// server -> client -> screen cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacklightMode {
    pub lit: bool,
    pub blink: bool,
    pub flash: bool,
}

impl BacklightMode {
    pub const ON: Self = Self {
        lit: true,
        blink: false,
        flash: false,
    };
    pub const OFF: Self = Self {
        lit: false,
        blink: false,
        flash: false,
    };

    /// Parse a wire token. `toggle` needs the current value; `open` clears
    /// the override and is handled by the caller, so both return `None`
    /// here only for unknown tokens.
    pub fn parse(token: &str, current: Option<Self>) -> Option<Option<Self>> {
        let mode = match token.to_ascii_lowercase().as_str() {
            "on" => Self::ON,
            "off" => Self::OFF,
            "toggle" => match current {
                Some(m) if m.lit => Self::OFF,
                _ => Self::ON,
            },
            "blink" => Self {
                blink: true,
                ..current.unwrap_or(Self::ON)
            },
            "flash" => Self {
                flash: true,
                ..current.unwrap_or(Self::ON)
            },
            "open" => return Some(None),
            _ => return None,
        };
        Some(Some(mode))
    }
}

/// Per-screen heartbeat override: forced on, forced off, or inherit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeartbeatOverride {
    On,
    Off,
    #[default]
    Open,
}

impl HeartbeatOverride {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "open" => Some(Self::Open),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenOwner {
    Server,
    Client(ClientKey),
}

pub struct Screen {
    /// Client-assigned id, unique within the owner.
    pub id: String,
    pub name: Option<String>,
    pub owner: ScreenOwner,
    pub width: u16,
    pub height: u16,
    /// Frame intervals this screen holds the display per rotation turn.
    pub duration: u32,
    /// Frame intervals after which the screen expires and is destroyed.
    pub timeout: Option<u32>,
    pub priority: Priority,
    pub backlight: Option<BacklightMode>,
    pub heartbeat: HeartbeatOverride,
    pub cursor: CursorKind,
    pub cursor_x: u16,
    pub cursor_y: u16,
    /// Keys this screen intercepts while visible.
    pub keys: Vec<String>,
    /// Top-level widgets in creation order.
    pub widgets: Vec<WidgetKey>,
}

impl Screen {
    /// Default hold time per rotation turn, in frame intervals.
    pub const DEFAULT_DURATION: u32 = 32;

    pub fn new(id: impl Into<String>, owner: ScreenOwner, width: u16, height: u16) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner,
            width,
            height,
            duration: Self::DEFAULT_DURATION,
            timeout: None,
            priority: Priority::default(),
            backlight: None,
            heartbeat: HeartbeatOverride::default(),
            cursor: CursorKind::Off,
            cursor_x: 1,
            cursor_y: 1,
            keys: Vec::new(),
            widgets: Vec::new(),
        }
    }

    pub fn add_key(&mut self, key: &str) {
        if !self.reserves_key(key) {
            self.keys.push(key.to_string());
        }
    }

    pub fn del_key(&mut self, key: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        before != self.keys.len()
    }

    pub fn reserves_key(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Name shown in the screens menu; falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_matches_preemption() {
        assert!(Priority::Input > Priority::Alert);
        assert!(Priority::Alert > Priority::Foreground);
        assert!(Priority::Foreground > Priority::Info);
        assert!(Priority::Info > Priority::Background);
        assert!(Priority::Background > Priority::Hidden);
    }

    #[test]
    fn priority_parses_names_and_ordinals() {
        assert_eq!(Priority::parse("foreground"), Some(Priority::Foreground));
        assert_eq!(Priority::parse("ALERT"), Some(Priority::Alert));
        assert_eq!(Priority::parse("2"), Some(Priority::Info));
        assert_eq!(Priority::parse("99"), None);
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn backlight_toggle_flips_current_state() {
        let on = BacklightMode::parse("toggle", None).unwrap();
        assert_eq!(on, Some(BacklightMode::ON));
        let off = BacklightMode::parse("toggle", on).unwrap();
        assert_eq!(off, Some(BacklightMode::OFF));
    }

    #[test]
    fn backlight_open_clears_the_override() {
        assert_eq!(
            BacklightMode::parse("open", Some(BacklightMode::ON)),
            Some(None)
        );
        assert_eq!(BacklightMode::parse("dim", None), None);
    }

    #[test]
    fn blink_preserves_the_underlying_level() {
        let mode = BacklightMode::parse("blink", Some(BacklightMode::OFF))
            .unwrap()
            .unwrap();
        assert!(!mode.lit);
        assert!(mode.blink);
    }

    #[test]
    fn screen_key_list_dedupes() {
        let mut s = Screen::new("s1", ScreenOwner::Server, 20, 4);
        s.add_key("Enter");
        s.add_key("Enter");
        assert_eq!(s.keys.len(), 1);
        assert!(s.del_key("Enter"));
        assert!(!s.del_key("Enter"));
    }
}
