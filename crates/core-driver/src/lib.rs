//! Display driver abstraction: the capability surface the core consumes from
//! hardware modules.
//!
//! A driver is a boxed trait object. Mandatory methods (`name`, `api_version`,
//! `init`, `close`) must be supplied; every display primitive is optional and
//! advertised through a [`Caps`] bitset. The core never calls a primitive the
//! driver did not advertise; [`set::DriverSet`] routes unsupported calls to
//! the synthesized fallbacks in [`fallback`], which reduce everything to
//! `chr`/`string` on a character grid.
//!
//! Invariants:
//! * A loaded driver's `api_version` equals [`API_VERSION`] (the registry
//!   rejects mismatches before `init`).
//! * Exactly one loaded driver is the output driver; its geometry populates
//!   the process-wide [`DisplayProps`].
//! * All primitives are non-blocking; `get_key` returns immediately.

use std::any::Any;
use std::collections::BTreeMap;

pub mod debug_drv;
pub mod fallback;
pub mod registry;
pub mod set;
pub mod term;

pub use debug_drv::DebugDriver;
pub use registry::DriverRegistry;
pub use set::DriverSet;

/// Driver interface revision. Checked at load time against each module's
/// reported version; a mismatch is fatal for that module.
pub const API_VERSION: &str = "0.5";

/// Geometry of the output display, populated from the output driver at load
/// time and constant for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayProps {
    /// Width in character cells.
    pub width: u16,
    /// Height in character cells.
    pub height: u16,
    /// Pixel columns per cell.
    pub cellwidth: u16,
    /// Pixel rows per cell.
    pub cellheight: u16,
}

impl DisplayProps {
    pub const DEFAULT_CELL_WIDTH: u16 = 5;
    pub const DEFAULT_CELL_HEIGHT: u16 = 8;

    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cellwidth: Self::DEFAULT_CELL_WIDTH,
            cellheight: Self::DEFAULT_CELL_HEIGHT,
        }
    }
}

impl Default for DisplayProps {
    fn default() -> Self {
        Self::new(20, 4)
    }
}

bitflags::bitflags! {
    /// Primitives a driver implements natively. Anything missing is
    /// synthesized by the core from `chr`/`string`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Caps: u32 {
        /// Reports real geometry; eligible to be the output driver.
        const GEOMETRY   = 1 << 0;
        const HBAR       = 1 << 1;
        const VBAR       = 1 << 2;
        const PBAR       = 1 << 3;
        const NUM        = 1 << 4;
        const ICON       = 1 << 5;
        const HEARTBEAT  = 1 << 6;
        const CURSOR     = 1 << 7;
        const BACKLIGHT  = 1 << 8;
        const OUTPUT     = 1 << 9;
        const CONTRAST   = 1 << 10;
        const BRIGHTNESS = 1 << 11;
        /// Produces key events via `get_key`.
        const KEYS       = 1 << 12;
        const INFO       = 1 << 13;
    }
}

/// Icon identifiers a client may place with an icon widget. Drivers may
/// implement any subset natively; the rest degrade to one or two ASCII cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    BlockFilled,
    HeartOpen,
    HeartFilled,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    CheckboxOff,
    CheckboxOn,
    CheckboxGray,
    SelectorLeft,
    SelectorRight,
    Ellipsis,
    Stop,
    Pause,
    Play,
    PlayReverse,
    FastForward,
    Rewind,
    Next,
    Prev,
    Record,
}

impl Icon {
    /// Wire name used by `widget_set ... <icon>` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Some(match upper.as_str() {
            "BLOCK_FILLED" => Self::BlockFilled,
            "HEART_OPEN" => Self::HeartOpen,
            "HEART_FILLED" => Self::HeartFilled,
            "ARROW_UP" => Self::ArrowUp,
            "ARROW_DOWN" => Self::ArrowDown,
            "ARROW_LEFT" => Self::ArrowLeft,
            "ARROW_RIGHT" => Self::ArrowRight,
            "CHECKBOX_OFF" => Self::CheckboxOff,
            "CHECKBOX_ON" => Self::CheckboxOn,
            "CHECKBOX_GRAY" => Self::CheckboxGray,
            "SELECTOR_AT_LEFT" => Self::SelectorLeft,
            "SELECTOR_AT_RIGHT" => Self::SelectorRight,
            "ELLIPSIS" => Self::Ellipsis,
            "STOP" => Self::Stop,
            "PAUSE" => Self::Pause,
            "PLAY" => Self::Play,
            "PLAYR" => Self::PlayReverse,
            "FF" => Self::FastForward,
            "FR" => Self::Rewind,
            "NEXT" => Self::Next,
            "PREV" => Self::Prev,
            "REC" => Self::Record,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BlockFilled => "BLOCK_FILLED",
            Self::HeartOpen => "HEART_OPEN",
            Self::HeartFilled => "HEART_FILLED",
            Self::ArrowUp => "ARROW_UP",
            Self::ArrowDown => "ARROW_DOWN",
            Self::ArrowLeft => "ARROW_LEFT",
            Self::ArrowRight => "ARROW_RIGHT",
            Self::CheckboxOff => "CHECKBOX_OFF",
            Self::CheckboxOn => "CHECKBOX_ON",
            Self::CheckboxGray => "CHECKBOX_GRAY",
            Self::SelectorLeft => "SELECTOR_AT_LEFT",
            Self::SelectorRight => "SELECTOR_AT_RIGHT",
            Self::Ellipsis => "ELLIPSIS",
            Self::Stop => "STOP",
            Self::Pause => "PAUSE",
            Self::Play => "PLAY",
            Self::PlayReverse => "PLAYR",
            Self::FastForward => "FF",
            Self::Rewind => "FR",
            Self::Next => "NEXT",
            Self::Prev => "PREV",
            Self::Record => "REC",
        }
    }
}

/// Cursor shapes a screen may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorKind {
    #[default]
    Off,
    /// Driver default cursor (fallback draws a blinking block).
    On,
    Block,
    Underline,
}

/// Typed failures while locating, configuring, or initializing a driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("unknown driver \"{0}\"")]
    Unknown(String),
    #[error("driver \"{driver}\" reports API {found}, server requires {expected}")]
    ApiMismatch {
        driver: String,
        found: String,
        expected: &'static str,
    },
    #[error("driver \"{driver}\" failed to initialize: {reason}")]
    Init { driver: String, reason: String },
    #[error("driver \"{driver}\": bad value for \"{key}\": {reason}")]
    Config {
        driver: String,
        key: String,
        reason: String,
    },
    #[error("no loaded driver provides an output display")]
    NoOutputDriver,
}

/// Per-driver configuration handed to constructors. The core supplies the
/// values; drivers never touch the config file themselves.
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    values: BTreeMap<String, String>,
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_ascii_lowercase(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn get_u16(&self, key: &str, default: u16) -> Result<u16, String> {
        match self.get_str(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("expected an integer, got \"{raw}\"")),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, String> {
        match self.get_str(key) {
            None => Ok(default),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "on" | "true" | "yes" | "y" => Ok(true),
                "0" | "off" | "false" | "no" | "n" => Ok(false),
                other => Err(format!("expected a boolean, got \"{other}\"")),
            },
        }
    }

    /// Parse a `WxH` geometry value such as `20x4`.
    pub fn get_size(&self, key: &str, default: (u16, u16)) -> Result<(u16, u16), String> {
        match self.get_str(key) {
            None => Ok(default),
            Some(raw) => {
                let (w, h) = raw
                    .split_once(['x', 'X'])
                    .ok_or_else(|| format!("expected WxH, got \"{raw}\""))?;
                let w = w.trim().parse::<u16>().map_err(|_| format!("bad width in \"{raw}\""))?;
                let h = h.trim().parse::<u16>().map_err(|_| format!("bad height in \"{raw}\""))?;
                if w == 0 || h == 0 {
                    return Err(format!("zero dimension in \"{raw}\""));
                }
                Ok((w, h))
            }
        }
    }
}

/// The capability surface of one loaded display module.
///
/// Coordinates are 1-based with origin at the top-left cell, matching the
/// wire protocol. Implementations may assume the caller has already clipped
/// to the display, but must tolerate out-of-range coordinates by ignoring
/// them.
impl std::fmt::Debug for dyn Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver").field("name", &self.name()).finish()
    }
}

pub trait Driver: Send {
    /// Stable module name (`debug`, `term`, ...). Also the config table name.
    fn name(&self) -> &'static str;

    fn api_version(&self) -> &'static str {
        API_VERSION
    }

    /// Primitives implemented natively.
    fn caps(&self) -> Caps;

    /// True when the module must keep the process in the foreground
    /// (it owns the controlling terminal).
    fn stay_in_foreground(&self) -> bool {
        false
    }

    /// Bring up the hardware. Called once after construction.
    fn init(&mut self) -> Result<(), DriverError>;

    /// Release the hardware. Called once during shutdown or reload.
    fn close(&mut self);

    // --- geometry (meaningful with Caps::GEOMETRY) -------------------------

    fn width(&self) -> u16 {
        0
    }
    fn height(&self) -> u16 {
        0
    }
    fn cellwidth(&self) -> u16 {
        DisplayProps::DEFAULT_CELL_WIDTH
    }
    fn cellheight(&self) -> u16 {
        DisplayProps::DEFAULT_CELL_HEIGHT
    }

    // --- required rendering floor -----------------------------------------

    fn clear(&mut self);
    fn flush(&mut self) {}
    fn string(&mut self, x: u16, y: u16, text: &str);
    fn chr(&mut self, x: u16, y: u16, c: char);

    // --- optional primitives (guarded by caps) ----------------------------

    fn hbar(&mut self, _x: u16, _y: u16, _len: u16, _promille: u16) {}
    fn vbar(&mut self, _x: u16, _y: u16, _len: u16, _promille: u16) {}
    fn pbar(
        &mut self,
        _x: u16,
        _y: u16,
        _width: u16,
        _promille: u16,
        _begin: Option<&str>,
        _end: Option<&str>,
    ) {
    }
    fn num(&mut self, _x: u16, _digit: u8) {}
    /// Returns false when this particular icon is not representable; the
    /// caller then falls back to the ASCII table.
    fn icon(&mut self, _x: u16, _y: u16, _icon: Icon) -> bool {
        false
    }
    fn heartbeat(&mut self, _on: bool) {}
    fn cursor(&mut self, _x: u16, _y: u16, _kind: CursorKind) {}
    fn backlight(&mut self, _on: bool) {}
    fn output(&mut self, _state: i64) {}
    /// Define a custom glyph in the driver's character generator.
    fn set_char(&mut self, _code: u8, _bitmap: &[u8]) {}
    /// Custom-glyph slots still available.
    fn get_free_chars(&self) -> u16 {
        0
    }
    fn set_macro_leds(&mut self, _state: u32) {}
    fn get_contrast(&self) -> u16 {
        0
    }
    fn set_contrast(&mut self, _value: u16) {}
    fn get_brightness(&self) -> u16 {
        0
    }
    fn set_brightness(&mut self, _value: u16) {}

    /// Next pending key name, if any. Must not block.
    fn get_key(&mut self) -> Option<String> {
        None
    }

    fn info(&mut self) -> String {
        String::new()
    }

    /// Downcast hook for tests and driver-specific tooling.
    fn as_any(&mut self) -> &mut dyn Any;
}
