//! Widgets: positioned display primitives inside a screen.
//!
//! Each kind is a discriminant plus its own payload; the renderer and the
//! `widget_set` handler both dispatch on the discriminant. A frame widget
//! owns an ordered child list, giving screens a recursive structure.

use core_driver::Icon;

use crate::{ScreenKey, WidgetKey};

/// Scroller submode, selected by the direction character of `widget_set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// `m`: continuous marquee with a gap between end and start.
    Marquee,
    /// `h`: horizontal ping-pong.
    Horizontal,
    /// `v`: vertical paging.
    Vertical,
}

impl ScrollDirection {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "m" | "M" => Some(Self::Marquee),
            "h" | "H" => Some(Self::Horizontal),
            "v" | "V" => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// Frame content scroll axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScroll {
    Horizontal,
    Vertical,
}

impl FrameScroll {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "h" | "H" => Some(Self::Horizontal),
            "v" | "V" => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// Where a widget hangs: directly off a screen, or inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetParent {
    Screen(ScreenKey),
    Frame(WidgetKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetKind {
    String {
        text: String,
    },
    /// Title bar: block-filled margins around centered, possibly bouncing
    /// text. Always rendered on the screen's first row.
    Title {
        text: String,
    },
    /// Horizontal bar; `length` is in pixel columns.
    Hbar {
        length: u16,
    },
    /// Vertical bar; `length` is in pixel rows.
    Vbar {
        length: u16,
    },
    /// Progress bar `width` cells wide at `promille` fill, with optional
    /// begin/end labels.
    Pbar {
        width: u16,
        promille: u16,
        begin_label: Option<String>,
        end_label: Option<String>,
    },
    Icon {
        icon: Icon,
    },
    /// Region scroller. The bounding box is (left, top)..=(right, bottom)
    /// in screen coordinates; `speed > 0` is frames per step, `speed < 0`
    /// is steps per frame, `0` is static.
    Scroller {
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
        direction: ScrollDirection,
        speed: i32,
        text: String,
    },
    /// Sub-screen with its own widget list, clipped to the box and
    /// optionally scrolling its virtual canvas.
    Frame {
        left: u16,
        top: u16,
        right: u16,
        bottom: u16,
        /// Virtual canvas size the children are laid out on.
        width: u16,
        height: u16,
        direction: FrameScroll,
        /// Frames per scroll step.
        speed: i32,
        children: Vec<WidgetKey>,
    },
    /// Big number: digit 0-9, or 10 for a colon.
    Num {
        digit: u8,
    },
}

impl WidgetKind {
    /// Fresh payload for a wire type name (`widget_add ... <type>`).
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "string" => Self::String { text: String::new() },
            "title" => Self::Title { text: String::new() },
            "hbar" => Self::Hbar { length: 0 },
            "vbar" => Self::Vbar { length: 0 },
            "pbar" => Self::Pbar {
                width: 0,
                promille: 0,
                begin_label: None,
                end_label: None,
            },
            "icon" => Self::Icon {
                icon: Icon::BlockFilled,
            },
            "scroller" => Self::Scroller {
                left: 1,
                top: 1,
                right: 1,
                bottom: 1,
                direction: ScrollDirection::Horizontal,
                speed: 1,
                text: String::new(),
            },
            "frame" => Self::Frame {
                left: 1,
                top: 1,
                right: 1,
                bottom: 1,
                width: 1,
                height: 1,
                direction: FrameScroll::Vertical,
                speed: 1,
                children: Vec::new(),
            },
            "num" => Self::Num { digit: 0 },
            _ => return None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String { .. } => "string",
            Self::Title { .. } => "title",
            Self::Hbar { .. } => "hbar",
            Self::Vbar { .. } => "vbar",
            Self::Pbar { .. } => "pbar",
            Self::Icon { .. } => "icon",
            Self::Scroller { .. } => "scroller",
            Self::Frame { .. } => "frame",
            Self::Num { .. } => "num",
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Self::Frame { .. })
    }
}

pub struct Widget {
    /// Id unique within the owning screen's whole widget tree.
    pub id: String,
    pub x: u16,
    pub y: u16,
    pub parent: WidgetParent,
    pub kind: WidgetKind,
}

impl Widget {
    pub fn new(id: impl Into<String>, parent: WidgetParent, kind: WidgetKind) -> Self {
        Self {
            id: id.into(),
            x: 1,
            y: 1,
            parent,
            kind,
        }
    }
}
