//! Menu items: kind payloads, edit state, and the option table behind
//! `menu_set_item`.

use core_model::ClientKey;

use crate::ItemKey;

/// Navigation target for wizard flows. The wire sentinels `_quit_`,
/// `_close_`, and `_none_` map to the first three variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    /// Close the whole menu.
    Quit,
    /// Go one level up.
    Close,
    /// Stay on the current item.
    Stay,
    /// Jump to a named item in the same scope.
    Item(String),
}

impl NavTarget {
    pub fn parse(token: &str) -> Self {
        match token {
            "_quit_" => Self::Quit,
            "_close_" => Self::Close,
            "_none_" => Self::Stay,
            id => Self::Item(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckState {
    #[default]
    Off,
    On,
    Gray,
}

impl CheckState {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "on" => Some(Self::On),
            "gray" => Some(Self::Gray),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Gray => "gray",
        }
    }

    pub fn next(&self, allow_gray: bool) -> Self {
        match (self, allow_gray) {
            (Self::Off, _) => Self::On,
            (Self::On, true) => Self::Gray,
            (Self::On, false) => Self::Off,
            (Self::Gray, _) => Self::Off,
        }
    }

    pub fn prev(&self, allow_gray: bool) -> Self {
        match (self, allow_gray) {
            (Self::Off, true) => Self::Gray,
            (Self::Off, false) => Self::On,
            (Self::On, _) => Self::Off,
            (Self::Gray, _) => Self::On,
        }
    }
}

/// Validation failure of an editor commit, rendered on the editor's error
/// row rather than sent to the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditError {
    #[default]
    None,
    OutOfRange,
    InvalidAddress,
}

impl EditError {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::OutOfRange => Some("out of range"),
            Self::InvalidAddress => Some("invalid address"),
        }
    }
}

/// Work-in-progress buffer of the numeric/alpha/ip editors. `pos` is the
/// cursor index into `buf`; `offs` is the horizontal scroll applied when
/// the buffer exceeds the display width.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditState {
    pub buf: String,
    pub pos: usize,
    pub offs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Menu {
        children: Vec<ItemKey>,
        /// Index into the visible (non-hidden) children.
        selected: usize,
        /// First visible child row shown (list scrolling).
        scroll: usize,
    },
    Action,
    Checkbox {
        value: CheckState,
        allow_gray: bool,
    },
    Ring {
        index: usize,
        strings: Vec<String>,
    },
    Slider {
        value: i64,
        min: i64,
        max: i64,
        step: i64,
        mintext: String,
        maxtext: String,
    },
    Numeric {
        value: i64,
        min: i64,
        max: i64,
        edit: EditState,
    },
    Alpha {
        value: String,
        password_char: Option<char>,
        minlength: usize,
        maxlength: usize,
        allow_caps: bool,
        allow_noncaps: bool,
        allow_numbers: bool,
        allowed_extra: String,
        edit: EditState,
    },
    Ip {
        value: String,
        v6: bool,
        edit: EditState,
    },
}

impl ItemKind {
    /// Fresh payload for a wire kind name (`menu_add_item ... <kind>`).
    pub fn from_kind_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "menu" => Self::Menu {
                children: Vec::new(),
                selected: 0,
                scroll: 0,
            },
            "action" => Self::Action,
            "checkbox" => Self::Checkbox {
                value: CheckState::Off,
                allow_gray: false,
            },
            "ring" => Self::Ring {
                index: 0,
                strings: Vec::new(),
            },
            "slider" => Self::Slider {
                value: 0,
                min: 0,
                max: 100,
                step: 1,
                mintext: String::new(),
                maxtext: String::new(),
            },
            "numeric" => Self::Numeric {
                value: 0,
                min: 0,
                max: i64::from(i32::MAX),
                edit: EditState::default(),
            },
            "alpha" => Self::Alpha {
                value: String::new(),
                password_char: None,
                minlength: 0,
                maxlength: 10,
                allow_caps: true,
                allow_noncaps: true,
                allow_numbers: false,
                allowed_extra: String::new(),
                edit: EditState::default(),
            },
            "ip" => Self::Ip {
                value: "0.0.0.0".to_string(),
                v6: false,
                edit: EditState::default(),
            },
            _ => return None,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Menu { .. } => "menu",
            Self::Action => "action",
            Self::Checkbox { .. } => "checkbox",
            Self::Ring { .. } => "ring",
            Self::Slider { .. } => "slider",
            Self::Numeric { .. } => "numeric",
            Self::Alpha { .. } => "alpha",
            Self::Ip { .. } => "ip",
        }
    }

    pub fn is_menu(&self) -> bool {
        matches!(self, Self::Menu { .. })
    }

    /// Items that open their own editor screen when entered.
    pub fn has_editor_screen(&self) -> bool {
        matches!(
            self,
            Self::Slider { .. } | Self::Numeric { .. } | Self::Alpha { .. } | Self::Ip { .. }
        )
    }
}

pub struct MenuItem {
    /// Id unique within the owning scope (one client's subtree, or the
    /// server's own items).
    pub id: String,
    pub text: String,
    pub parent: Option<ItemKey>,
    /// Owning client; `None` for server items.
    pub owner: Option<ClientKey>,
    pub hidden: bool,
    pub predecessor: Option<NavTarget>,
    pub successor: Option<NavTarget>,
    pub error: EditError,
    pub kind: ItemKind,
}

impl MenuItem {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        owner: Option<ClientKey>,
        kind: ItemKind,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            parent: None,
            owner,
            hidden: false,
            predecessor: None,
            successor: None,
            error: EditError::None,
            kind,
        }
    }

    /// Current value rendered for event payloads and list previews.
    pub fn value_text(&self) -> Option<String> {
        match &self.kind {
            ItemKind::Menu { .. } | ItemKind::Action => None,
            ItemKind::Checkbox { value, .. } => Some(value.name().to_string()),
            ItemKind::Ring { index, strings } => {
                strings.get(*index).cloned().or_else(|| Some(String::new()))
            }
            ItemKind::Slider { value, .. } => Some(value.to_string()),
            ItemKind::Numeric { value, .. } => Some(value.to_string()),
            ItemKind::Alpha { value, .. } => Some(value.clone()),
            ItemKind::Ip { value, .. } => Some(value.clone()),
        }
    }

    /// Ring index for event payloads (the protocol reports the index, the
    /// preview shows the string).
    pub fn event_payload(&self) -> Option<String> {
        match &self.kind {
            ItemKind::Ring { index, .. } => Some(index.to_string()),
            _ => self.value_text(),
        }
    }
}

fn parse_i64(opt: &str, value: &str) -> Result<i64, OptionError> {
    value.parse::<i64>().map_err(|_| OptionError::Type {
        opt: opt.to_string(),
        expected: "integer",
    })
}

fn parse_usize(opt: &str, value: &str) -> Result<usize, OptionError> {
    value.parse::<usize>().map_err(|_| OptionError::Type {
        opt: opt.to_string(),
        expected: "non-negative integer",
    })
}

fn parse_bool(opt: &str, value: &str) -> Result<bool, OptionError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" | "y" => Ok(true),
        "0" | "off" | "false" | "no" | "n" => Ok(false),
        _ => Err(OptionError::Type {
            opt: opt.to_string(),
            expected: "boolean",
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("unknown option \"-{0}\" for this item type")]
    Unknown(String),
    #[error("option \"-{opt}\" expects {expected}")]
    Type { opt: String, expected: &'static str },
    #[error("option \"-{opt}\" value out of range")]
    Range { opt: String },
}

impl MenuItem {
    /// Apply one `-option value` pair from `menu_set_item` / trailing
    /// `menu_add_item` options.
    pub fn set_option(&mut self, opt: &str, value: &str) -> Result<(), OptionError> {
        // options shared by every kind
        match opt {
            "text" => {
                self.text = value.to_string();
                return Ok(());
            }
            "is_hidden" => {
                self.hidden = parse_bool(opt, value)?;
                return Ok(());
            }
            "prev" => {
                self.predecessor = Some(NavTarget::parse(value));
                return Ok(());
            }
            "next" => {
                self.successor = Some(NavTarget::parse(value));
                return Ok(());
            }
            _ => {}
        }
        match &mut self.kind {
            ItemKind::Menu { .. } => Err(OptionError::Unknown(opt.to_string())),
            ItemKind::Action => match opt {
                // compatibility spelling: what ENTER should do after the
                // select event fires
                "menu_result" => {
                    self.successor = Some(match value {
                        "none" => NavTarget::Stay,
                        "close" => NavTarget::Close,
                        "quit" => NavTarget::Quit,
                        other => NavTarget::parse(other),
                    });
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Checkbox { value: v, allow_gray } => match opt {
                "value" => {
                    let parsed = CheckState::parse(value).ok_or(OptionError::Type {
                        opt: opt.to_string(),
                        expected: "off/on/gray",
                    })?;
                    if parsed == CheckState::Gray && !*allow_gray {
                        return Err(OptionError::Range {
                            opt: opt.to_string(),
                        });
                    }
                    *v = parsed;
                    Ok(())
                }
                "allow_gray" => {
                    *allow_gray = parse_bool(opt, value)?;
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Ring { index, strings } => match opt {
                "value" => {
                    let v = parse_usize(opt, value)?;
                    if !strings.is_empty() && v >= strings.len() {
                        return Err(OptionError::Range {
                            opt: opt.to_string(),
                        });
                    }
                    *index = v;
                    Ok(())
                }
                "strings" => {
                    *strings = value.split('\t').map(str::to_string).collect();
                    if *index >= strings.len() {
                        *index = 0;
                    }
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Slider {
                value: v,
                min,
                max,
                step,
                mintext,
                maxtext,
            } => match opt {
                "value" => {
                    let parsed = parse_i64(opt, value)?;
                    if parsed < *min || parsed > *max {
                        return Err(OptionError::Range {
                            opt: opt.to_string(),
                        });
                    }
                    *v = parsed;
                    Ok(())
                }
                "minvalue" => {
                    *min = parse_i64(opt, value)?;
                    *v = (*v).max(*min);
                    Ok(())
                }
                "maxvalue" => {
                    *max = parse_i64(opt, value)?;
                    *v = (*v).min(*max);
                    Ok(())
                }
                "stepsize" => {
                    *step = parse_i64(opt, value)?;
                    Ok(())
                }
                "mintext" => {
                    *mintext = value.to_string();
                    Ok(())
                }
                "maxtext" => {
                    *maxtext = value.to_string();
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Numeric {
                value: v, min, max, ..
            } => match opt {
                "value" => {
                    let parsed = parse_i64(opt, value)?;
                    if parsed < *min || parsed > *max {
                        return Err(OptionError::Range {
                            opt: opt.to_string(),
                        });
                    }
                    *v = parsed;
                    Ok(())
                }
                "minvalue" => {
                    *min = parse_i64(opt, value)?;
                    Ok(())
                }
                "maxvalue" => {
                    *max = parse_i64(opt, value)?;
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Alpha {
                value: v,
                password_char,
                minlength,
                maxlength,
                allow_caps,
                allow_noncaps,
                allow_numbers,
                allowed_extra,
                ..
            } => match opt {
                "value" => {
                    if value.len() > *maxlength {
                        return Err(OptionError::Range {
                            opt: opt.to_string(),
                        });
                    }
                    *v = value.to_string();
                    Ok(())
                }
                "password_char" => {
                    *password_char = value.chars().next();
                    Ok(())
                }
                "minlength" => {
                    *minlength = parse_usize(opt, value)?;
                    Ok(())
                }
                "maxlength" => {
                    *maxlength = parse_usize(opt, value)?;
                    Ok(())
                }
                "allow_caps" => {
                    *allow_caps = parse_bool(opt, value)?;
                    Ok(())
                }
                "allow_noncaps" => {
                    *allow_noncaps = parse_bool(opt, value)?;
                    Ok(())
                }
                "allow_numbers" => {
                    *allow_numbers = parse_bool(opt, value)?;
                    Ok(())
                }
                "allowed_extra" => {
                    *allowed_extra = value.to_string();
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
            ItemKind::Ip { value: v, v6, .. } => match opt {
                "value" => {
                    *v = value.to_string();
                    Ok(())
                }
                "v6" => {
                    *v6 = parse_bool(opt, value)?;
                    Ok(())
                }
                _ => Err(OptionError::Unknown(opt.to_string())),
            },
        }
    }
}
