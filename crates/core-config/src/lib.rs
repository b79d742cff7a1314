//! Configuration loading and the effective runtime settings.
//!
//! The config file is INI-shaped TOML: a `[server]` table, a `[menu]`
//! table, and one table per driver named after the driver. Multi-valued
//! keys (`Driver`, `Hello`, `GoodBye`) are arrays and preserve declaration
//! order. Unknown keys are ignored so configs can carry keys for driver
//! modules this binary does not compile in.
//!
//! Parsing yields [`ConfigFile`]; merging CLI overrides on top yields
//! [`Settings`], the immutable value the server threads around. A malformed
//! file is a startup abort, not a silent fallback to defaults.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 13666;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_USER: &str = "nobody";
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 125;
pub const DEFAULT_WAIT_TIME_SECS: u64 = 5;
pub const DEFAULT_REPORT_LEVEL: u8 = 2;

/// Interval of the process tick (socket drain + command dispatch + input).
pub const PROCESS_TICK: Duration = Duration::from_millis(125);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Three-valued switch: `0/off/false/no/n`, `1/on/true/yes/y`, or the
/// third state (`2`, `open`, or `blank` depending on the key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tristate {
    Off,
    On,
    #[default]
    Open,
}

impl Tristate {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "0" | "off" | "false" | "no" | "n" => Some(Self::Off),
            "1" | "on" | "true" | "yes" | "y" => Some(Self::On),
            "2" | "open" | "blank" => Some(Self::Open),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Tristate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TristateVisitor;

        impl de::Visitor<'_> for TristateVisitor {
            type Value = Tristate;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a boolean, 0/1/2, or off/on/open")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Tristate, E> {
                Ok(if v { Tristate::On } else { Tristate::Off })
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Tristate, E> {
                match v {
                    0 => Ok(Tristate::Off),
                    1 => Ok(Tristate::On),
                    2 => Ok(Tristate::Open),
                    other => Err(E::custom(format!("tristate out of range: {other}"))),
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Tristate, E> {
                Tristate::parse(v).ok_or_else(|| E::custom(format!("bad tristate \"{v}\"")))
            }
        }

        deserializer.deserialize_any(TristateVisitor)
    }
}

/// Boolean keys accept the same spellings as tristates minus the third
/// state: `0/off/false/no/n` and `1/on/true/yes/y`.
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct BoolVisitor;

    impl de::Visitor<'_> for BoolVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean, 0/1, or on/off")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            match v {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(E::custom(format!("bad boolean {other}"))),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match Tristate::parse(v) {
                Some(Tristate::Off) => Ok(false),
                Some(Tristate::On) => Ok(true),
                _ => Err(E::custom(format!("bad boolean \"{v}\""))),
            }
        }
    }

    deserializer.deserialize_any(BoolVisitor)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_user() -> String {
    DEFAULT_USER.to_string()
}
fn default_wait_time() -> u64 {
    DEFAULT_WAIT_TIME_SECS
}
fn default_true() -> bool {
    true
}
fn default_title_speed() -> u32 {
    1
}
fn default_frame_interval() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}
fn default_report_level() -> u8 {
    DEFAULT_REPORT_LEVEL
}
fn key_enter() -> String {
    "Enter".into()
}
fn key_left() -> String {
    "Left".into()
}
fn key_right() -> String {
    "Right".into()
}
fn key_up() -> String {
    "Up".into()
}
fn key_down() -> String {
    "Down".into()
}
fn key_menu() -> String {
    "Menu".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    #[serde(rename = "Port", default = "default_port")]
    pub port: u16,
    #[serde(rename = "Bind", default = "default_bind")]
    pub bind: String,
    #[serde(rename = "User", default = "default_user")]
    pub user: String,
    #[serde(rename = "DriverPath")]
    pub driver_path: Option<String>,
    #[serde(rename = "Driver")]
    pub drivers: Vec<String>,
    #[serde(rename = "WaitTime", default = "default_wait_time")]
    pub wait_time: u64,
    #[serde(rename = "Foreground", deserialize_with = "flexible_bool")]
    pub foreground: bool,
    #[serde(rename = "ServerScreen")]
    pub server_screen: Tristate,
    #[serde(rename = "Backlight")]
    pub backlight: Tristate,
    #[serde(rename = "Heartbeat")]
    pub heartbeat: Tristate,
    #[serde(
        rename = "AutoRotate",
        default = "default_true",
        deserialize_with = "flexible_bool"
    )]
    pub auto_rotate: bool,
    #[serde(rename = "TitleSpeed", default = "default_title_speed")]
    pub title_speed: u32,
    #[serde(rename = "FrameInterval", default = "default_frame_interval")]
    pub frame_interval_ms: u64,
    #[serde(rename = "ReportToSyslog", deserialize_with = "flexible_bool")]
    pub report_to_syslog: bool,
    #[serde(rename = "ReportLevel", default = "default_report_level")]
    pub report_level: u8,
    #[serde(rename = "Hello")]
    pub hello: Vec<String>,
    #[serde(rename = "GoodBye")]
    pub goodbye: Vec<String>,
    #[serde(rename = "ToggleRotateKey", default = "key_enter")]
    pub toggle_rotate_key: String,
    #[serde(rename = "PrevScreenKey", default = "key_left")]
    pub prev_screen_key: String,
    #[serde(rename = "NextScreenKey", default = "key_right")]
    pub next_screen_key: String,
    #[serde(rename = "ScrollUpKey", default = "key_up")]
    pub scroll_up_key: String,
    #[serde(rename = "ScrollDownKey", default = "key_down")]
    pub scroll_down_key: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            user: default_user(),
            driver_path: None,
            drivers: Vec::new(),
            wait_time: default_wait_time(),
            foreground: false,
            server_screen: Tristate::On,
            backlight: Tristate::Open,
            heartbeat: Tristate::Open,
            auto_rotate: true,
            title_speed: default_title_speed(),
            frame_interval_ms: default_frame_interval(),
            report_to_syslog: false,
            report_level: default_report_level(),
            hello: Vec::new(),
            goodbye: Vec::new(),
            toggle_rotate_key: key_enter(),
            prev_screen_key: key_left(),
            next_screen_key: key_right(),
            scroll_up_key: key_up(),
            scroll_down_key: key_down(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MenuSection {
    #[serde(rename = "MenuKey", default = "key_menu")]
    pub menu_key: String,
    #[serde(rename = "EnterKey", default = "key_enter")]
    pub enter_key: String,
    #[serde(rename = "UpKey", default = "key_up")]
    pub up_key: String,
    #[serde(rename = "DownKey", default = "key_down")]
    pub down_key: String,
    #[serde(rename = "LeftKey", default = "key_left")]
    pub left_key: String,
    #[serde(rename = "RightKey", default = "key_right")]
    pub right_key: String,
    #[serde(rename = "PermissiveGoto", deserialize_with = "flexible_bool")]
    pub permissive_goto: bool,
}

impl Default for MenuSection {
    fn default() -> Self {
        Self {
            menu_key: key_menu(),
            enter_key: key_enter(),
            up_key: key_up(),
            down_key: key_down(),
            left_key: key_left(),
            right_key: key_right(),
            permissive_goto: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(rename = "server", default)]
    pub server: ServerSection,
    #[serde(rename = "menu", default)]
    pub menu: MenuSection,
    /// One table per driver, keyed by driver name; values are handed to the
    /// driver constructor as strings.
    #[serde(flatten)]
    pub drivers: BTreeMap<String, toml::Table>,
}

/// Best-effort config path: local file first, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("glintd.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("glintd").join("glintd.toml");
    }
    local
}

/// Load and parse a config file. A missing file yields defaults; an
/// unreadable or malformed one is an error (startup aborts on it).
pub fn load_from(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(discover);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(target: "config", path = %path.display(), "no config file, using defaults");
            return Ok(ConfigFile::default());
        }
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    toml::from_str::<ConfigFile>(&content).map_err(|e| ConfigError::Parse {
        path,
        message: e.to_string(),
    })
}

/// Key names driving server-level actions from the input router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeys {
    pub toggle_rotate: String,
    pub prev_screen: String,
    pub next_screen: String,
    pub scroll_up: String,
    pub scroll_down: String,
}

/// Key names driving menu navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuKeys {
    pub menu: String,
    pub enter: String,
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
}

/// Effective, immutable runtime settings: config file merged with CLI
/// overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub user: String,
    pub foreground: bool,
    pub wait_time: Duration,
    pub report_level: u8,
    pub report_to_syslog: bool,
    pub drivers: Vec<String>,
    pub server_screen: Tristate,
    pub backlight: Tristate,
    pub heartbeat: Tristate,
    pub auto_rotate: bool,
    pub title_speed: u32,
    pub frame_interval: Duration,
    pub hello: Vec<String>,
    pub goodbye: Vec<String>,
    pub server_keys: ServerKeys,
    pub menu_keys: MenuKeys,
    pub permissive_goto: bool,
    /// Per-driver config values, stringified for the driver layer.
    pub driver_tables: BTreeMap<String, BTreeMap<String, String>>,
}

impl Settings {
    pub fn from_file(file: &ConfigFile) -> Self {
        let s = &file.server;
        let m = &file.menu;
        let mut driver_tables = BTreeMap::new();
        for (name, table) in &file.drivers {
            let mut flat = BTreeMap::new();
            for (key, value) in table {
                flat.insert(key.clone(), toml_value_to_string(value));
            }
            driver_tables.insert(name.clone(), flat);
        }
        Self {
            bind: s.bind.clone(),
            port: s.port,
            user: s.user.clone(),
            foreground: s.foreground,
            wait_time: Duration::from_secs(s.wait_time),
            report_level: s.report_level.min(5),
            report_to_syslog: s.report_to_syslog,
            drivers: s.drivers.clone(),
            server_screen: s.server_screen,
            backlight: s.backlight,
            heartbeat: s.heartbeat,
            auto_rotate: s.auto_rotate,
            title_speed: s.title_speed.max(1),
            frame_interval: Duration::from_millis(s.frame_interval_ms.max(10)),
            hello: s.hello.clone(),
            goodbye: s.goodbye.clone(),
            server_keys: ServerKeys {
                toggle_rotate: s.toggle_rotate_key.clone(),
                prev_screen: s.prev_screen_key.clone(),
                next_screen: s.next_screen_key.clone(),
                scroll_up: s.scroll_up_key.clone(),
                scroll_down: s.scroll_down_key.clone(),
            },
            menu_keys: MenuKeys {
                menu: m.menu_key.clone(),
                enter: m.enter_key.clone(),
                up: m.up_key.clone(),
                down: m.down_key.clone(),
                left: m.left_key.clone(),
                right: m.right_key.clone(),
            },
            permissive_goto: m.permissive_goto,
            driver_tables,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_file(&ConfigFile::default())
    }
}

fn toml_value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
