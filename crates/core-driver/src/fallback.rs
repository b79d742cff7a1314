//! Synthesized primitives for drivers that only implement the rendering
//! floor (`chr`/`string`).
//!
//! Every function takes the target driver plus the same arguments the native
//! primitive would receive; output is produced purely through `chr` and
//! `string`, so results are identical on any conforming module. Animations
//! (heartbeat, cursor blink) derive from the caller-supplied frame counter,
//! never from wall-clock time.

use crate::{CursorKind, Driver, Icon};

/// Cell fill rule shared by both bar orientations: cell `i` (0-based) of a
/// `len`-cell bar is lit iff `2*i < promille*len/500 + 1`.
fn bar_cells_lit(len: u16, promille: u16) -> u16 {
    let mut lit = 0;
    for i in 0..len {
        if 2 * u32::from(i) < u32::from(promille) * u32::from(len) / 500 + 1 {
            lit += 1;
        }
    }
    lit
}

/// Horizontal bar growing right from (x, y), `len` cells long.
pub fn hbar(drv: &mut dyn Driver, x: u16, y: u16, len: u16, promille: u16) {
    for i in 0..bar_cells_lit(len, promille) {
        drv.chr(x + i, y, '-');
    }
}

/// Vertical bar growing up from (x, y), `len` cells tall.
pub fn vbar(drv: &mut dyn Driver, x: u16, y: u16, len: u16, promille: u16) {
    for i in 0..bar_cells_lit(len, promille) {
        if y > i {
            drv.chr(x, y - i, '|');
        }
    }
}

/// Progress bar: begin/end labels with a horizontal fill between them.
/// Labels default to `[` and `]` when the caller provides none.
pub fn pbar(
    drv: &mut dyn Driver,
    x: u16,
    y: u16,
    width: u16,
    promille: u16,
    begin: Option<&str>,
    end: Option<&str>,
) {
    if width < 2 {
        return;
    }
    let begin = begin.filter(|s| !s.is_empty()).unwrap_or("[");
    let end = end.filter(|s| !s.is_empty()).unwrap_or("]");
    drv.chr(x, y, begin.chars().next().unwrap_or('['));
    drv.chr(x + width - 1, y, end.chars().next().unwrap_or(']'));
    let inner = width - 2;
    if inner > 0 {
        hbar(drv, x + 1, y, inner, promille);
    }
}

/// Big-number glyphs: 4 rows by 3 columns, digits 0-9 plus a colon at
/// index 10. The colon occupies a single column; callers advance x
/// accordingly.
pub const NUM_GLYPH_ROWS: usize = 4;
pub const NUM_GLYPH_COLS: usize = 3;

const NUM_GLYPHS: [[&str; NUM_GLYPH_ROWS]; 11] = [
    [" _ ", "| |", "|_|", "   "], // 0
    ["   ", "  |", "  |", "   "], // 1
    [" _ ", " _|", "|_ ", "   "], // 2
    [" _ ", " _|", " _|", "   "], // 3
    ["   ", "|_|", "  |", "   "], // 4
    [" _ ", "|_ ", " _|", "   "], // 5
    [" _ ", "|_ ", "|_|", "   "], // 6
    [" _ ", "  |", "  |", "   "], // 7
    [" _ ", "|_|", "|_|", "   "], // 8
    [" _ ", "|_|", " _|", "   "], // 9
    ["   ", " . ", " . ", "   "], // colon
];

/// Width in cells a glyph occupies (digits 3, colon 1).
pub fn num_width(digit: u8) -> u16 {
    if digit == 10 { 1 } else { NUM_GLYPH_COLS as u16 }
}

/// Draw a big digit with its top row at display row 1. Displays shorter than
/// the glyph height degrade to a plain character at (x, 1).
pub fn num(drv: &mut dyn Driver, height: u16, x: u16, digit: u8) {
    if digit > 10 {
        return;
    }
    if height < NUM_GLYPH_ROWS as u16 {
        let c = if digit == 10 {
            ':'
        } else {
            (b'0' + digit) as char
        };
        drv.chr(x, 1, c);
        return;
    }
    let width = num_width(digit) as usize;
    for (row, line) in NUM_GLYPHS[digit as usize].iter().enumerate() {
        drv.string(x, row as u16 + 1, &line[..width]);
    }
}

/// ASCII stand-in for an icon: one or two cells starting at (x, y).
pub fn icon(drv: &mut dyn Driver, x: u16, y: u16, icon: Icon) {
    drv.string(x, y, icon_text(icon));
}

/// Fixed icon-to-ASCII table used when a driver refuses an icon.
pub fn icon_text(icon: Icon) -> &'static str {
    match icon {
        Icon::BlockFilled => "#",
        Icon::HeartOpen => "-",
        Icon::HeartFilled => "#",
        Icon::ArrowUp => "^",
        Icon::ArrowDown => "v",
        Icon::ArrowLeft => "<",
        Icon::ArrowRight => ">",
        Icon::CheckboxOff => "N",
        Icon::CheckboxOn => "Y",
        Icon::CheckboxGray => "o",
        Icon::SelectorLeft => ">",
        Icon::SelectorRight => "<",
        Icon::Ellipsis => "..",
        Icon::Stop => "[]",
        Icon::Pause => "||",
        Icon::Play => ">",
        Icon::PlayReverse => "<",
        Icon::FastForward => ">>",
        Icon::Rewind => "<<",
        Icon::Next => ">|",
        Icon::Prev => "|<",
        Icon::Record => "()",
    }
}

/// Heartbeat indicator in the top-right corner, alternating between the two
/// heart icons on the frame counter.
pub fn heartbeat(drv: &mut dyn Driver, width: u16, frame: u64, native_icons: bool) {
    let which = if frame % 8 < 4 {
        Icon::HeartFilled
    } else {
        Icon::HeartOpen
    };
    if !native_icons || !drv.icon(width, 1, which) {
        icon(drv, width, 1, which);
    }
}

/// Software cursor: block or underscore, lit on alternating frame pairs.
pub fn cursor(drv: &mut dyn Driver, x: u16, y: u16, kind: CursorKind, frame: u64) {
    if frame % 4 >= 2 {
        return;
    }
    match kind {
        CursorKind::Off => {}
        CursorKind::On | CursorKind::Block => drv.chr(x, y, '#'),
        CursorKind::Underline => drv.chr(x, y, '_'),
    }
}
