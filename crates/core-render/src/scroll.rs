//! Scroll-offset arithmetic shared by titles, scrollers, and frames.
//!
//! Everything is a pure function of the frame counter so a frame can be
//! re-rendered byte-identically at any time.

/// Animation steps elapsed at `frame` for a widget speed. Positive speed
/// is frames per step, negative is steps per frame, zero is static.
pub fn steps(frame: u64, speed: i32) -> u64 {
    match speed {
        0 => 0,
        s if s > 0 => frame / s as u64,
        s => frame.saturating_mul(s.unsigned_abs() as u64),
    }
}

/// Ping-pong offset across `range` positions (title bounce, horizontal
/// scroller). Returns 0 when there is nowhere to go.
pub fn bounce(steps: u64, range: usize) -> usize {
    if range == 0 {
        return 0;
    }
    let cycle = 2 * range as u64;
    let phase = steps % cycle;
    if phase < range as u64 {
        phase as usize
    } else {
        (cycle - phase) as usize
    }
}

/// One marquee window: `avail` display cells over `text` with a trailing
/// gap of half the window, repeating continuously.
pub fn marquee_window(text: &str, avail: usize, steps: u64) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= avail {
        return text.to_string();
    }
    let gap = avail / 2;
    let cycle = chars.len() + gap;
    let shift = (steps % cycle as u64) as usize;
    (0..avail)
        .map(|i| {
            let idx = (shift + i) % cycle;
            chars.get(idx).copied().unwrap_or(' ')
        })
        .collect()
}

/// Hard-wrap text into `width`-cell rows for the vertical scroller.
pub fn wrap_rows(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// First visible row of a vertical scroller: pages advance one row per
/// step, wrapping after the last full window.
pub fn vertical_offset(total_rows: usize, visible_rows: usize, steps: u64) -> usize {
    if total_rows <= visible_rows || visible_rows == 0 {
        return 0;
    }
    let range = total_rows - visible_rows + 1;
    (steps % range as u64) as usize
}
