//! The per-frame render walk.
//!
//! Coordinates are computed in `i32` screen space (frame scrolling can
//! push children above or left of the display) and clipped against the
//! enclosing frame's rectangle before anything reaches a driver. Driver
//! calls happen only for cells inside the clip.

use core_driver::CursorKind;
use core_model::{
    EntityStore, FrameScroll, ScrollDirection, Widget, WidgetKey, WidgetKind,
};
use core_state::{ServerState, Visibility};

use crate::scroll;

/// Inclusive clip rectangle in 1-based display coordinates.
#[derive(Debug, Clone, Copy)]
struct Clip {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Clip {
    fn intersect(&self, other: Clip) -> Clip {
        Clip {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }

    fn contains_row(&self, y: i32) -> bool {
        y >= self.top && y <= self.bottom
    }
}

/// Frame-relative rendering context: where widget (1,1) lands, and the
/// visible rectangle.
#[derive(Debug, Clone, Copy)]
struct Ctx {
    ox: i32,
    oy: i32,
    clip: Clip,
}

struct Walk<'a> {
    store: &'a EntityStore,
    drivers: &'a mut core_driver::DriverSet,
    frame: u64,
    title_speed: i32,
    cellwidth: u16,
    cellheight: u16,
}

impl<'a> Walk<'a> {
    fn render_list(&mut self, widgets: &[WidgetKey], ctx: Ctx) {
        let store = self.store;
        for &key in widgets {
            if let Some(widget) = store.widget(key) {
                self.render_widget(widget, ctx);
            }
        }
    }
}

/// Render one frame: advance the rotation, walk the chosen screen, paint
/// toast/heartbeat/cursor, apply the backlight cascade, and flush.
/// Returns the visibility notifications for the socket layer.
pub fn render_frame(state: &mut ServerState) -> Vec<Visibility> {
    state.frame = state.frame.wrapping_add(1);
    state.sync_menu_screen();
    let (selection, visibility) = state.screenlist.tick(&mut state.store);

    let frame = state.frame;
    let props = state.props;
    {
        let store = &state.store;
        let drivers = &mut state.drivers;
        drivers.clear();
        if let Some(screen) = selection.and_then(|k| store.screen(k)) {
            let clip = Clip {
                left: 1,
                top: 1,
                right: i32::from(props.width.min(screen.width)),
                bottom: i32::from(props.height.min(screen.height)),
            };
            let mut walk = Walk {
                store,
                drivers,
                frame,
                title_speed: state.settings.title_speed as i32,
                cellwidth: props.cellwidth,
                cellheight: props.cellheight,
            };
            walk.render_list(&screen.widgets, Ctx { ox: 1, oy: 1, clip });
            if screen.cursor != CursorKind::Off {
                walk.drivers
                    .cursor(screen.cursor_x, screen.cursor_y, screen.cursor, frame);
            }
        }
    }

    if let Some(text) = state.current_toast() {
        let len = text.chars().count() as u16;
        let x = state.props.width.saturating_sub(len) + 1;
        state.drivers.string(x.max(1), state.props.height, &text);
    }

    let heartbeat = state.effective_heartbeat(selection);
    state.drivers.heartbeat(heartbeat, frame);

    let backlight = state.effective_backlight(selection);
    let mut lit = backlight.lit;
    if backlight.blink {
        lit ^= (frame >> 3) & 1 == 1;
    }
    if backlight.flash {
        lit ^= (frame >> 6) & 1 == 1;
    }
    state.drivers.backlight(lit);

    state.drivers.flush();
    visibility
}

impl Walk<'_> {
    fn render_widget(&mut self, widget: &Widget, ctx: Ctx) {
        let x = ctx.ox + i32::from(widget.x) - 1;
        let y = ctx.oy + i32::from(widget.y) - 1;
        match &widget.kind {
            WidgetKind::String { text } => self.draw_string(ctx.clip, x, y, text),
            WidgetKind::Title { text } => self.draw_title(ctx, text),
            WidgetKind::Hbar { length } => self.draw_hbar(ctx.clip, x, y, *length),
            WidgetKind::Vbar { length } => self.draw_vbar(ctx.clip, x, y, *length),
            WidgetKind::Pbar {
                width,
                promille,
                begin_label,
                end_label,
            } => self.draw_pbar(
                ctx.clip,
                x,
                y,
                *width,
                *promille,
                begin_label.as_deref(),
                end_label.as_deref(),
            ),
            WidgetKind::Icon { icon } => {
                if ctx.clip.contains_row(y) && x >= ctx.clip.left && x <= ctx.clip.right {
                    self.drivers.icon(x as u16, y as u16, *icon);
                }
            }
            WidgetKind::Num { digit } => {
                if x >= 1 && x <= ctx.clip.right {
                    self.drivers.num(x as u16, *digit);
                }
            }
            WidgetKind::Scroller {
                left,
                top,
                right,
                bottom,
                direction,
                speed,
                text,
            } => {
                let box_clip = Clip {
                    left: ctx.ox + i32::from(*left) - 1,
                    top: ctx.oy + i32::from(*top) - 1,
                    right: ctx.ox + i32::from(*right) - 1,
                    bottom: ctx.oy + i32::from(*bottom) - 1,
                }
                .intersect(ctx.clip);
                self.draw_scroller(box_clip, *direction, *speed, text);
            }
            WidgetKind::Frame {
                left,
                top,
                right,
                bottom,
                width,
                height,
                direction,
                speed,
                children,
            } => {
                let box_clip = Clip {
                    left: ctx.ox + i32::from(*left) - 1,
                    top: ctx.oy + i32::from(*top) - 1,
                    right: ctx.ox + i32::from(*right) - 1,
                    bottom: ctx.oy + i32::from(*bottom) - 1,
                }
                .intersect(ctx.clip);
                if box_clip.right < box_clip.left || box_clip.bottom < box_clip.top {
                    return;
                }
                let rows = (box_clip.bottom - box_clip.top + 1) as u16;
                let cols = (box_clip.right - box_clip.left + 1) as u16;
                let steps = scroll::steps(self.frame, *speed);
                let (dx, dy) = match direction {
                    FrameScroll::Vertical => {
                        let overflow = height.saturating_sub(rows);
                        (0, offset_within(overflow, steps))
                    }
                    // mirrors the vertical formula on the other axis
                    FrameScroll::Horizontal => {
                        let overflow = width.saturating_sub(cols);
                        (offset_within(overflow, steps), 0)
                    }
                };
                let inner = Ctx {
                    ox: box_clip.left - dx,
                    oy: box_clip.top - dy,
                    clip: box_clip,
                };
                self.render_list(children, inner);
            }
        }
    }

    fn draw_string(&mut self, clip: Clip, x: i32, y: i32, text: &str) {
        if !clip.contains_row(y) || x > clip.right {
            return;
        }
        let skip = (clip.left - x).max(0) as usize;
        let x = x.max(clip.left);
        let take = (clip.right - x + 1).max(0) as usize;
        let shown: String = text.chars().skip(skip).take(take).collect();
        if !shown.is_empty() {
            self.drivers.string(x as u16, y as u16, &shown);
        }
    }

    /// Title bar: two filled blocks, the text (bouncing when too wide),
    /// and a block fill to the right edge, on the screen's first row.
    fn draw_title(&mut self, ctx: Ctx, text: &str) {
        let y = ctx.oy;
        if !ctx.clip.contains_row(y) {
            return;
        }
        let total = (ctx.clip.right - ctx.ox + 1).max(0) as usize;
        if total < 8 {
            self.draw_string(ctx.clip, ctx.ox, y, text);
            return;
        }
        let avail = total - 6;
        let len = text.chars().count();
        let shown: String = if len <= avail {
            text.to_string()
        } else {
            let steps = scroll::steps(self.frame, self.title_speed.max(1));
            let offset = scroll::bounce(steps, len - avail);
            text.chars().skip(offset).take(avail).collect()
        };
        for i in 0..2 {
            self.drivers
                .icon((ctx.ox + i) as u16, y as u16, core_driver::Icon::BlockFilled);
        }
        self.draw_string(ctx.clip, ctx.ox + 3, y, &shown);
        let text_end = ctx.ox + 3 + shown.chars().count() as i32;
        for x in (text_end + 1)..=ctx.clip.right {
            self.drivers
                .icon(x as u16, y as u16, core_driver::Icon::BlockFilled);
        }
    }

    fn draw_hbar(&mut self, clip: Clip, x: i32, y: i32, length: u16) {
        if !clip.contains_row(y) || x < clip.left || x > clip.right || length == 0 {
            return;
        }
        let avail = (clip.right - x + 1) as u16;
        let cells = length
            .div_ceil(self.cellwidth)
            .clamp(1, avail);
        let promille = promille_of(length, cells, self.cellwidth);
        self.drivers.hbar(x as u16, y as u16, cells, promille);
    }

    fn draw_vbar(&mut self, clip: Clip, x: i32, y: i32, length: u16) {
        if x < clip.left || x > clip.right || y < clip.top || y > clip.bottom || length == 0 {
            return;
        }
        let avail = (y - clip.top + 1) as u16;
        let cells = length
            .div_ceil(self.cellheight)
            .clamp(1, avail);
        let promille = promille_of(length, cells, self.cellheight);
        self.drivers.vbar(x as u16, y as u16, cells, promille);
    }

    fn draw_pbar(
        &mut self,
        clip: Clip,
        x: i32,
        y: i32,
        width: u16,
        promille: u16,
        begin: Option<&str>,
        end: Option<&str>,
    ) {
        if !clip.contains_row(y) || x < clip.left || x > clip.right || width < 2 {
            return;
        }
        let avail = (clip.right - x + 1) as u16;
        let width = width.min(avail);
        self.drivers
            .pbar(x as u16, y as u16, width, promille.min(1000), begin, end);
    }

    fn draw_scroller(&mut self, clip: Clip, direction: ScrollDirection, speed: i32, text: &str) {
        if clip.right < clip.left || clip.bottom < clip.top {
            return;
        }
        let avail = (clip.right - clip.left + 1) as usize;
        let rows = (clip.bottom - clip.top + 1) as usize;
        let steps = scroll::steps(self.frame, speed);
        match direction {
            ScrollDirection::Marquee => {
                let shown = scroll::marquee_window(text, avail, steps);
                self.draw_string(clip, clip.left, clip.top, &shown);
            }
            ScrollDirection::Horizontal => {
                let len = text.chars().count();
                let offset = if len > avail && speed != 0 {
                    scroll::bounce(steps, len - avail)
                } else {
                    0
                };
                let shown: String = text.chars().skip(offset).take(avail).collect();
                self.draw_string(clip, clip.left, clip.top, &shown);
            }
            ScrollDirection::Vertical => {
                let lines = scroll::wrap_rows(text, avail);
                let offset = if speed != 0 {
                    scroll::vertical_offset(lines.len(), rows, steps)
                } else {
                    0
                };
                for (i, line) in lines.iter().skip(offset).take(rows).enumerate() {
                    self.draw_string(clip, clip.left, clip.top + i as i32, line);
                }
            }
        }
    }
}

/// Scroll offset cycling through `overflow + 1` positions.
fn offset_within(overflow: u16, steps: u64) -> i32 {
    if overflow == 0 {
        return 0;
    }
    (steps % (u64::from(overflow) + 1)) as i32
}

/// Pixel length over a cell run expressed as a fill level.
fn promille_of(length: u16, cells: u16, cellsize: u16) -> u16 {
    let span = u32::from(cells) * u32::from(cellsize);
    if span == 0 {
        return 0;
    }
    ((u32::from(length) * 1000 / span).min(1000)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promille_saturates_at_full_scale() {
        assert_eq!(promille_of(50, 10, 5), 1000);
        assert_eq!(promille_of(25, 10, 5), 500);
        assert_eq!(promille_of(200, 10, 5), 1000);
        assert_eq!(promille_of(10, 0, 5), 0);
    }

    #[test]
    fn clip_intersection_shrinks_both_axes() {
        let a = Clip { left: 1, top: 1, right: 20, bottom: 4 };
        let b = Clip { left: 3, top: 2, right: 25, bottom: 3 };
        let c = a.intersect(b);
        assert_eq!((c.left, c.top, c.right, c.bottom), (3, 2, 20, 3));
    }

    #[test]
    fn offset_cycles_over_overflow_positions() {
        assert_eq!(offset_within(0, 99), 0);
        let seq: Vec<i32> = (0..5).map(|s| offset_within(2, s)).collect();
        assert_eq!(seq, vec![0, 1, 2, 0, 1]);
    }
}
