//! Frame rendering: walk the chosen screen's widget tree and emit driver
//! primitives.
//!
//! Rendering is a pure function of widget state plus the frame counter;
//! widgets are never mutated during a walk, so every animation (title
//! bounce, scroller, frame scroll, blink) is derived from `state.frame`
//! and replays deterministically.

pub mod engine;
pub mod scroll;

pub use engine::render_frame;
