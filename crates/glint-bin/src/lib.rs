//! glintd runtime: startup plumbing and the main event loop, kept in a
//! library so the socket-level scenarios in `tests/` can drive a real
//! server in-process.

pub mod runtime;

pub use runtime::{build_drivers, build_state, serve, Overrides};
