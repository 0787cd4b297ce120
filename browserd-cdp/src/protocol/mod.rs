//! Hand-rolled bindings for the handful of CDP domains the session
//! multiplexer drives. Unlike a full protocol binding generated from
//! `browser_protocol.pdl` / `js_protocol.pdl`, this only covers what
//! navigation, screenshotting, screencasting, and input dispatch need.

pub mod emulation;
pub mod input;
pub mod page;
pub mod runtime;
pub mod target;
