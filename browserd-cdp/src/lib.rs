//! Minimal Chrome DevTools Protocol client driving one native Chromium
//! instance: process launch, a single multiplexed websocket, and typed
//! bindings for the Target/Page/Runtime/Input/Emulation domains the session
//! multiplexer needs.

pub mod browser;
mod conn;
pub mod error;
mod handler;
pub mod page;
pub mod process;
pub mod protocol;
pub mod types;

pub use browser::Browser;
pub use error::{CdpError, Result};
pub use handler::HandlerHandle;
pub use page::Page;
pub use process::LaunchConfig;
