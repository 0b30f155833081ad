//! Mbind key binding daemon.
//!
//! Grabs the compiled-in key bindings on every X11 screen and launches the
//! bound commands when they are pressed.

use std::fmt::Display;

use tracing::error;

mod config;
mod daemon;
mod grab;
mod keyboard;
mod mbind;
mod server;
mod x11;

pub use crate::config::bindings;
pub use crate::mbind::Exit;
pub use crate::x11::{run, Error, SETUP_FAILURE};

/// Log an error, ignoring success.
pub fn trace_error<T, E: Display>(result: Result<T, E>) {
    if let Err(err) = &result {
        error!("{err}");
    }
}
