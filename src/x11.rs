//! X11 backend.

use std::ffi::CStr;
use std::io;
use std::os::unix::io::AsFd;

use calloop::generic::Generic;
use calloop::{EventLoop, Interest, Mode, PostAction};
use tracing::{error, info};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

use crate::config;
use crate::daemon::{DetachedLauncher, IGNORED_SIGNALS};
use crate::grab;
use crate::keyboard::{KeyboardError, KeyboardState};
use crate::mbind::{Exit, Mbind, Shutdown};
use crate::server::{KeyServer, XServer};

/// Exit status for failures before the event loop is running.
pub const SETUP_FAILURE: i32 = 1;

type XMbind = Mbind<XServer, KeyboardState, DetachedLauncher>;

/// Daemon setup failure.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("can't connect to X server: {0}")]
    Connect(#[from] ConnectError),
    #[error("X connection failed: {0}")]
    Connection(#[from] ConnectionError),
    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),
    #[error("keyboard setup failed: {0}")]
    Xkb(#[from] KeyboardError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] calloop::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Run the daemon until shutdown.
pub fn run(display: Option<&CStr>) -> Result<Exit, Error> {
    let server = XServer::connect(display)?;
    let keyboard = KeyboardState::new(server.connection())?;

    let bindings = config::bindings();
    grab::grab_keys(&server, &bindings)?;
    info!("Grabbed {} key bindings", bindings.len());

    ignore_signals();

    let mut event_loop = EventLoop::<XMbind>::try_new()?;
    let handle = event_loop.handle();
    let shutdown = Shutdown::new(&handle)?;

    shutdown.on_signals(&handle)?;

    // Handle X11 events.
    let fd = server.connection().as_fd().try_clone_to_owned()?;
    let source = Generic::new(fd, Interest::READ, Mode::Level);
    handle
        .insert_source(source, |_, _, mbind| {
            mbind.process_events();
            Ok(PostAction::Continue)
        })
        .map_err(|err| err.error)?;

    let launcher = DetachedLauncher::new(server.raw_fd());
    let mbind = Mbind::new(server, keyboard, launcher, bindings, shutdown);

    info!("Mbind running");
    Ok(mbind.run(&mut event_loop))
}

/// Ignore job control and child signals.
fn ignore_signals() {
    for signal in IGNORED_SIGNALS {
        if unsafe { libc::signal(signal, libc::SIG_IGN) } == libc::SIG_ERR {
            error!("Unable to ignore signal {signal}: {}", io::Error::last_os_error());
        }
    }
}
