//! Mbind daemon state.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use calloop::ping::{self, Ping};
use calloop::signals::{Signal, Signals};
use calloop::{EventLoop, LoopHandle};
use mbind_bindings::{BindingTable, Modifiers};
use tracing::{error, info, trace, warn};
use x11rb::protocol::xproto::Keycode;

use crate::daemon::Launcher;
use crate::keyboard::SymbolResolver;
use crate::server::{KeyServer, ServerError, ServerEvent};
use crate::trace_error;

/// Reason for leaving the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// Shutdown was requested.
    Shutdown,
    /// The server reported an error.
    ProtocolError(ServerError),
    /// The connection to the server broke.
    ConnectionLost(String),
    /// Waiting for events failed.
    EventLoop(String),
}

impl Exit {
    /// Process exit status.
    pub fn code(&self) -> i32 {
        match self {
            Self::Shutdown => 0,
            Self::EventLoop(_) => 1,
            Self::ProtocolError(_) => 2,
            Self::ConnectionLost(_) => 3,
        }
    }
}

/// Event loop termination handle.
///
/// Clearing the running flag alone does not interrupt a blocking dispatch, so
/// requesting a shutdown also wakes up the event loop.
#[derive(Clone)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
    wakeup: Ping,
}

impl Shutdown {
    /// Register the wakeup source with an event loop.
    pub fn new<D>(event_loop: &LoopHandle<'_, D>) -> io::Result<Self> {
        let (wakeup, source) = ping::make_ping()?;
        event_loop
            .insert_source(source, |_, _, _| ())
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.error))?;

        Ok(Self { running: Arc::new(AtomicBool::new(true)), wakeup })
    }

    /// Request shutdown on SIGINT and SIGTERM.
    ///
    /// Signals are read from the event loop, not from an asynchronous handler.
    pub fn on_signals<D>(&self, event_loop: &LoopHandle<'_, D>) -> calloop::Result<()> {
        let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])?;
        let shutdown = self.clone();
        event_loop
            .insert_source(signals, move |event, _, _| {
                info!("Received {:?}, shutting down", event.signal());
                shutdown.request();
            })
            .map_err(|err| err.error)?;

        Ok(())
    }

    /// Stop the event loop.
    pub fn request(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wakeup.ping();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Shared daemon state.
pub struct Mbind<S, K, L> {
    pub shutdown: Shutdown,
    bindings: BindingTable<'static>,
    keyboard: K,
    launcher: L,
    server: S,
    exit: Option<Exit>,
}

impl<S, K, L> Mbind<S, K, L>
where
    S: KeyServer,
    K: SymbolResolver,
    L: Launcher,
{
    pub fn new(
        server: S,
        keyboard: K,
        launcher: L,
        bindings: BindingTable<'static>,
        shutdown: Shutdown,
    ) -> Self {
        Self { server, keyboard, launcher, bindings, shutdown, exit: None }
    }

    /// Run the event loop until shutdown.
    ///
    /// Event sources must already be registered with `event_loop`.
    pub fn run(mut self, event_loop: &mut EventLoop<'_, Self>) -> Exit {
        // Handle events which were queued during setup.
        self.process_events();

        while self.shutdown.is_running() {
            if let Err(err) = event_loop.dispatch(None, &mut self) {
                error!("Event loop error: {err}");
                self.stop(Exit::EventLoop(err.to_string()));
            }
        }

        let exit = self.exit.take().unwrap_or(Exit::Shutdown);
        self.server.disconnect();
        info!("Connection closed");

        exit
    }

    /// Handle all pending server events.
    pub fn process_events(&mut self) {
        while self.shutdown.is_running() {
            match self.server.poll_event() {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) => break,
                Err(err) => {
                    error!("Lost connection to X server: {err}");
                    self.stop(Exit::ConnectionLost(err.to_string()));
                },
            }
        }
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Error(err) if err.is_grab_conflict() => {
                warn!("Key already grabbed by another client ({err})");
            },
            ServerEvent::Error(err) => {
                error!(
                    sequence = err.sequence,
                    resource = err.resource,
                    code = err.code,
                    "{err}"
                );
                self.stop(Exit::ProtocolError(err));
            },
            ServerEvent::KeyPress { keycode, state } => self.handle_key_press(keycode, state),
            ServerEvent::Other => (),
        }
    }

    fn handle_key_press(&mut self, keycode: Keycode, state: u16) {
        let keysym = match self.keyboard.keysym(keycode) {
            Some(keysym) => keysym,
            None => {
                trace!("No keysym for keycode {keycode}");
                return;
            },
        };

        let mods = Modifiers::from_bits_retain(state);
        for binding in self.bindings.matching(mods, keysym) {
            info!("Launching {:?}", binding.command);
            trace_error(self.launcher.launch(binding.command));
        }
    }

    /// Leave the event loop, keeping the first exit reason.
    fn stop(&mut self, exit: Exit) {
        self.exit.get_or_insert(exit);
        self.shutdown.request();
    }
}
