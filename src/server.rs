//! X11 server connection.

use std::ffi::CStr;
use std::os::unix::io::{AsRawFd, RawFd};

use mbind_bindings::{Keysym, Modifiers};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConnectionExt as _, EventMask, Grab, GrabMode, Keycode, ModMask,
    Window,
};
use x11rb::protocol::Event;
use x11rb::xcb_ffi::XCBConnection;

use crate::keyboard::KeyMapping;
use crate::x11::Error;

/// X11 error code for `BadAccess`.
const ACCESS_ERROR: u8 = 10;

/// X11 major opcode of the `GrabKey` request.
const GRAB_KEY_OPCODE: u8 = 33;

/// Requests the daemon issues to the windowing server.
pub trait KeyServer {
    type Error: std::error::Error + 'static;

    /// Root windows of all screens.
    fn roots(&self) -> Vec<Window>;

    /// Subscribe to key presses on a root window.
    fn select_key_press(&self, root: Window) -> Result<(), Self::Error>;

    /// Remove all key grabs on a root window.
    fn ungrab_all_keys(&self, root: Window) -> Result<(), Self::Error>;

    /// Grab a key combination on a root window.
    fn grab_key(&self, root: Window, mods: Modifiers, keycode: Keycode)
        -> Result<(), Self::Error>;

    /// Physical keys which can produce a keysym.
    fn keycodes(&self, keysym: Keysym) -> Vec<Keycode>;

    /// Send all queued requests to the server.
    fn flush(&self) -> Result<(), Self::Error>;

    /// Get the next event, without blocking.
    fn poll_event(&self) -> Result<Option<ServerEvent>, Self::Error>;

    /// Connection file descriptor.
    fn raw_fd(&self) -> RawFd;

    /// Close the connection.
    fn disconnect(self);
}

/// Events relevant to the daemon.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    KeyPress { keycode: Keycode, state: u16 },
    Error(ServerError),
    Other,
}

impl From<Event> for ServerEvent {
    fn from(event: Event) -> Self {
        match event {
            Event::KeyPress(event) => {
                Self::KeyPress { keycode: event.detail, state: u16::from(event.state) }
            },
            Event::Error(error) => Self::Error(ServerError {
                sequence: error.sequence,
                resource: error.bad_value,
                code: error.error_code,
                major_opcode: error.major_opcode,
            }),
            _ => Self::Other,
        }
    }
}

/// Asynchronous protocol error reported by the server.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("X11 error: sequence {sequence:#x}, resource {resource}, code {code}")]
pub struct ServerError {
    pub sequence: u16,
    pub resource: u32,
    pub code: u8,
    pub major_opcode: u8,
}

impl ServerError {
    /// Check if a key grab failed because another client owns it.
    pub fn is_grab_conflict(&self) -> bool {
        self.code == ACCESS_ERROR && self.major_opcode == GRAB_KEY_OPCODE
    }
}

/// Connection to an X11 server.
pub struct XServer {
    connection: XCBConnection,
    mapping: KeyMapping,
}

impl XServer {
    /// Connect to a display, defaulting to `$DISPLAY`.
    pub fn connect(display: Option<&CStr>) -> Result<Self, Error> {
        let (connection, _) = XCBConnection::connect(display)?;

        let setup = connection.setup();
        let (min_keycode, max_keycode) = (setup.min_keycode, setup.max_keycode);
        let reply =
            connection.get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?.reply()?;
        let mapping = KeyMapping::from_reply(min_keycode, reply);

        Ok(Self { connection, mapping })
    }

    pub fn connection(&self) -> &XCBConnection {
        &self.connection
    }
}

impl KeyServer for XServer {
    type Error = ConnectionError;

    fn roots(&self) -> Vec<Window> {
        self.connection.setup().roots.iter().map(|screen| screen.root).collect()
    }

    fn select_key_press(&self, root: Window) -> Result<(), ConnectionError> {
        let attributes = ChangeWindowAttributesAux::new().event_mask(EventMask::KEY_PRESS);
        self.connection.change_window_attributes(root, &attributes)?;
        Ok(())
    }

    fn ungrab_all_keys(&self, root: Window) -> Result<(), ConnectionError> {
        self.connection.ungrab_key(u8::from(Grab::ANY), root, ModMask::ANY)?;
        Ok(())
    }

    fn grab_key(
        &self,
        root: Window,
        mods: Modifiers,
        keycode: Keycode,
    ) -> Result<(), ConnectionError> {
        self.connection.grab_key(
            true,
            root,
            ModMask::from(mods.bits()),
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        self.mapping.keycodes(keysym)
    }

    fn flush(&self) -> Result<(), ConnectionError> {
        self.connection.flush()
    }

    fn poll_event(&self) -> Result<Option<ServerEvent>, ConnectionError> {
        Ok(self.connection.poll_for_event()?.map(ServerEvent::from))
    }

    fn raw_fd(&self) -> RawFd {
        self.connection.as_raw_fd()
    }

    fn disconnect(self) {
        drop(self.connection);
    }
}
