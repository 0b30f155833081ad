//! Keyboard state tracking.

use mbind_bindings::Keysym;
use x11rb::protocol::xproto::{GetKeyboardMappingReply, Keycode};
use x11rb::xcb_ffi::XCBConnection;
use xkbcommon::xkb;
use xkbcommon::xkb::x11::{self as xkb_x11, SetupXkbExtensionFlags};

/// Keycode to keysym resolution.
pub trait SymbolResolver {
    /// Get the first-level keysym for a keycode.
    ///
    /// Returns `None` if the keycode does not produce any symbol.
    fn keysym(&self, keycode: Keycode) -> Option<Keysym>;
}

/// XKB keyboard initialization failure.
#[derive(thiserror::Error, Debug)]
pub enum KeyboardError {
    #[error("XKB extension {0}.{1} is not supported by the X server")]
    Unsupported(u16, u16),
    #[error("no core keyboard device available")]
    NoDevice,
}

/// Keyboard state of the server's core keyboard.
pub struct KeyboardState {
    state: xkb::State,
}

impl KeyboardState {
    /// Load the keymap of the core keyboard device.
    pub fn new(connection: &XCBConnection) -> Result<Self, KeyboardError> {
        let (mut major, mut minor) = (0, 0);
        let (mut base_event, mut base_error) = (0, 0);
        let supported = xkb_x11::setup_xkb_extension(
            connection,
            xkb_x11::MIN_MAJOR_XKB_VERSION,
            xkb_x11::MIN_MINOR_XKB_VERSION,
            SetupXkbExtensionFlags::NoFlags,
            &mut major,
            &mut minor,
            &mut base_event,
            &mut base_error,
        );
        if !supported {
            let (major, minor) = (xkb_x11::MIN_MAJOR_XKB_VERSION, xkb_x11::MIN_MINOR_XKB_VERSION);
            return Err(KeyboardError::Unsupported(major, minor));
        }

        let device = xkb_x11::get_core_keyboard_device_id(connection);
        if device == -1 {
            return Err(KeyboardError::NoDevice);
        }

        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb_x11::keymap_new_from_device(
            &context,
            connection,
            device,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        );
        let state = xkb_x11::state_new_from_device(&keymap, connection, device);

        tracing::debug!("Loaded keymap for keyboard device {device} (XKB {major}.{minor})");

        Ok(Self { state })
    }
}

impl SymbolResolver for KeyboardState {
    fn keysym(&self, keycode: Keycode) -> Option<Keysym> {
        let keysym = self.state.key_get_one_sym(xkb::Keycode::new(keycode.into()));
        (keysym != Keysym::NoSymbol).then_some(keysym)
    }
}

/// Core protocol keyboard mapping.
///
/// Used to find all physical keys which can produce a keysym.
#[derive(Debug, Clone, Default)]
pub struct KeyMapping {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyMapping {
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<u32>) -> Self {
        Self { min_keycode, keysyms_per_keycode: keysyms_per_keycode as usize, keysyms }
    }

    pub fn from_reply(min_keycode: Keycode, reply: GetKeyboardMappingReply) -> Self {
        Self::new(min_keycode, reply.keysyms_per_keycode, reply.keysyms)
    }

    /// All keycodes with `keysym` in any of their columns.
    ///
    /// Keycodes are returned in ascending order, without duplicates.
    pub fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.keysyms_per_keycode == 0 || keysym == Keysym::NoSymbol {
            return Vec::new();
        }

        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, columns)| columns.contains(&keysym.raw()))
            .filter_map(|(i, _)| Keycode::try_from(self.min_keycode as usize + i).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETURN: u32 = 0xff0d;
    const KP_ENTER: u32 = 0xff8d;
    const LOWER_A: u32 = 0x61;
    const UPPER_A: u32 = 0x41;

    fn mapping() -> KeyMapping {
        #[rustfmt::skip]
        let keysyms = vec![
            // 8
            0, 0,
            // 9
            LOWER_A, UPPER_A,
            // 10
            RETURN, 0,
            // 11
            KP_ENTER, RETURN,
            // 12
            RETURN, RETURN,
        ];
        KeyMapping::new(8, 2, keysyms)
    }

    #[test]
    fn keycodes_from_all_columns() {
        let mapping = mapping();
        assert_eq!(mapping.keycodes(Keysym::Return), vec![10, 11, 12]);
        assert_eq!(mapping.keycodes(Keysym::KP_Enter), vec![11]);
        assert_eq!(mapping.keycodes(Keysym::A), vec![9]);
        assert_eq!(mapping.keycodes(Keysym::a), vec![9]);
    }

    #[test]
    fn unmapped_keysym() {
        let mapping = mapping();
        assert!(mapping.keycodes(Keysym::Escape).is_empty());
        assert!(mapping.keycodes(Keysym::NoSymbol).is_empty());
    }

    #[test]
    fn empty_mapping() {
        assert!(KeyMapping::default().keycodes(Keysym::Return).is_empty());
    }
}
