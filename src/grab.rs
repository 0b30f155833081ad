//! Global key grabs.

use mbind_bindings::BindingTable;
use tracing::{debug, warn};

use crate::server::KeyServer;

/// Take over all key bindings on every screen.
///
/// Existing grabs on the root windows are removed before the keys of every
/// binding are grabbed, so repeated calls result in the same set of grabs.
///
/// Grab requests are not checked, failures are reported through the event
/// stream once the server processed them.
pub fn grab_keys<S: KeyServer>(server: &S, bindings: &BindingTable<'_>) -> Result<(), S::Error> {
    for root in server.roots() {
        server.select_key_press(root)?;
        server.ungrab_all_keys(root)?;

        for binding in bindings.iter() {
            let keycodes = server.keycodes(binding.keysym);
            if keycodes.is_empty() {
                warn!("No key produces {:?}, ignoring binding {:?}", binding.keysym, binding.command);
                continue;
            }

            for keycode in keycodes {
                debug!("Grabbing keycode {keycode} with {} on root {root:#x}", binding.mods);
                server.grab_key(root, binding.mods, keycode)?;
            }
        }
    }

    server.flush()
}
