//! Daemon configuration.

use mbind_bindings::{Binding, BindingTable, Keysym, Modifiers};

/// Modifier used by all primary bindings.
///
/// Debug builds use Alt so they can run nested inside a session which
/// already binds the Super key.
#[cfg(debug_assertions)]
pub const MODKEY: Modifiers = Modifiers::MOD1;
#[cfg(not(debug_assertions))]
pub const MODKEY: Modifiers = Modifiers::MOD4;

const MOD_SHIFT: Modifiers = MODKEY.union(Modifiers::SHIFT);
const NONE: Modifiers = Modifiers::empty();

/// Compiled-in key bindings.
static BINDINGS: [Binding; 11] = [
    Binding::new(MODKEY, Keysym::Return, &["uxterm"]),
    Binding::new(MOD_SHIFT, Keysym::Return, &["uxterm", "-e", "ranger"]),
    Binding::new(MODKEY, Keysym::d, &[
        "dmenu_run",
        "-b",
        "-fn",
        "Noto Sans:size=12",
        "-nb",
        "#1d2021",
        "-nf",
        "#888888",
        "-sb",
        "#1d2021",
        "-sf",
        "#eeeeec",
    ]),
    Binding::new(NONE, Keysym::XF86_AudioRaiseVolume, &["pactl", "set-sink-volume", "0", "+5%"]),
    Binding::new(NONE, Keysym::XF86_AudioLowerVolume, &["pactl", "set-sink-volume", "0", "-5%"]),
    Binding::new(NONE, Keysym::XF86_AudioMute, &["pactl", "set-sink-mute", "0", "toggle"]),
    Binding::new(NONE, Keysym::XF86_AudioMicMute, &["pactl", "set-source-mute", "1", "toggle"]),
    Binding::new(MODKEY, Keysym::XF86_AudioMute, &["pavucontrol"]),
    Binding::new(NONE, Keysym::XF86_MonBrightnessUp, &["xbacklight", "+", "5"]),
    Binding::new(NONE, Keysym::XF86_MonBrightnessDown, &["xbacklight", "-", "5"]),
    Binding::SENTINEL,
];

/// Key binding table used by the daemon.
pub fn bindings() -> BindingTable<'static> {
    BindingTable::new(&BINDINGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ends_with_sentinel() {
        assert!(BINDINGS[BINDINGS.len() - 1].is_sentinel());
        assert_eq!(bindings().len(), BINDINGS.len() - 1);
    }

    #[test]
    fn every_binding_has_program() {
        for binding in bindings().iter() {
            assert!(!binding.command[0].is_empty(), "{binding:?}");
        }
    }
}
