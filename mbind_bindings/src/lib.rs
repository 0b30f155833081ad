//! Mbind key binding table.
//!
//! This library provides the types used to describe the compiled-in key
//! bindings and the lookup used to match incoming key presses against them.

use std::fmt::{self, Display, Formatter};

pub use xkbcommon::xkb::Keysym;

bitflags::bitflags! {
    /// X11 modifier state.
    ///
    /// Bits are kept exactly as reported by the server, including lock and
    /// pointer button bits, since matching uses bitwise equality.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }

        let mut names = Vec::new();
        for (name, _) in self.iter_names() {
            names.push(name);
        }

        // Bits outside the core modifiers, like pointer buttons.
        let unknown = self.bits() & !Self::all().bits();
        let unknown = (unknown != 0).then(|| format!("{unknown:#x}"));

        let mut parts = names.into_iter().map(str::to_owned).chain(unknown);
        if let Some(first) = parts.next() {
            f.write_str(&first)?;
        }
        for part in parts {
            write!(f, "+{part}")?;
        }

        Ok(())
    }
}

/// Key binding to an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub mods: Modifiers,
    pub keysym: Keysym,
    /// Program followed by its arguments.
    pub command: &'static [&'static str],
}

impl Binding {
    /// Entry terminating a binding table.
    pub const SENTINEL: Self =
        Self { mods: Modifiers::empty(), keysym: Keysym::NoSymbol, command: &[] };

    pub const fn new(
        mods: Modifiers,
        keysym: Keysym,
        command: &'static [&'static str],
    ) -> Self {
        Self { mods, keysym, command }
    }

    /// Check if this entry marks the end of its table.
    pub fn is_sentinel(&self) -> bool {
        self.command.is_empty()
    }

    /// Check if a key press triggers this binding.
    ///
    /// The modifier state must be identical, a lock modifier which is active
    /// but not part of the binding will prevent a match.
    pub fn matches(&self, mods: Modifiers, keysym: Keysym) -> bool {
        self.mods.bits() == mods.bits() && self.keysym == keysym
    }
}

/// Ordered list of key bindings.
#[derive(Debug, Clone, Copy)]
pub struct BindingTable<'a> {
    entries: &'a [Binding],
}

impl<'a> BindingTable<'a> {
    pub const fn new(entries: &'a [Binding]) -> Self {
        Self { entries }
    }

    /// Iterate over all bindings in the table, stopping at the first sentinel.
    pub fn iter(&self) -> impl Iterator<Item = &'a Binding> + 'a {
        self.entries.iter().take_while(|binding| !binding.is_sentinel())
    }

    /// All bindings triggered by a key press, in table order.
    ///
    /// Every matching binding is returned, so entries sharing the same
    /// modifiers and keysym will all fire.
    pub fn matching(&self, mods: Modifiers, keysym: Keysym) -> impl Iterator<Item = &'a Binding> + 'a {
        self.iter().filter(move |binding| binding.matches(mods, keysym))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERMINAL: Binding = Binding::new(Modifiers::MOD4, Keysym::Return, &["uxterm"]);
    const RANGER: Binding = Binding::new(
        Modifiers::MOD4.union(Modifiers::SHIFT),
        Keysym::Return,
        &["uxterm", "-e", "ranger"],
    );
    const MENU: Binding = Binding::new(Modifiers::MOD4, Keysym::d, &["dmenu_run", "-b"]);

    #[test]
    fn iteration_stops_at_sentinel() {
        let entries = [TERMINAL, Binding::SENTINEL, MENU];
        let table = BindingTable::new(&entries);

        let bindings: Vec<_> = table.iter().collect();
        assert_eq!(bindings, vec![&TERMINAL]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sentinel_hides_later_matches() {
        let entries = [Binding::SENTINEL, TERMINAL];
        let table = BindingTable::new(&entries);

        assert!(table.is_empty());
        assert_eq!(table.matching(Modifiers::MOD4, Keysym::Return).count(), 0);
    }

    #[test]
    fn matching_requires_exact_modifiers() {
        let entries = [TERMINAL, RANGER, MENU];
        let table = BindingTable::new(&entries);

        let plain: Vec<_> = table.matching(Modifiers::MOD4, Keysym::Return).collect();
        assert_eq!(plain, vec![&TERMINAL]);

        let shifted = Modifiers::MOD4 | Modifiers::SHIFT;
        let shifted: Vec<_> = table.matching(shifted, Keysym::Return).collect();
        assert_eq!(shifted, vec![&RANGER]);

        assert_eq!(table.matching(Modifiers::empty(), Keysym::Return).count(), 0);
        assert_eq!(table.matching(Modifiers::MOD4, Keysym::Escape).count(), 0);
    }

    #[test]
    fn lock_bits_suppress_match() {
        let entries = [TERMINAL];
        let table = BindingTable::new(&entries);

        let numlock = Modifiers::MOD4 | Modifiers::MOD2;
        assert_eq!(table.matching(numlock, Keysym::Return).count(), 0);

        let capslock = Modifiers::MOD4 | Modifiers::LOCK;
        assert_eq!(table.matching(capslock, Keysym::Return).count(), 0);
    }

    #[test]
    fn unknown_state_bits_suppress_match() {
        let entries = [TERMINAL];
        let table = BindingTable::new(&entries);

        // Button1 held while pressing the key.
        let state = Modifiers::from_bits_retain(Modifiers::MOD4.bits() | 0x100);
        assert_eq!(table.matching(state, Keysym::Return).count(), 0);
    }

    #[test]
    fn overlapping_bindings_all_match_in_order() {
        let second = Binding::new(Modifiers::MOD4, Keysym::Return, &["notify-send", "term"]);
        let entries = [TERMINAL, MENU, second];
        let table = BindingTable::new(&entries);

        let matches: Vec<_> = table.matching(Modifiers::MOD4, Keysym::Return).collect();
        assert_eq!(matches, vec![&TERMINAL, &second]);
    }

    #[test]
    fn modifiers_display() {
        assert_eq!(Modifiers::empty().to_string(), "None");
        assert_eq!((Modifiers::MOD4 | Modifiers::CONTROL).to_string(), "CONTROL+MOD4");
        assert_eq!(Modifiers::from_bits_retain(0x108).to_string(), "MOD1+0x100");
    }
}
