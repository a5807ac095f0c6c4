use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::sys::event::{KeyEvent, KeyState};

bitflags! {
    /// Compositor modifier mask, bit-compatible with the wlroots/xkb layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        const SHIFT = 1 << 0;
        const CAPS = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const SUPER = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl Modifiers {
    fn from_modifier_name(name: &str) -> Option<Modifiers> {
        Some(match name {
            "shift" => Modifiers::SHIFT,
            "ctrl" | "control" => Modifiers::CTRL,
            "alt" | "mod1" => Modifiers::ALT,
            "super" | "meta" | "logo" | "mod4" => Modifiers::SUPER,
            "caps" => Modifiers::CAPS,
            _ => return None,
        })
    }
}

/// The xkb keysyms the carousel reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
pub enum Keysym {
    Space = 0x0020,
    A = 0x0061,
    D = 0x0064,
    S = 0x0073,
    W = 0x0077,
    IsoLeftTab = 0xfe20,
    Tab = 0xff09,
    Return = 0xff0d,
    Escape = 0xff1b,
    Left = 0xff51,
    Up = 0xff52,
    Right = 0xff53,
    Down = 0xff54,
    AltL = 0xffe9,
    AltR = 0xffea,
    SuperL = 0xffeb,
}

/// Linux evdev scancode, as delivered before xkb translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const ESCAPE: KeyCode = KeyCode(1);
    pub const TAB: KeyCode = KeyCode(15);
    pub const RETURN: KeyCode = KeyCode(28);
    pub const GRAVE: KeyCode = KeyCode(41);
    pub const SPACE: KeyCode = KeyCode(57);

    fn from_name(name: &str) -> Option<KeyCode> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(digit) = c.to_digit(10) {
                // 1..9 map to 2..10 and 0 maps to 11.
                return Some(KeyCode(if digit == 0 { 11 } else { digit + 1 }));
            }
        }
        KEY_NAMES.iter().find(|(n, _)| *n == name).map(|(_, code)| KeyCode(*code))
    }

    fn name(self) -> Option<String> {
        match self.0 {
            2..=10 => Some((self.0 - 1).to_string()),
            11 => Some("0".to_string()),
            code => KEY_NAMES.iter().find(|(_, c)| *c == code).map(|(n, _)| n.to_string()),
        }
    }
}

const KEY_NAMES: &[(&str, u32)] = &[
    ("escape", 1),
    ("esc", 1),
    ("tab", 15),
    ("q", 16),
    ("w", 17),
    ("e", 18),
    ("r", 19),
    ("t", 20),
    ("y", 21),
    ("u", 22),
    ("i", 23),
    ("o", 24),
    ("p", 25),
    ("return", 28),
    ("enter", 28),
    ("a", 30),
    ("s", 31),
    ("d", 32),
    ("f", 33),
    ("g", 34),
    ("h", 35),
    ("j", 36),
    ("k", 37),
    ("l", 38),
    ("grave", 41),
    ("`", 41),
    ("z", 44),
    ("x", 45),
    ("c", 46),
    ("v", 47),
    ("b", 48),
    ("n", 49),
    ("m", 50),
    ("space", 57),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyParseError {
    #[error("empty hotkey")]
    Empty,
    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),
    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

/// A key press plus the modifiers that must be held with it, e.g. `alt+tab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hotkey {
    pub key_code: KeyCode,
    pub modifiers: Modifiers,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { key_code, modifiers } }

    /// A press of the hotkey's key while at least its modifiers are held.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.state == KeyState::Pressed
            && event.keycode == self.key_code
            && event.modifiers.contains(self.modifiers)
    }
}

impl Default for Hotkey {
    fn default() -> Self { Hotkey::new(Modifiers::ALT, KeyCode::TAB) }
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let mut parts: Vec<&str> = lowered.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or(HotkeyParseError::Empty)?;
        let mut modifiers = Modifiers::empty();
        for part in parts {
            modifiers |= Modifiers::from_modifier_name(part)
                .ok_or_else(|| HotkeyParseError::UnknownModifier(part.to_string()))?;
        }
        let key_code =
            KeyCode::from_name(key).ok_or_else(|| HotkeyParseError::UnknownKey(key.to_string()))?;
        Ok(Hotkey { key_code, modifiers })
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, flag) in [
            ("ctrl", Modifiers::CTRL),
            ("alt", Modifiers::ALT),
            ("shift", Modifiers::SHIFT),
            ("super", Modifiers::SUPER),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        match self.key_code.name() {
            Some(name) => f.write_str(&name),
            None => write!(f, "code:{}", self.key_code.0),
        }
    }
}

impl TryFrom<String> for Hotkey {
    type Error = HotkeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<Hotkey> for String {
    fn from(value: Hotkey) -> Self { value.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(keycode: u32, modifiers: Modifiers) -> KeyEvent {
        KeyEvent {
            keycode: KeyCode(keycode),
            keysym: Keysym::Tab as u32,
            state: KeyState::Pressed,
            modifiers,
        }
    }

    #[test]
    fn parses_default_trigger() {
        let hotkey: Hotkey = "alt+tab".parse().unwrap();
        assert_eq!(hotkey, Hotkey::default());
        assert_eq!(hotkey.to_string(), "alt+tab");
    }

    #[test]
    fn parses_letters_and_digits() {
        let hotkey: Hotkey = "Super + Shift + D".parse().unwrap();
        assert_eq!(hotkey.key_code, KeyCode(32));
        assert_eq!(hotkey.modifiers, Modifiers::SUPER | Modifiers::SHIFT);
        assert_eq!(hotkey.to_string(), "shift+super+d");
        assert_eq!("ctrl+1".parse::<Hotkey>().unwrap().key_code, KeyCode(2));
        assert_eq!("ctrl+0".parse::<Hotkey>().unwrap().key_code, KeyCode(11));
    }

    #[test]
    fn modifier_aliases() {
        let hotkey: Hotkey = "mod4+control+tab".parse().unwrap();
        assert_eq!(hotkey.modifiers, Modifiers::SUPER | Modifiers::CTRL);
        assert_eq!("meta+mod1+tab".parse::<Hotkey>().unwrap().modifiers, Modifiers::SUPER | Modifiers::ALT);
    }

    #[test]
    fn rejects_unknown_parts() {
        assert_eq!("".parse::<Hotkey>(), Err(HotkeyParseError::Empty));
        assert!(matches!("hyper+tab".parse::<Hotkey>(), Err(HotkeyParseError::UnknownModifier(_))));
        assert!(matches!("alt+f13".parse::<Hotkey>(), Err(HotkeyParseError::UnknownKey(_))));
    }

    #[test]
    fn matches_requires_modifiers_and_press() {
        let hotkey = Hotkey::default();
        assert!(hotkey.matches(&press(15, Modifiers::ALT)));
        assert!(hotkey.matches(&press(15, Modifiers::ALT | Modifiers::SHIFT)));
        assert!(!hotkey.matches(&press(15, Modifiers::empty())));
        assert!(!hotkey.matches(&press(16, Modifiers::ALT)));
        let mut released = press(15, Modifiers::ALT);
        released.state = KeyState::Released;
        assert!(!hotkey.matches(&released));
    }

    #[test]
    fn keysym_lookup() {
        assert_eq!(Keysym::try_from(0xff09_u32).ok(), Some(Keysym::Tab));
        assert!(Keysym::try_from(0x1234_u32).is_err());
    }
}
