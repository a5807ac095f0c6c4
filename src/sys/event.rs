use glam::DVec2;
use serde::{Deserialize, Serialize};

pub use crate::sys::hotkey::{Hotkey, KeyCode, Keysym, Modifiers};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseState {
    Down,
    Up,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// A keyboard event as seen by the compositor's key handler: the raw
/// scancode, the keysym it resolved to, and the modifiers held across all
/// keyboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: KeyCode,
    pub keysym: u32,
    pub state: KeyState,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn pressed(keysym: Keysym, modifiers: Modifiers) -> Self {
        Self {
            keycode: KeyCode(0),
            keysym: keysym as u32,
            state: KeyState::Pressed,
            modifiers,
        }
    }

    pub fn released(keysym: Keysym) -> Self {
        Self {
            keycode: KeyCode(0),
            keysym: keysym as u32,
            state: KeyState::Released,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn keysym(&self) -> Option<Keysym> { Keysym::try_from(self.keysym).ok() }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonEvent {
    pub button: u32,
    pub state: MouseState,
    /// Pointer position in global layout coordinates.
    pub position: DVec2,
}

impl ButtonEvent {
    pub const LEFT: u32 = 0x110;

    pub fn press(position: DVec2) -> Self {
        Self {
            button: Self::LEFT,
            state: MouseState::Down,
            position,
        }
    }
}
