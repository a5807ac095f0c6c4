use serde::{Deserialize, Serialize};

use crate::sys::event::{KeyEvent, KeyState, Keysym, Modifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CarouselCommand {
    Next,
    Prev,
    Up,
    Down,
    Confirm,
    Cancel,
    Toggle,
}

/// Maps a key event received while the carousel is open to a command. Keys
/// without a mapping yield `None` but are still swallowed by the caller.
pub fn command_for_key(event: &KeyEvent) -> Option<CarouselCommand> {
    let keysym = event.keysym()?;
    match event.state {
        KeyState::Pressed => match keysym {
            Keysym::Tab | Keysym::IsoLeftTab | Keysym::D | Keysym::Right => {
                if event.modifiers.contains(Modifiers::SHIFT) {
                    Some(CarouselCommand::Prev)
                } else {
                    Some(CarouselCommand::Next)
                }
            }
            Keysym::A | Keysym::Left => Some(CarouselCommand::Prev),
            Keysym::S | Keysym::Down => Some(CarouselCommand::Down),
            Keysym::W | Keysym::Up => Some(CarouselCommand::Up),
            Keysym::Return | Keysym::Space => Some(CarouselCommand::Confirm),
            Keysym::Escape => Some(CarouselCommand::Cancel),
            Keysym::AltL | Keysym::AltR | Keysym::SuperL => None,
        },
        // Letting go of the trigger modifier commits the selection.
        KeyState::Released => match keysym {
            Keysym::AltL | Keysym::AltR | Keysym::SuperL => Some(CarouselCommand::Confirm),
            _ => None,
        },
    }
}
