use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Along a row.
    Horizontal,
    /// Across rows.
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Moves `i` one step in this direction within `0..len`, wrapping at both
    /// ends. Returns 0 for an empty range.
    pub fn step(&self, i: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let i = i.min(len - 1);
        match *self {
            Direction::Left | Direction::Up => (i + len - 1) % len,
            Direction::Right | Direction::Down => (i + 1) % len,
        }
    }
}
