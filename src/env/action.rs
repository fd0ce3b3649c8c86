use std::fmt;

use strum::{EnumIter, FromRepr};

use crate::error::{GridError, Result};

/// The four movement directions
///
/// Discriminants double as column indices into an agent's value table, so
/// index 0 is the tie-broken default wherever all values are equal.
#[derive(EnumIter, FromRepr, Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    /// Size of the action space
    pub const COUNT: usize = 4;

    /// Resolve a flat action index, as supplied by external drivers
    pub fn from_index(index: usize) -> Result<Self> {
        Self::from_repr(index).ok_or(GridError::InvalidAction(index))
    }

    /// The two directions perpendicular to `self`, the candidates for a slip
    pub fn orthogonals(self) -> [Action; 2] {
        match self {
            Action::Up | Action::Down => [Action::Left, Action::Right],
            Action::Left | Action::Right => [Action::Up, Action::Down],
        }
    }

    /// The opposite direction
    pub fn reverse(self) -> Action {
        match self {
            Action::Up => Action::Down,
            Action::Right => Action::Left,
            Action::Down => Action::Up,
            Action::Left => Action::Right,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Action::Up => 'U',
            Action::Right => 'R',
            Action::Down => 'D',
            Action::Left => 'L',
        };
        write!(f, "{tag}")
    }
}
