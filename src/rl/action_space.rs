use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::infra::Cell;

/// Number of actions available to the agent.
pub const NUM_ACTIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Self::ALL.get(index).copied()
    }

    /// Unit step in grid coordinates (`y` grows downward).
    pub fn direction(self) -> (i32, i32) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }

    pub fn apply(self, cell: Cell) -> Cell {
        let (dx, dy) = self.direction();
        cell.offset(dx, dy)
    }

    /// The action that moves from `from` to `to`, if they are adjacent.
    pub fn between(from: Cell, to: Cell) -> Option<Action> {
        Self::ALL.into_iter().find(|a| a.apply(from) == to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Up => "Up",
            Action::Down => "Down",
            Action::Left => "Left",
            Action::Right => "Right",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
