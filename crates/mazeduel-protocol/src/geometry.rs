//! Grid geometry shared by the map generator, the room engine, and the
//! wire format.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A cell coordinate. `x` grows to the right, `y` grows downward.
///
/// Coordinates are signed so that stepping off the edge of the grid
/// produces a representable (out-of-bounds) position instead of an
/// underflow; the grid decides whether a position is inside it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// `|Δx| + |Δy|`.
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The neighbouring cell in `dir`.
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in `U, D, L, R` order.
    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.step(d))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// What occupies a grid cell.
///
/// Serialized in lowercase (`"wall"`, `"floor"`, `"quiz"`) so the client
/// can render the `start` map without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tile {
    #[default]
    Wall,
    Floor,
    /// A floor cell that locks the player behind a question. Walkable.
    Quiz,
}

impl Tile {
    pub fn is_walkable(self) -> bool {
        !matches!(self, Tile::Wall)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four moves a client can request.
///
/// On the wire these are the single letters `U`, `D`, `L`, `R`. Any other
/// string fails to decode, so an invalid direction is rejected at the
/// boundary rather than silently ignored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "U")]
    Up,
    #[serde(rename = "D")]
    Down,
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_is_symmetric() {
        let a = Position::new(1, 5);
        let b = Position::new(4, 1);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(b.manhattan(a), 7);
        assert_eq!(a.manhattan(a), 0);
    }

    #[test]
    fn test_step_can_leave_the_grid() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.step(Direction::Up), Position::new(0, -1));
        assert_eq!(origin.step(Direction::Right), Position::new(1, 0));
    }

    #[test]
    fn test_direction_uses_single_letters() {
        assert_eq!(serde_json::to_string(&Direction::Left).unwrap(), "\"L\"");
        let d: Direction = serde_json::from_str("\"D\"").unwrap();
        assert_eq!(d, Direction::Down);
        assert!(serde_json::from_str::<Direction>("\"X\"").is_err());
    }

    #[test]
    fn test_tile_walkability() {
        assert!(!Tile::Wall.is_walkable());
        assert!(Tile::Floor.is_walkable());
        assert!(Tile::Quiz.is_walkable());
        assert_eq!(serde_json::to_string(&Tile::Quiz).unwrap(), "\"quiz\"");
    }
}
