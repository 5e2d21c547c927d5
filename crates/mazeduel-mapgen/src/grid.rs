//! The tile grid every generation stage reads and writes.

use mazeduel_protocol::{Position, Tile};

/// A rectangular, row-major array of [`Tile`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
}

impl Grid {
    /// A `width × height` grid with every cell set to `tile`.
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        Self {
            width,
            height,
            cells: vec![tile; width * height],
        }
    }

    /// Parses an ASCII picture: `#` wall, `.` floor, `?` quiz.
    ///
    /// Returns `None` for ragged rows or unknown characters. Handy for
    /// hand-built test maps.
    pub fn from_ascii(rows: &[&str]) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let mut cells = Vec::with_capacity(width * height);
        for row in rows {
            if row.len() != width {
                return None;
            }
            for ch in row.chars() {
                cells.push(match ch {
                    '#' => Tile::Wall,
                    '.' => Tile::Floor,
                    '?' => Tile::Quiz,
                    _ => return None,
                });
            }
        }
        Some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells (`width × height`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Row-major index of `pos`, or `None` when it lies outside the grid.
    pub fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    /// Inverse of [`index`](Self::index).
    pub fn position(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn get(&self, pos: Position) -> Option<Tile> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Overwrites a cell. Out-of-bounds writes are ignored and return `false`.
    pub fn set(&mut self, pos: Position, tile: Tile) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.cells[i] = tile;
                true
            }
            None => false,
        }
    }

    /// `true` if `pos` is inside the grid and not a wall.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(Tile::is_walkable)
    }

    /// `true` if `pos` is strictly inside the outer border.
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.x >= 1
            && pos.y >= 1
            && (pos.x as usize) + 1 < self.width
            && (pos.y as usize) + 1 < self.height
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(|i| self.position(i))
    }

    /// Positions holding exactly `tile`, in row-major order.
    pub fn cells_of(&self, tile: Tile) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == tile)
            .map(|(i, _)| self.position(i))
            .collect()
    }

    /// The grid as nested rows (`rows[y][x]`), the shape sent to clients.
    pub fn rows(&self) -> Vec<Vec<Tile>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.width).map(<[Tile]>::to_vec).collect()
    }
}
