//! Breadth-first shortest-path distances over the tile grid.

use std::collections::VecDeque;

use mazeduel_protocol::Position;

use crate::Grid;

/// Distance value for cells no source can reach.
pub const INF: u32 = u32::MAX;

/// Grid-shaped table of shortest-path lengths (in moves) from the
/// nearest source, walking 4-connected through non-wall cells.
///
/// O(cells) to build. Used by placement (reachability and balance),
/// colouring (proximity edges), difficulty targets, and the engine's
/// connectivity checks.
#[derive(Debug, Clone)]
pub struct DistanceField {
    width: usize,
    dist: Vec<u32>,
}

impl DistanceField {
    /// Distances from a single source.
    pub fn from_source(grid: &Grid, source: Position) -> Self {
        Self::from_sources(grid, [source])
    }

    /// Multi-source BFS: each cell gets the distance to its nearest source.
    ///
    /// Sources outside the grid are skipped. A source is assigned distance
    /// 0 even if it sits on a wall, but expansion only enters walkable cells.
    pub fn from_sources(grid: &Grid, sources: impl IntoIterator<Item = Position>) -> Self {
        let mut dist = vec![INF; grid.len()];
        let mut queue = VecDeque::new();

        for source in sources {
            if let Some(i) = grid.index(source) {
                if dist[i] != 0 {
                    dist[i] = 0;
                    queue.push_back(source);
                }
            }
        }

        while let Some(pos) = queue.pop_front() {
            // Every queued position was in bounds when it was pushed.
            let Some(here) = grid.index(pos) else {
                continue;
            };
            let next = dist[here] + 1;
            for n in pos.neighbors() {
                if !grid.is_walkable(n) {
                    continue;
                }
                if let Some(j) = grid.index(n) {
                    if dist[j] == INF {
                        dist[j] = next;
                        queue.push_back(n);
                    }
                }
            }
        }

        Self {
            width: grid.width(),
            dist,
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as usize >= self.width {
            return None;
        }
        let i = pos.y as usize * self.width + pos.x as usize;
        (i < self.dist.len()).then_some(i)
    }

    /// Raw distance, [`INF`] when unreachable or out of bounds.
    pub fn get(&self, pos: Position) -> u32 {
        self.index(pos).map_or(INF, |i| self.dist[i])
    }

    /// `Some(d)` for reachable cells.
    pub fn distance(&self, pos: Position) -> Option<u32> {
        match self.get(pos) {
            INF => None,
            d => Some(d),
        }
    }

    pub fn is_reachable(&self, pos: Position) -> bool {
        self.get(pos) != INF
    }

    /// Largest finite distance in the field, `None` if nothing is reachable.
    pub fn max_finite(&self) -> Option<u32> {
        self.dist.iter().copied().filter(|d| *d != INF).max()
    }
}
