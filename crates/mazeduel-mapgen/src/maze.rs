//! Maze carving, loop injection, and the return-phase corridor.

use std::collections::HashSet;

use mazeduel_protocol::{Direction, Position, Tile};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::{Grid, MapGenError};

/// Chance that a floor cell picked during the return-phase shake-up
/// turns into a wall. Picked walls always open.
const FLOOR_TO_WALL_CHANCE: f64 = 0.15;

/// Maze dimensions and how loopy it should be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeConfig {
    /// Grid width, odd and at least 5.
    pub width: usize,
    /// Grid height, odd and at least 5.
    pub height: usize,
    /// Fraction (0.0–1.0) of eligible separating walls knocked out after
    /// the spanning tree is carved. 0 leaves a perfect maze.
    pub extra_loops: f64,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: 31,
            height: 21,
            extra_loops: 0.08,
        }
    }
}

impl MazeConfig {
    /// Rejects dimensions the carving lattice can't handle.
    pub fn validate(&self) -> Result<(), MapGenError> {
        let ok = |n: usize| n >= 5 && n % 2 == 1;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(MapGenError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Carves a spanning tree, then injects loops.
///
/// # Errors
/// [`MapGenError::InvalidDimensions`] if the config is unusable.
pub fn generate_maze<R: Rng + ?Sized>(config: &MazeConfig, rng: &mut R) -> Result<Grid, MapGenError> {
    config.validate()?;
    let mut grid = carve_spanning_tree(config.width, config.height, rng);
    let opened = inject_loops(&mut grid, config.extra_loops, rng);
    tracing::trace!(
        width = config.width,
        height = config.height,
        opened,
        "maze generated"
    );
    Ok(grid)
}

/// Randomized depth-first carving over the odd-coordinate lattice.
///
/// Starts at `(1, 1)`. Each visited cell shuffles its four 2-step moves
/// and descends into the first unvisited one, knocking out the wall in
/// between; exhausted cells are popped. The result is a perfect maze: every
/// odd/odd interior cell is floor and reachable from every other.
///
/// The descent uses an explicit stack, so grid size never threatens the
/// call stack.
pub fn carve_spanning_tree<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Grid {
    let mut grid = Grid::filled(width, height, Tile::Wall);
    let root = Position::new(1, 1);
    if !grid.is_interior(root) {
        return grid;
    }
    grid.set(root, Tile::Floor);

    // (cell, its shuffled moves, index of the next move to try)
    let mut stack = vec![(root, shuffled_directions(rng), 0usize)];

    while let Some((cell, dirs, next)) = stack.last_mut() {
        let Some(&dir) = dirs.get(*next) else {
            stack.pop();
            continue;
        };
        *next += 1;
        let cell = *cell;

        let between = cell.step(dir);
        let target = between.step(dir);
        if grid.is_interior(target) && grid.get(target) == Some(Tile::Wall) {
            grid.set(between, Tile::Floor);
            grid.set(target, Tile::Floor);
            stack.push((target, shuffled_directions(rng), 0));
        }
    }

    grid
}

fn shuffled_directions<R: Rng + ?Sized>(rng: &mut R) -> [Direction; 4] {
    let mut dirs = Direction::ALL;
    dirs.shuffle(rng);
    dirs
}

/// Opens a fraction of the walls that separate two floor cells.
///
/// A candidate is an interior wall whose only floor neighbours are two
/// opposite ones (left+right or up+down). Candidates are shuffled and the
/// first `round(ratio × count)` are turned into floor. Only walls are
/// converted, so reachability between any two cells can only grow.
///
/// Returns the number of walls opened.
pub fn inject_loops<R: Rng + ?Sized>(grid: &mut Grid, ratio: f64, rng: &mut R) -> usize {
    let mut candidates: Vec<Position> = grid
        .positions()
        .filter(|&p| grid.is_interior(p) && grid.get(p) == Some(Tile::Wall))
        .filter(|&p| separates_two_floors(grid, p))
        .collect();

    let ratio = ratio.clamp(0.0, 1.0);
    let count = ((candidates.len() as f64) * ratio).round() as usize;
    candidates.shuffle(rng);

    for &pos in candidates.iter().take(count) {
        grid.set(pos, Tile::Floor);
    }
    count.min(candidates.len())
}

fn separates_two_floors(grid: &Grid, pos: Position) -> bool {
    let floor = |d: Direction| grid.is_walkable(pos.step(d));
    let (up, down, left, right) = (
        floor(Direction::Up),
        floor(Direction::Down),
        floor(Direction::Left),
        floor(Direction::Right),
    );
    (left && right && !up && !down) || (up && down && !left && !right)
}

/// Mutates the maze when the treasure is picked up.
///
/// Carves a Manhattan corridor from `from` (the carrier) to `to` (its
/// start), stepping along x first and then along y. Quiz tiles on the way
/// stay quiz tiles; everything else becomes floor. Then `toggles` random
/// interior cells are shaken up: walls open, floors close with a 15%
/// chance. Shake-up skips the corridor, quiz tiles, and every position in
/// `protected` (the players' own cells), so the carrier always keeps the
/// corridor home. The opponent's surroundings may still close up.
pub fn carve_return_corridor<R: Rng + ?Sized>(
    grid: &mut Grid,
    from: Position,
    to: Position,
    protected: &[Position],
    toggles: usize,
    rng: &mut R,
) {
    let mut corridor = HashSet::new();
    let mut open = |grid: &mut Grid, pos: Position| {
        if grid.get(pos) != Some(Tile::Quiz) {
            grid.set(pos, Tile::Floor);
        }
        corridor.insert(pos);
    };

    let mut cursor = from;
    open(grid, cursor);
    while cursor.x != to.x {
        cursor.x += (to.x - cursor.x).signum();
        open(grid, cursor);
    }
    while cursor.y != to.y {
        cursor.y += (to.y - cursor.y).signum();
        open(grid, cursor);
    }

    let (w, h) = (grid.width() as i32, grid.height() as i32);
    if w < 3 || h < 3 {
        return;
    }
    for _ in 0..toggles {
        let pos = Position::new(rng.random_range(1..w - 1), rng.random_range(1..h - 1));
        if corridor.contains(&pos) || protected.contains(&pos) {
            continue;
        }
        match grid.get(pos) {
            Some(Tile::Wall) => {
                grid.set(pos, Tile::Floor);
            }
            Some(Tile::Floor) if rng.random_bool(FLOOR_TO_WALL_CHANCE) => {
                grid.set(pos, Tile::Wall);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::DistanceField;

    fn lattice_cells(grid: &Grid) -> Vec<Position> {
        grid.positions()
            .filter(|p| grid.is_interior(*p) && p.x % 2 == 1 && p.y % 2 == 1)
            .collect()
    }

    #[test]
    fn test_spanning_tree_connects_every_lattice_cell() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = carve_spanning_tree(31, 21, &mut rng);
            let field = DistanceField::from_source(&grid, Position::new(1, 1));
            for cell in lattice_cells(&grid) {
                assert!(field.is_reachable(cell), "seed {seed}: {cell} unreachable");
            }
            // Every carved cell, corridor or room, is in the same component.
            for cell in grid.cells_of(Tile::Floor) {
                assert!(field.is_reachable(cell), "seed {seed}: {cell} unreachable");
            }
        }
    }

    #[test]
    fn test_spanning_tree_is_a_tree() {
        // A perfect maze on an r × c lattice has exactly r·c − 1 corridors.
        let mut rng = StdRng::seed_from_u64(5);
        let grid = carve_spanning_tree(11, 9, &mut rng);
        let rooms = lattice_cells(&grid).len();
        let floors = grid.cells_of(Tile::Floor).len();
        assert_eq!(rooms, 5 * 4);
        assert_eq!(floors - rooms, rooms - 1);
    }

    #[test]
    fn test_border_stays_wall() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = generate_maze(
            &MazeConfig {
                width: 15,
                height: 11,
                extra_loops: 1.0,
            },
            &mut rng,
        )
        .unwrap();
        for pos in grid.positions() {
            if !grid.is_interior(pos) {
                assert_eq!(grid.get(pos), Some(Tile::Wall), "{pos}");
            }
        }
    }

    #[test]
    fn test_loop_injection_never_reduces_reachability() {
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut grid = carve_spanning_tree(21, 15, &mut rng);
            let before = grid.cells_of(Tile::Floor);
            let opened = inject_loops(&mut grid, 0.5, &mut rng);
            assert!(opened > 0);

            let field = DistanceField::from_source(&grid, Position::new(1, 1));
            for cell in &before {
                assert_eq!(grid.get(*cell), Some(Tile::Floor));
                assert!(field.is_reachable(*cell));
            }
            assert_eq!(grid.cells_of(Tile::Floor).len(), before.len() + opened);
        }
    }

    #[test]
    fn test_zero_ratio_keeps_perfect_maze() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = carve_spanning_tree(11, 11, &mut rng);
        let snapshot = grid.clone();
        assert_eq!(inject_loops(&mut grid, 0.0, &mut rng), 0);
        assert_eq!(grid, snapshot);
    }

    #[test]
    fn test_same_seed_same_maze() {
        let config = MazeConfig::default();
        let a = generate_maze(&config, &mut StdRng::seed_from_u64(77)).unwrap();
        let b = generate_maze(&config, &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_even_or_tiny_dimensions_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        for (width, height) in [(30, 21), (31, 20), (3, 3)] {
            let config = MazeConfig {
                width,
                height,
                extra_loops: 0.0,
            };
            assert!(matches!(
                generate_maze(&config, &mut rng),
                Err(MapGenError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn test_return_corridor_connects_and_keeps_quiz_tiles() {
        let mut grid = Grid::from_ascii(&[
            "#########",
            "#.#####.#",
            "###?#####",
            "#########",
            "#.#######",
            "#########",
        ])
        .unwrap();
        let from = Position::new(7, 1);
        let to = Position::new(1, 4);
        let quiz = Position::new(3, 1);
        grid.set(quiz, Tile::Quiz);

        let mut rng = StdRng::seed_from_u64(9);
        carve_return_corridor(&mut grid, from, to, &[from, to], 60, &mut rng);

        assert_eq!(grid.get(quiz), Some(Tile::Quiz));
        assert_eq!(grid.get(Position::new(3, 2)), Some(Tile::Quiz));
        let field = DistanceField::from_source(&grid, from);
        assert!(field.is_reachable(to));
    }

    #[test]
    fn test_return_corridor_never_walls_protected_cells() {
        let mut grid = Grid::filled(9, 9, Tile::Floor);
        let guest = Position::new(6, 6);
        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            carve_return_corridor(
                &mut grid,
                Position::new(1, 1),
                Position::new(1, 7),
                &[guest],
                200,
                &mut rng,
            );
            assert_eq!(grid.get(guest), Some(Tile::Floor));
        }
    }
}
