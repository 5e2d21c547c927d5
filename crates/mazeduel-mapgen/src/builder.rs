//! The full generation pipeline with bounded retries.

use mazeduel_protocol::{MapView, Position, Tile};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::coloring::{DEFAULT_PROXIMITY_RADIUS, ProximityGraph, assign_categories, greedy_coloring};
use crate::matching::{QuizTile, assign_questions, target_difficulty};
use crate::questions::QuestionPool;
use crate::{DistanceField, Grid, MapGenError, MazeConfig, PlacementParams, PlacementSolver, generate_maze};

/// Everything that shapes a room's map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub maze: MazeConfig,
    pub placement: PlacementParams,
    /// Walking distance within which quiz tiles must differ in category.
    pub proximity_radius: u32,
    /// How many mazes to try before giving up.
    pub max_attempts: usize,
    /// Random cells shaken up when the treasure is picked.
    pub return_toggles: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            maze: MazeConfig::default(),
            placement: PlacementParams::default(),
            proximity_radius: DEFAULT_PROXIMITY_RADIUS,
            max_attempts: 12,
            return_toggles: 60,
        }
    }
}

impl MapConfig {
    /// Player 1 starts top-left, player 2 bottom-right.
    pub fn starts(&self) -> [Position; 2] {
        [
            Position::new(1, 1),
            Position::new(self.maze.width as i32 - 2, self.maze.height as i32 - 2),
        ]
    }
}

/// A finished map, owned by one room.
#[derive(Debug, Clone)]
pub struct GameMap {
    pub grid: Grid,
    pub starts: [Position; 2],
    pub treasure: Position,
    pub quiz_tiles: Vec<QuizTile>,
}

impl GameMap {
    pub fn quiz_positions(&self) -> Vec<Position> {
        self.quiz_tiles.iter().map(|t| t.position).collect()
    }

    pub fn quiz_tile(&self, pos: Position) -> Option<&QuizTile> {
        self.quiz_tiles.iter().find(|t| t.position == pos)
    }

    pub fn quiz_tile_mut(&mut self, pos: Position) -> Option<&mut QuizTile> {
        self.quiz_tiles.iter_mut().find(|t| t.position == pos)
    }

    /// The public part of the map, as sent in `start`.
    pub fn view(&self) -> MapView {
        MapView {
            width: self.grid.width(),
            height: self.grid.height(),
            grid: self.grid.rows(),
            treasure: self.treasure,
            quiz: self.quiz_positions(),
        }
    }
}

/// Runs maze → placement → colouring → matching.
///
/// An attempt that yields no feasible placement, or whose quiz tiles are
/// not reachable from both starts, is discarded and a fresh maze is
/// carved, up to `max_attempts` times.
///
/// # Errors
/// - [`MapGenError::InvalidDimensions`] and [`MapGenError::NoQuestions`]
///   immediately, since a new maze can't fix them.
/// - [`MapGenError::Exhausted`] when every attempt failed.
pub fn build_map<R: Rng + ?Sized>(
    config: &MapConfig,
    pool: &mut dyn QuestionPool,
    rng: &mut R,
) -> Result<GameMap, MapGenError> {
    config.maze.validate()?;
    let [start1, start2] = config.starts();
    let solver = PlacementSolver::new(config.placement);
    let mut last_failure = String::from("no attempts made");

    for attempt in 1..=config.max_attempts {
        let mut grid = generate_maze(&config.maze, rng)?;

        let Some(placement) = solver.solve(&grid, start1, start2, rng) else {
            tracing::debug!(attempt, "no feasible placement, regenerating maze");
            last_failure = "placement search found no solution".into();
            continue;
        };

        for &pos in &placement.quiz {
            grid.set(pos, Tile::Quiz);
        }

        let from_starts = [
            DistanceField::from_source(&grid, start1),
            DistanceField::from_source(&grid, start2),
        ];
        if let Some(cut_off) = placement
            .quiz
            .iter()
            .chain([&placement.treasure])
            .find(|&&p| from_starts.iter().any(|f| !f.is_reachable(p)))
        {
            tracing::debug!(attempt, cell = %cut_off, "special cell unreachable, regenerating maze");
            last_failure = format!("cell {cut_off} unreachable from a start");
            continue;
        }

        let graph = ProximityGraph::build(&grid, &placement.quiz, config.proximity_radius);
        let categories = assign_categories(&greedy_coloring(&graph));

        let to_treasure = DistanceField::from_source(&grid, placement.treasure);
        let max_distance = to_treasure.max_finite().unwrap_or(1).max(1);
        let tiles: Vec<_> = placement
            .quiz
            .iter()
            .zip(categories)
            .map(|(&pos, category)| (pos, category, target_difficulty(to_treasure.get(pos), max_distance)))
            .collect();

        let quiz_tiles = assign_questions(&tiles, pool)?;

        tracing::debug!(
            attempt,
            treasure = %placement.treasure,
            quiz = quiz_tiles.len(),
            edges = graph.edges().len(),
            "map generated"
        );
        return Ok(GameMap {
            grid,
            starts: placement.starts,
            treasure: placement.treasure,
            quiz_tiles,
        });
    }

    tracing::warn!(attempts = config.max_attempts, %last_failure, "map generation exhausted");
    Err(MapGenError::Exhausted {
        attempts: config.max_attempts,
        last_failure,
    })
}
