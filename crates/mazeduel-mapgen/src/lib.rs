//! Procedural level generation for Maze Duel.
//!
//! A room's map is built once, before its tick loop starts, by a fixed
//! pipeline:
//!
//! ```text
//! maze ──→ placement ──→ colouring ──→ difficulty matching
//!  (grid)   (treasure +    (category     (one question
//!            quiz cells)    per tile)     per tile)
//! ```
//!
//! Every stage takes the room's seeded RNG by `&mut`, never a global one,
//! so one seed reproduces one map. [`build_map`] runs the pipeline and
//! regenerates the maze when placement turns out to be infeasible, up to
//! [`MapConfig::max_attempts`] times.

mod builder;
mod coloring;
mod distance;
mod error;
mod grid;
mod matching;
mod maze;
mod placement;
mod questions;

pub use builder::{GameMap, MapConfig, build_map};
pub use coloring::{DEFAULT_PROXIMITY_RADIUS, ProximityGraph, assign_categories, greedy_coloring};
pub use distance::{DistanceField, INF};
pub use error::MapGenError;
pub use grid::Grid;
pub use matching::{
    Assignment, PAD_COST, QuizTile, assign_questions, hungarian, pad_to_square, target_difficulty,
};
pub use maze::{
    MazeConfig, carve_return_corridor, carve_spanning_tree, generate_maze, inject_loops,
};
pub use placement::{Placement, PlacementParams, PlacementSolver};
pub use questions::{
    DEFAULT_TIMEOUT_MS, Question, QuestionBank, QuestionCatalog, QuestionPool, TileQuestion,
};
