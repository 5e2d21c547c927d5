//! Error types for map generation.

use mazeduel_protocol::Category;

/// Errors that can occur while building a room's map.
///
/// Only [`MapGenError::Exhausted`] is the result of bad luck; the other
/// variants describe configuration problems that regenerating the maze
/// cannot fix, so [`build_map`](crate::build_map) returns them immediately.
#[derive(Debug, thiserror::Error)]
pub enum MapGenError {
    /// Maze dimensions must be odd (so the carving lattice reaches the
    /// border walls) and at least 5.
    #[error("invalid maze dimensions {width}x{height}: both must be odd and at least 5")]
    InvalidDimensions { width: usize, height: usize },

    /// The question pool has nothing to offer for a category that the
    /// colouring assigned to at least one tile.
    #[error("question pool has no questions in category {0}")]
    NoQuestions(Category),

    /// A question catalog failed to parse or contains an unusable record.
    #[error("invalid question catalog: {0}")]
    InvalidCatalog(String),

    /// Every attempt produced a maze with no feasible placement.
    #[error("map generation failed after {attempts} attempts: {last_failure}")]
    Exhausted {
        attempts: usize,
        last_failure: String,
    },
}
