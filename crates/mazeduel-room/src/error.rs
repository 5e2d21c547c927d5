//! Error types for the room layer.

use mazeduel_mapgen::MapGenError;
use mazeduel_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (or has already been reaped).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The player is neither waiting nor in a room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The player is already waiting or playing.
    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),

    /// The room's map could not be built, so the match never started.
    #[error("map generation failed: {0}")]
    MapGeneration(#[from] MapGenError),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// A broken engine invariant or a failed background task.
    #[error("internal room error: {0}")]
    Internal(String),
}
