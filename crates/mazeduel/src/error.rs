//! Unified error type for the Maze Duel server.

use mazeduel_mapgen::MapGenError;
use mazeduel_protocol::ProtocolError;
use mazeduel_room::RoomError;

use crate::transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MazeDuelError {
    /// Binding, accepting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded or decoded, or arrived out of turn.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Pairing or room routing failed.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A question catalog could not be loaded.
    #[error(transparent)]
    MapGen(#[from] MapGenError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let mazeduel_err: MazeDuelError = err.into();
        assert!(matches!(mazeduel_err, MazeDuelError::Transport(_)));
        assert!(mazeduel_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let mazeduel_err: MazeDuelError = err.into();
        assert!(matches!(mazeduel_err, MazeDuelError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(mazeduel_protocol::RoomId(1));
        let mazeduel_err: MazeDuelError = err.into();
        assert!(matches!(mazeduel_err, MazeDuelError::Room(_)));
        assert_eq!(mazeduel_err.to_string(), "room R-1 not found");
    }

    #[test]
    fn test_from_mapgen_error() {
        let err = MapGenError::InvalidDimensions { width: 4, height: 5 };
        let mazeduel_err: MazeDuelError = err.into();
        assert!(matches!(mazeduel_err, MazeDuelError::MapGen(_)));
    }
}
