//! # Maze Duel
//!
//! Server for a real-time two-player maze race. Both players search a
//! procedurally generated maze for one treasure; stepping on a quiz tile
//! freezes you until you answer its question. Whoever carries the
//! treasure back to their own start wins, and the other player can steal
//! it by walking into the carrier.
//!
//! The layers, bottom up:
//!
//! - [`mazeduel_protocol`]: wire messages and the JSON codec.
//! - [`mazeduel_mapgen`]: maze, placement, colouring, question matching.
//! - [`mazeduel_tick`]: fixed-rate tick pacing.
//! - [`mazeduel_room`]: the rules engine, room actors, and pairing.
//! - this crate: WebSocket transport, per-connection handling, and the
//!   server loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mazeduel::prelude::*;
//!
//! # async fn run() -> Result<(), MazeDuelError> {
//! let server = MazeDuelServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .room_config(RoomConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;
pub mod transport;

pub use error::MazeDuelError;
pub use server::{JOIN_TIMEOUT, MazeDuelServer, MazeDuelServerBuilder};

pub use mazeduel_mapgen as mapgen;
pub use mazeduel_protocol as protocol;
pub use mazeduel_room as room;
pub use mazeduel_tick as tick;

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{MazeDuelError, MazeDuelServer, MazeDuelServerBuilder};
    pub use mazeduel_mapgen::{MapConfig, MazeConfig, PlacementParams, QuestionCatalog};
    pub use mazeduel_protocol::{
        ClientMessage, Direction, PlayerId, Position, RoomId, ServerMessage,
    };
    pub use mazeduel_room::RoomConfig;
    pub use mazeduel_tick::TickConfig;
}
