//! Wire protocol for Maze Duel.
//!
//! This crate defines the "language" that clients and the room server
//! speak, plus the small geometric vocabulary every other crate shares:
//!
//! - **Geometry** ([`Position`], [`Tile`], [`Direction`]): cells of the
//!   maze and the four moves a player can make.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]): one tagged
//!   variant per message kind, handled exhaustively at the boundary.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (game rules)
//! ```

mod codec;
mod error;
mod geometry;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use geometry::{Direction, Position, Tile};
pub use types::{
    Category, ClientMessage, EndReason, EventName, MapView, Phase, PlayerId,
    PlayerView, QuestionId, QuestionMeta, Recipient, RoomId, ServerMessage,
    StateView,
};
