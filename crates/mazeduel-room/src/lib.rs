//! Rooms for Maze Duel.
//!
//! A room is one two-player match. It is built in three layers:
//!
//! - [`RoomEngine`]: the rules. Pure and synchronous: it takes queued
//!   player actions and a timestamp, and returns the messages to send.
//! - Room actor ([`RoomHandle`]): an isolated Tokio task that owns one
//!   engine, paces it with a tick scheduler, and delivers its output to
//!   the players' outbound channels.
//! - [`RoomManager`]: pairs waiting players first-come first-served,
//!   generates the map, and spawns the actor.

mod config;
mod engine;
mod error;
mod manager;
mod room;

pub use config::RoomConfig;
pub use engine::{Outbound, Player, PlayerAction, QuizStatus, RoomEngine};
pub use error::RoomError;
pub use manager::{JoinOutcome, Pairing, PendingRoom, RoomManager, join_shared};
pub use room::{PlayerSender, RoomHandle, RoomInfo, spawn_room};
