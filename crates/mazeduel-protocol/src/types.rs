//! Message types for Maze Duel's wire format.
//!
//! Every message is an internally tagged JSON object whose `type` field
//! names the variant:
//!
//! ```text
//! {"type":"input","dir":"U"}
//! {"type":"answer","qid":"q-1a2b3c4d","choice":2}
//! {"type":"event","name":"TREASURE_STOLEN","by":2}
//! ```
//!
//! Inbound and outbound kinds are separate enums so the compiler checks
//! that each side handles every kind it can receive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Direction, Position, Tile};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected player.
///
/// Newtype over `u64` so it can't be mixed up with a [`RoomId`].
/// `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a room (one two-player match).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Opaque id of one issued question.
///
/// Minted by the question pool each time a question is registered and
/// bound privately to its correct choice. Clients echo it back in
/// `answer` messages; a mismatched id is simply ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game vocabulary
// ---------------------------------------------------------------------------

/// Question category. Nearby quiz tiles are coloured so they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Math,
    Logic,
    Trick,
    Pattern,
}

impl Category {
    /// Colour `c` of the proximity graph maps to `ALL[c % ALL.len()]`.
    pub const ALL: [Category; 4] = [
        Category::Math,
        Category::Logic,
        Category::Trick,
        Category::Pattern,
    ];

    pub fn from_color(color: usize) -> Category {
        Self::ALL[color % Self::ALL.len()]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Math => "math",
            Category::Logic => "logic",
            Category::Trick => "trick",
            Category::Pattern => "pattern",
        };
        f.write_str(name)
    }
}

/// Room phase. `SEARCH` until someone picks up the treasure, then
/// `RETURN` for the rest of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    #[default]
    Search,
    Return,
}

/// Names of the one-shot events broadcast during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventName {
    TreasurePicked,
    TreasureStolen,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// The carrier brought the treasure back to its own start.
    Treasure,
    /// One of the players left; nobody wins.
    Disconnect,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound message produced by the room engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Both players in the room.
    All,
    /// One specific player (questions are private).
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Public view of a player, included in every `state` broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub pos: Position,
    pub start: Position,
    pub has_treasure: bool,
    pub locked: bool,
    /// Remaining stun in milliseconds, 0 when the player can move.
    pub stun_ms: u64,
}

/// Authoritative room state, sent once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateView {
    pub tick: u64,
    pub phase: Phase,
    pub players: Vec<PlayerView>,
    pub treasure: Position,
    pub carrier: Option<PlayerId>,
}

/// The static map sent once in `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapView {
    pub width: usize,
    pub height: usize,
    /// Row-major: `grid[y][x]`.
    pub grid: Vec<Vec<Tile>>,
    pub treasure: Position,
    pub quiz: Vec<Position>,
}

/// Extra information attached to a `question` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMeta {
    pub category: Category,
    pub difficulty: u8,
}

// ---------------------------------------------------------------------------
// ClientMessage (client → server)
// ---------------------------------------------------------------------------

/// Messages a client may send.
///
/// Anything that fails to decode into one of these variants is answered
/// with [`ServerMessage::Error`] and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on every connection: queue me for a match.
    Join {
        #[serde(default)]
        name: Option<String>,
    },
    /// Move one cell.
    Input { dir: Direction },
    /// Answer the question currently locking the player.
    Answer { qid: QuestionId, choice: usize },
}

// ---------------------------------------------------------------------------
// ServerMessage (server → client)
// ---------------------------------------------------------------------------

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The player is queued and waiting for an opponent.
    Waiting { player_id: PlayerId },

    /// The match has been created. Sent once to each player.
    Start {
        player_id: PlayerId,
        room_id: RoomId,
        map: MapView,
        state: StateView,
    },

    /// Private to the locked player. The correct choice never leaves the
    /// server.
    Question {
        qid: QuestionId,
        prompt: String,
        choices: Vec<String>,
        timeout_ms: u64,
        meta: QuestionMeta,
    },

    /// Per-tick authoritative state.
    State(StateView),

    /// Treasure picked up or stolen.
    Event { name: EventName, by: PlayerId },

    /// The grid changed (return corridor carved). Row-major.
    MapUpdate { grid: Vec<Vec<Tile>> },

    /// The match is over. `winner` is `None` when it ended by disconnect.
    End {
        winner: Option<PlayerId>,
        reason: EndReason,
    },

    /// Something went wrong with a request or with the room.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
