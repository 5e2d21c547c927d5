//! Error types for the protocol layer.
//!
//! Each crate in Maze Duel defines its own error enum, so a
//! `ProtocolError` always means "the bytes or the message shape were
//! wrong", never "the room or the network misbehaved".

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `type` tag,
    /// a missing field, or a direction outside `U`/`D`/`L`/`R`.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but is not allowed at this point of the
    /// conversation, e.g. a second `join` on the same connection.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
