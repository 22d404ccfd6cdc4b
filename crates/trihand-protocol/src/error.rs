//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding, or validating wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed JSON, missing fields, or an
    /// unknown event type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A room code that isn't 6 characters over the unambiguous alphabet.
    #[error("invalid room code: {0:?}")]
    InvalidRoomCode(String),

    /// A payload that parsed but violates a field constraint.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
