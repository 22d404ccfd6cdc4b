//! Unified error type for the server crate.

use trihand_protocol::ProtocolError;
use trihand_room::RoomError;
use trihand_session::SessionError;
use trihand_store::StoreError;

/// Top-level error wrapping every layer's error type.
///
/// `#[from]` lets `?` convert sub-crate errors automatically; the gateway
/// unwraps back to [`RoomError`] where a client-facing code is needed.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
