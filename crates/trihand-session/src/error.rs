//! Error types for the session layer.

/// Errors that can occur while redeeming a reconnect token.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The presented token doesn't match any issued token.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The token existed but its 24-hour lifetime has elapsed.
    #[error("reconnection token expired")]
    TokenExpired,
}
