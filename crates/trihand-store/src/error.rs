//! Error types for the storage layer.

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The redis backend failed (connect, command, or protocol error).
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend is unreachable and no fallback was available.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
