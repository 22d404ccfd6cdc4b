//! Keyed blob storage with per-entry TTL.
//!
//! Game state and reconnect tokens are stored as JSON strings under
//! `game:<ROOMCODE>` and `reconnect:<token>` keys, each write resetting a
//! 24-hour TTL. The [`Store`] trait is the seam; [`RedisStore`] is the
//! remote backend and [`MemoryStore`] the in-process one.
//! [`FallbackStore`] composes them so an unreachable redis degrades
//! operation-by-operation to the memory store instead of failing the room.

#![allow(async_fn_in_trait)]

mod error;
mod fallback;
mod memory;
mod redis_store;

use std::time::Duration;

pub use error::StoreError;
pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// TTL applied to every game-state and reconnect-token write.
pub const STATE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Storage key for a room's serialized game state.
pub fn game_key(room_code: &str) -> String {
    format!("game:{room_code}")
}

/// Storage key for a reconnect token record.
pub fn reconnect_key(token: &str) -> String {
    format!("reconnect:{token}")
}

/// String-keyed blob storage with per-entry TTL.
///
/// Methods are declared with explicit `impl Future + Send` (not bare
/// `async fn`) because room actors call them from spawned tasks — the
/// spawn needs a `Send` future even when the store type is generic.
/// Implementations still write plain `async fn`.
pub trait Store: Send + Sync + 'static {
    /// Fetches a value, or `None` if absent or expired.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Writes a value, (re)setting its TTL.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Removes a value. Removing an absent key is not an error.
    fn delete(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
