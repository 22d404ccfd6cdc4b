//! # Trihand
//!
//! Real-time multiplayer server for a turn-structured dice game: 2–6
//! players per room, rooms addressed by 6-character codes, each round one
//! prediction plus two 3-die sets.
//!
//! The crate wires the layers together: axum serves `/health`, `/ready`,
//! and the `/ws` upgrade; the gateway validates inbound events and routes
//! them to the room registry; each room runs as its own actor
//! (`trihand-room`) with countdown timers (`trihand-timer`) and a
//! TTL-keyed state store (`trihand-store`) behind it.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use trihand_room::RoomRegistry;
use trihand_session::SessionIdAllocator;
use trihand_store::FallbackStore;

pub use config::ServerConfig;
pub use error::ServerError;

/// Shared server state handed to every connection handler.
pub struct AppState {
    pub registry: Mutex<RoomRegistry<FallbackStore>>,
    pub store: Arc<FallbackStore>,
    pub sessions: SessionIdAllocator,
    pub config: ServerConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<FallbackStore>) -> Self {
        Self {
            registry: Mutex::new(RoomRegistry::new(Arc::clone(&store))),
            store,
            sessions: SessionIdAllocator::new(),
            config,
            started_at: Instant::now(),
        }
    }
}
