//! Room registry: maps room codes to live actors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::SeedableRng;

use trihand_protocol::{ConfigOverrides, GameConfig, PlayerId, RoomCode};
use trihand_store::Store;

use crate::code::generate_room_code;
use crate::room::{spawn_room, LeaveOutcome, RoomHandle};
use crate::state::GameState;
use crate::RoomError;

/// Owns the code→actor map. Lives behind the server's mutex; everything
/// per-room goes through the actor, so this map is only touched on
/// create, lookup, and destroy.
pub struct RoomRegistry<S: Store> {
    rooms: HashMap<RoomCode, RoomHandle>,
    store: Arc<S>,
    rng: StdRng,
    /// Fixed actor seed for deterministic tests; `None` in production.
    actor_seed: Option<u64>,
}

impl<S: Store> RoomRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            rooms: HashMap::new(),
            store,
            rng: StdRng::from_os_rng(),
            actor_seed: None,
        }
    }

    /// A registry whose room codes and room actors are seeded, for tests.
    pub fn seeded(store: Arc<S>, seed: u64) -> Self {
        Self {
            rooms: HashMap::new(),
            store,
            rng: StdRng::seed_from_u64(seed),
            actor_seed: Some(seed),
        }
    }

    /// Creates a room with a fresh unique code and spawns its actor.
    ///
    /// The caller (gateway) joins the creating player immediately after,
    /// which makes them host.
    pub fn create_room(&mut self, overrides: Option<ConfigOverrides>) -> Result<RoomHandle, RoomError> {
        let config = overrides
            .map(|o| o.apply_to(GameConfig::default()))
            .unwrap_or_default();
        if !config.is_valid() {
            return Err(RoomError::InvalidPayload(
                "config outside allowed ranges".into(),
            ));
        }

        // Redraw on collision; 31^6 codes make more than one redraw
        // vanishingly rare at any believable room count.
        let room_code = loop {
            let candidate = generate_room_code(&mut self.rng);
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let state = GameState::new(room_code.clone(), config, created_at);
        let handle = spawn_room(state, Arc::clone(&self.store), self.actor_seed);
        self.rooms.insert(room_code.clone(), handle.clone());

        tracing::info!(room = %room_code, "room created");
        Ok(handle)
    }

    /// Looks up a live room by code.
    pub fn get(&self, room_code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(room_code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(room_code.clone()))
    }

    /// Routes a leave to the room and drops the actor if it emptied.
    pub async fn leave(
        &mut self,
        room_code: &RoomCode,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self.get(room_code)?;
        let outcome = handle.leave(player_id).await?;
        if outcome.room_deleted {
            self.remove(room_code).await;
        }
        Ok(outcome)
    }

    /// Removes a room's handle and shuts its actor down.
    pub async fn remove(&mut self, room_code: &RoomCode) {
        if let Some(handle) = self.rooms.remove(room_code) {
            handle.shutdown().await;
            tracing::info!(room = %room_code, "room destroyed");
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
