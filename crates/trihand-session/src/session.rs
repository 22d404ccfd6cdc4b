//! Per-connection session state.

use std::sync::atomic::{AtomicU64, Ordering};

use trihand_protocol::{PlayerId, RoomCode, SessionId};

/// What the gateway knows about one live connection.
///
/// All fields are `None` until the client creates, joins, or reconnects to
/// a room; they are the routing context for every subsequent event on the
/// socket.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub player_id: Option<PlayerId>,
    pub room_code: Option<RoomCode>,
    pub reconnect_token: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the session to a player in a room.
    pub fn attach(&mut self, player_id: PlayerId, room_code: RoomCode, token: String) {
        self.player_id = Some(player_id);
        self.room_code = Some(room_code);
        self.reconnect_token = Some(token);
    }

    /// Clears the room binding (on leave). The socket stays usable for a
    /// subsequent create/join.
    pub fn detach(&mut self) {
        self.player_id = None;
        self.room_code = None;
        self.reconnect_token = None;
    }

    /// Whether the session is currently bound to a room.
    pub fn in_room(&self) -> bool {
        self.room_code.is_some()
    }
}

/// Allocates process-unique session ids.
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    next: AtomicU64,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> SessionId {
        SessionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
