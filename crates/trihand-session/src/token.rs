//! Reconnect tokens.

use rand::Rng;
use serde::{Deserialize, Serialize};

use trihand_protocol::{PlayerId, RoomCode};

use crate::SessionError;

/// How long an issued token stays valid.
pub const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// A persisted reconnect token record (`reconnect:<token>` in the store).
///
/// `expires_at` is absolute unix seconds; the store's own TTL and this
/// deadline agree at issue time, but the deadline is what's checked on
/// redemption so a degraded store can't extend a token's life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectToken {
    pub token: String,
    pub player_id: PlayerId,
    pub room_code: RoomCode,
    pub expires_at: u64,
}

impl ReconnectToken {
    /// Issues a fresh token for a player in a room.
    pub fn issue(player_id: PlayerId, room_code: RoomCode, now_unix: u64) -> Self {
        Self {
            token: generate_token(),
            player_id,
            room_code,
            expires_at: now_unix + TOKEN_TTL_SECS,
        }
    }

    pub fn is_expired(&self, now_unix: u64) -> bool {
        now_unix >= self.expires_at
    }

    /// Validates the record against the presented token string and clock.
    pub fn validate(&self, presented: &str, now_unix: u64) -> Result<(), SessionError> {
        if self.token != presented {
            return Err(SessionError::InvalidToken);
        }
        if self.is_expired(now_unix) {
            return Err(SessionError::TokenExpired);
        }
        Ok(())
    }
}

/// Generates a random 32-character hex token (128 bits of entropy) —
/// enough that guessing a live token is not a realistic attack.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
