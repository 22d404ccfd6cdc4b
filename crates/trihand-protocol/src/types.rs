//! Identity types that travel on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

/// A unique identifier for a player.
///
/// Newtype over a UUID so a player id can't be confused with any other
/// string on the wire. `#[serde(transparent)]` serializes it as the bare
/// UUID string, which is what the browser client stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Generates a fresh random player id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The alphabet room codes are drawn from.
///
/// Excludes `0/O/1/I/L` so a code read aloud or retyped from a screenshot
/// can't be mis-transcribed.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Wire length of a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// A 6-character room code over [`ROOM_CODE_ALPHABET`].
///
/// The wire form is the bare 6 characters; [`RoomCode::display_pretty`]
/// renders the dashed form (`ABC-DEF`) clients show in lobbies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps an already-validated code. Private to force `parse` on input.
    pub(crate) fn new_unchecked(code: String) -> Self {
        Self(code)
    }

    /// Builds a room code from the given characters without validating.
    ///
    /// For use by the code generator, which only draws from the alphabet.
    pub fn from_generated(code: String) -> Self {
        debug_assert!(code.len() == ROOM_CODE_LEN);
        Self(code)
    }

    /// The bare 6-character wire form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The dashed display form, e.g. `ABC-DEF`.
    pub fn display_pretty(&self) -> String {
        format!("{}-{}", &self.0[..3], &self.0[3..])
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    /// Parses and validates a client-supplied room code.
    ///
    /// Input is uppercased first so `abc234` and `ABC234` address the same
    /// room; a dash after the third character is tolerated and stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().to_uppercase().replace('-', "");
        if cleaned.len() != ROOM_CODE_LEN
            || !cleaned.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
        {
            return Err(ProtocolError::InvalidRoomCode(s.to_string()));
        }
        Ok(Self::new_unchecked(cleaned))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a single die within a player's round pool.
///
/// Unique per player per round (`d1`..`d11`); selections always pair a die
/// id with its owning player, so no global uniqueness is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DieId(pub String);

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle for one client connection.
///
/// Allocated by the gateway when a socket connects; a player's session id
/// changes when they reconnect, their [`PlayerId`] does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}
