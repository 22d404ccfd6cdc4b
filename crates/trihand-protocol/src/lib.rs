//! Wire protocol for the trihand game server.
//!
//! This crate defines the language that clients and the server speak:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`DieId`], [`SessionId`]) —
//!   the identities that travel on the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — every inbound and
//!   outbound message, with the literal `room:*` / `game:*` event names
//!   the browser client dispatches on.
//! - **Views** ([`GameStateView`], [`DieView`], …) — per-viewer snapshots
//!   of game state with opponents' hidden dice masked.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages convert
//!   to/from bytes.
//!
//! The protocol layer knows nothing about connections, rooms, or timers;
//! it only describes what goes on the wire.

mod codec;
mod error;
mod events;
mod types;
mod view;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use events::{ClientEvent, ConfigOverrides, ServerEvent};
pub use types::{DieId, PlayerId, RoomCode, SessionId, ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
pub use view::{
    DieColor, DieView, FinalStanding, GameConfig, GamePhase, GameStateView, InitialRollView,
    PlayerView, PredictionOutcomeView, RoundResultView, SelectionView, SetResultView,
};
