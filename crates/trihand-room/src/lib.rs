//! Room lifecycle and game rules for the trihand server.
//!
//! Each room runs as an isolated tokio task (actor model) owning its game
//! state, timers, and acknowledgement set. The state machine itself
//! ([`engine`]) is synchronous and effect-free: it validates an event,
//! mutates the state, runs the guarded "always" transitions to fixed
//! point, and hands back a list of semantic effects. The actor turns those
//! effects into broadcasts, timer operations, and store writes — which
//! keeps the rules unit-testable without a runtime.

mod acks;
mod code;
pub mod engine;
mod error;
mod registry;
mod room;
mod state;

pub use acks::AckTracker;
pub use code::generate_room_code;
pub use engine::{apply_event, can_start, resync, Effect, GameEvent};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{spawn_room, JoinOutcome, LeaveOutcome, PlayerSender, RoomCommand, RoomHandle};
pub use state::{
    Die, GameState, InitialRoll, PendingSelection, Player, PredictionOutcome, RoundResult,
    SetResult, DICE_PER_PLAYER,
};
