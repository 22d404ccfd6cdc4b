//! Error types for room and game-rule violations.

use trihand_protocol::{GamePhase, RoomCode};

/// Everything a room operation or game event can be rejected for.
///
/// Each variant maps to a stable machine-readable code via
/// [`code`](Self::code); the gateway sends `{message, code}` to the
/// initiating client only. None of these mutate room state.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("game already in progress")]
    GameInProgress,

    #[error("room {0} is full")]
    RoomFull(RoomCode),

    #[error("name {0:?} is already taken")]
    NameTaken(String),

    #[error("player not found in room")]
    PlayerNotFound,

    #[error("only the host can do that")]
    NotHost,

    #[error("game cannot start yet")]
    CannotStart,

    #[error("no running game for this room")]
    GameNotFound,

    #[error("operation not valid in phase {0:?}")]
    InvalidPhase(GamePhase),

    #[error("not your turn")]
    NotYourTurn,

    #[error("a selection must be exactly 3 of your dice")]
    InvalidSelection,

    #[error("die does not belong to you")]
    InvalidDie,

    #[error("die already spent")]
    DieAlreadySpent,

    #[error("no selection to confirm")]
    NoSelection,

    #[error("selection already confirmed")]
    AlreadyConfirmed,

    #[error("prediction already submitted")]
    PredictionAlreadySubmitted,

    /// A malformed or out-of-bounds payload caught by validation.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The room actor's mailbox is gone — reported to clients as a
    /// missing game.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// The stable code clients dispatch on.
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            RoomError::GameInProgress => "GAME_IN_PROGRESS",
            RoomError::RoomFull(_) => "ROOM_FULL",
            RoomError::NameTaken(_) => "NAME_TAKEN",
            RoomError::PlayerNotFound => "PLAYER_NOT_FOUND",
            RoomError::NotHost => "NOT_HOST",
            RoomError::CannotStart => "CANNOT_START",
            RoomError::GameNotFound | RoomError::Unavailable(_) => "GAME_NOT_FOUND",
            RoomError::InvalidPhase(_) => "INVALID_PHASE",
            RoomError::NotYourTurn => "NOT_YOUR_TURN",
            RoomError::InvalidSelection => "INVALID_SELECTION",
            RoomError::InvalidDie => "INVALID_DIE",
            RoomError::DieAlreadySpent => "DIE_ALREADY_SPENT",
            RoomError::NoSelection => "NO_SELECTION",
            RoomError::AlreadyConfirmed => "ALREADY_CONFIRMED",
            RoomError::PredictionAlreadySubmitted => "PREDICTION_ALREADY_SUBMITTED",
            RoomError::InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }
}
