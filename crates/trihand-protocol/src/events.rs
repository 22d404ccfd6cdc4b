//! Client→server and server→client event enums.
//!
//! Every message on the wire is one JSON object whose `type` field carries
//! the event name (`room:create`, `game:phaseChange`, …) and whose
//! remaining fields are the payload, camelCased. Internally-tagged serde
//! enums produce exactly that shape, and the tests below pin it — the
//! browser client dispatches on these literal strings.

use serde::{Deserialize, Serialize};

use trihand_scoring::Prediction;

use crate::view::{
    FinalStanding, GameConfig, GamePhase, GameStateView, InitialRollView, RoundResultView,
    SetResultView,
};
use crate::{DieId, DieView, PlayerId, RoomCode};

/// Partial config supplied by the host on create or update.
///
/// Absent fields keep their current value; present fields are validated
/// against the [`GameConfig`] bounds before being applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub max_players: Option<u8>,
    pub total_rounds: Option<u8>,
    pub turn_timer_seconds: Option<u8>,
}

impl ConfigOverrides {
    /// Applies the overrides to a base config, returning the merged result.
    pub fn apply_to(&self, base: GameConfig) -> GameConfig {
        GameConfig {
            max_players: self.max_players.unwrap_or(base.max_players),
            total_rounds: self.total_rounds.unwrap_or(base.total_rounds),
            turn_timer_seconds: self
                .turn_timer_seconds
                .unwrap_or(base.turn_timer_seconds),
        }
    }
}

/// Everything a client can send.
///
/// Room codes arrive as plain strings so shape validation can answer with a
/// friendly error instead of a serde failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "room:create", rename_all = "camelCase")]
    RoomCreate {
        player_name: String,
        #[serde(default)]
        config: Option<ConfigOverrides>,
    },

    #[serde(rename = "room:join", rename_all = "camelCase")]
    RoomJoin {
        room_code: String,
        player_name: String,
    },

    #[serde(rename = "room:leave")]
    RoomLeave,

    #[serde(rename = "room:reconnect", rename_all = "camelCase")]
    RoomReconnect { token: String },

    #[serde(rename = "game:ready")]
    GameReady,

    #[serde(rename = "game:unready")]
    GameUnready,

    #[serde(rename = "game:updateConfig", rename_all = "camelCase")]
    GameUpdateConfig { config: ConfigOverrides },

    #[serde(rename = "game:start")]
    GameStart,

    #[serde(rename = "prediction:submit", rename_all = "camelCase")]
    PredictionSubmit { prediction: Prediction },

    #[serde(rename = "dice:select", rename_all = "camelCase")]
    DiceSelect { die_ids: Vec<DieId> },

    #[serde(rename = "dice:confirm")]
    DiceConfirm,

    #[serde(rename = "game:acknowledgeResults")]
    AcknowledgeResults,
}

/// Everything the server can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "room:created", rename_all = "camelCase")]
    RoomCreated {
        room_code: RoomCode,
        player_id: PlayerId,
        reconnect_token: String,
        game_state: GameStateView,
    },

    #[serde(rename = "room:joined", rename_all = "camelCase")]
    RoomJoined {
        room_code: RoomCode,
        player_id: PlayerId,
        reconnect_token: String,
        game_state: GameStateView,
    },

    #[serde(rename = "room:playerJoined", rename_all = "camelCase")]
    PlayerJoined {
        player_id: PlayerId,
        player_name: String,
    },

    #[serde(rename = "room:playerLeft", rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId },

    #[serde(rename = "room:error", rename_all = "camelCase")]
    RoomError { message: String, code: String },

    #[serde(rename = "room:configUpdated", rename_all = "camelCase")]
    ConfigUpdated { config: GameConfig },

    #[serde(rename = "room:hostChanged", rename_all = "camelCase")]
    HostChanged { host_id: PlayerId },

    #[serde(rename = "game:stateUpdate", rename_all = "camelCase")]
    StateUpdate { game_state: GameStateView },

    #[serde(rename = "game:phaseChange", rename_all = "camelCase")]
    PhaseChange {
        phase: GamePhase,
        game_state: GameStateView,
    },

    #[serde(rename = "game:turnStart", rename_all = "camelCase")]
    TurnStart {
        player_id: PlayerId,
        time_remaining: u32,
    },

    #[serde(rename = "game:timerTick", rename_all = "camelCase")]
    TimerTick { time_remaining: u32 },

    #[serde(rename = "game:initialRoll", rename_all = "camelCase")]
    InitialRoll {
        results: Vec<InitialRollView>,
        turn_order: Vec<PlayerId>,
    },

    #[serde(rename = "prediction:submitted", rename_all = "camelCase")]
    PredictionSubmitted { player_id: PlayerId },

    #[serde(rename = "prediction:allSubmitted")]
    PredictionAllSubmitted,

    #[serde(rename = "prediction:autoSubmitting", rename_all = "camelCase")]
    PredictionAutoSubmitting { countdown: u32 },

    #[serde(rename = "dice:selected", rename_all = "camelCase")]
    DiceSelected {
        player_id: PlayerId,
        visible_dice: Vec<DieView>,
        hidden_count: usize,
    },

    #[serde(rename = "dice:confirmed", rename_all = "camelCase")]
    DiceConfirmed { player_id: PlayerId },

    #[serde(rename = "set:reveal", rename_all = "camelCase")]
    SetReveal {
        results: Vec<SetResultView>,
        game_state: GameStateView,
    },

    #[serde(rename = "round:complete", rename_all = "camelCase")]
    RoundComplete {
        result: RoundResultView,
        game_state: GameStateView,
    },

    #[serde(rename = "game:over", rename_all = "camelCase")]
    GameOver {
        final_standings: Vec<FinalStanding>,
    },

    #[serde(rename = "results:acknowledged", rename_all = "camelCase")]
    ResultsAcknowledged {
        player_id: PlayerId,
        acknowledged_count: usize,
        total_count: usize,
    },

    #[serde(rename = "results:waitingFor", rename_all = "camelCase")]
    ResultsWaitingFor {
        waiting_for_player_ids: Vec<PlayerId>,
    },

    #[serde(rename = "player:disconnected", rename_all = "camelCase")]
    PlayerDisconnected { player_id: PlayerId },

    #[serde(rename = "player:reconnected", rename_all = "camelCase")]
    PlayerReconnected { player_id: PlayerId },

    #[serde(rename = "reconnect:success", rename_all = "camelCase")]
    ReconnectSuccess {
        game_state: GameStateView,
        player_id: PlayerId,
    },

    #[serde(rename = "reconnect:failed", rename_all = "camelCase")]
    ReconnectFailed { message: String },
}
