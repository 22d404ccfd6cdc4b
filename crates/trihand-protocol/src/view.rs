//! Shared game-state vocabulary and per-viewer state views.
//!
//! A [`GameStateView`] is what a single client is allowed to see: their own
//! dice in full, opponents' red/blue dice value-masked until revealed, and
//! opponents' predictions hidden until the round summary. The room actor
//! builds one view per recipient — full state never leaves the server.

use serde::{Deserialize, Serialize};

use trihand_scoring::{EvaluatedHand, Prediction};

use crate::{DieId, PlayerId, RoomCode};

/// The color of a die. White dice are always revealed; red and blue start
/// hidden and reveal when selected into a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DieColor {
    White,
    Red,
    Blue,
}

/// A stage of the per-room game lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    InitialRoll,
    Prediction,
    SetSelection,
    SetReveal,
    RoundSummary,
    GameOver,
}

/// Room configuration, host-adjustable while in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub max_players: u8,
    pub total_rounds: u8,
    pub turn_timer_seconds: u8,
}

impl GameConfig {
    pub const MAX_PLAYERS_RANGE: std::ops::RangeInclusive<u8> = 2..=6;
    pub const TOTAL_ROUNDS_RANGE: std::ops::RangeInclusive<u8> = 3..=10;
    pub const TURN_TIMER_RANGE: std::ops::RangeInclusive<u8> = 15..=60;

    /// Whether every field sits inside its allowed range.
    pub fn is_valid(&self) -> bool {
        Self::MAX_PLAYERS_RANGE.contains(&self.max_players)
            && Self::TOTAL_ROUNDS_RANGE.contains(&self.total_rounds)
            && Self::TURN_TIMER_RANGE.contains(&self.turn_timer_seconds)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: 6,
            total_rounds: 5,
            turn_timer_seconds: 30,
        }
    }
}

/// One die as a specific viewer sees it.
///
/// `value` is `None` while the die is hidden from that viewer (an
/// opponent's unrevealed red or blue die).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieView {
    pub id: DieId,
    pub color: DieColor,
    pub value: Option<u8>,
    pub spent: bool,
    pub revealed: bool,
}

/// One player as a specific viewer sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub dice: Vec<DieView>,
    pub cumulative_score: f64,
    pub current_round_score: f64,
    pub set1_score: f64,
    pub set2_score: f64,
    /// The player's own prediction; `None` on opponents until revealed in
    /// the round summary.
    pub prediction: Option<Prediction>,
    /// Whether a prediction has been submitted (visible to everyone).
    pub has_prediction: bool,
    pub is_connected: bool,
    pub is_ready: bool,
    pub is_host: bool,
}

/// A player's in-flight selection as a specific viewer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    pub player_id: PlayerId,
    pub confirmed: bool,
    /// Dice the viewer may see (own selection in full, opponents' revealed
    /// dice only).
    pub visible_dice: Vec<DieView>,
    /// How many of the selection's dice are hidden from the viewer.
    pub hidden_count: usize,
}

/// One player's result for a completed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetResultView {
    pub player_id: PlayerId,
    pub hand: EvaluatedHand,
    pub die_ids: Vec<DieId>,
    pub dice_values: Vec<u8>,
    pub placement: usize,
    pub points: f64,
}

/// A prediction's outcome, revealed in the round summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcomeView {
    pub player_id: PlayerId,
    pub prediction: Prediction,
    pub round_total: f64,
    pub hit: bool,
    pub bonus: f64,
}

/// A completed round: both sets plus prediction outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResultView {
    pub round: u8,
    pub set1_results: Vec<SetResultView>,
    pub set2_results: Vec<SetResultView>,
    pub prediction_outcomes: Vec<PredictionOutcomeView>,
}

/// One player's 2d6 opening roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialRollView {
    pub player_id: PlayerId,
    pub dice: [u8; 2],
    pub sum: u8,
}

/// Final leaderboard entry for `game:over`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStanding {
    pub player_id: PlayerId,
    pub player_name: String,
    pub score: f64,
    pub placement: usize,
}

/// The full game state as one viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub room_code: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<PlayerView>,
    pub config: GameConfig,
    pub current_round: u8,
    pub current_set: u8,
    pub turn_order: Vec<PlayerId>,
    pub current_turn_index: usize,
    pub selections: Vec<SelectionView>,
    pub set_results: Vec<SetResultView>,
    pub round_history: Vec<RoundResultView>,
    pub initial_rolls: Vec<InitialRollView>,
    /// `None` only for the instant between room creation and the host's
    /// join landing.
    pub host_id: Option<PlayerId>,
    pub created_at: u64,
}
