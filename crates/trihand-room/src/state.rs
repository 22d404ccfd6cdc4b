//! The per-room game state: dice, players, results, and view building.
//!
//! `GameState` is both the actor's working state and the blob persisted
//! under `game:<ROOMCODE>`, so everything here is serde-serializable.
//! Clients never receive it directly — [`GameState::view_for`] produces
//! the per-viewer snapshot with hidden information masked.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use trihand_protocol::{
    DieColor, DieId, DieView, FinalStanding, GameConfig, GamePhase, GameStateView, InitialRollView,
    PlayerId, PlayerView, PredictionOutcomeView, RoomCode, RoundResultView, SelectionView,
    SessionId, SetResultView,
};
use trihand_scoring::{EvaluatedHand, Prediction};

/// Dice each player holds per round: 9 white + 1 red + 1 blue.
pub const DICE_PER_PLAYER: usize = 11;

const WHITE_DICE_PER_PLAYER: usize = 9;

/// One die in a player's round pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Die {
    pub id: DieId,
    pub color: DieColor,
    pub value: u8,
    pub spent: bool,
    pub revealed: bool,
}

/// Rolls a fresh pool of 11 dice. White dice start revealed; the red and
/// the blue die start hidden and reveal when selected into a hand.
pub(crate) fn roll_dice_pool(rng: &mut impl Rng) -> Vec<Die> {
    (0..DICE_PER_PLAYER)
        .map(|i| {
            let color = match i {
                i if i < WHITE_DICE_PER_PLAYER => DieColor::White,
                i if i == WHITE_DICE_PER_PLAYER => DieColor::Red,
                _ => DieColor::Blue,
            };
            Die {
                id: DieId(format!("d{}", i + 1)),
                color,
                value: rng.random_range(1..=6),
                spent: false,
                revealed: color == DieColor::White,
            }
        })
        .collect()
}

/// One player in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Live connection handle; `None` while disconnected.
    pub session: Option<SessionId>,
    pub dice: Vec<Die>,
    pub cumulative_score: f64,
    pub current_round_score: f64,
    pub set1_score: f64,
    pub set2_score: f64,
    pub prediction: Option<Prediction>,
    pub is_connected: bool,
    pub is_ready: bool,
    pub is_host: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, session: SessionId, is_host: bool) -> Self {
        Self {
            id,
            name,
            session: Some(session),
            dice: Vec::new(),
            cumulative_score: 0.0,
            current_round_score: 0.0,
            set1_score: 0.0,
            set2_score: 0.0,
            prediction: None,
            is_connected: true,
            is_ready: false,
            is_host,
        }
    }

    pub fn die(&self, id: &DieId) -> Option<&Die> {
        self.dice.iter().find(|d| &d.id == id)
    }

    /// The first `n` unspent dice in pool order (the auto-select rule).
    pub fn first_unspent(&self, n: usize) -> Vec<DieId> {
        self.dice
            .iter()
            .filter(|d| !d.spent)
            .take(n)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Resets the per-round fields and deals a fresh dice pool.
    pub(crate) fn start_round(&mut self, rng: &mut impl Rng) {
        self.dice = roll_dice_pool(rng);
        self.prediction = None;
        self.current_round_score = 0.0;
        self.set1_score = 0.0;
        self.set2_score = 0.0;
    }
}

/// A player's in-flight 3-die selection for the current set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSelection {
    pub die_ids: Vec<DieId>,
    pub confirmed: bool,
}

/// One player's outcome for a completed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetResult {
    pub player_id: PlayerId,
    pub hand: EvaluatedHand,
    pub die_ids: Vec<DieId>,
    pub dice_values: Vec<u8>,
    pub placement: usize,
    pub points: f64,
}

/// A prediction's outcome, settled at the round summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcome {
    pub player_id: PlayerId,
    pub prediction: Prediction,
    pub round_total: f64,
    pub hit: bool,
    pub bonus: f64,
}

/// One completed round in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round: u8,
    pub set1_results: Vec<SetResult>,
    pub set2_results: Vec<SetResult>,
    pub prediction_outcomes: Vec<PredictionOutcome>,
}

/// A player's 2d6 opening roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialRoll {
    pub player_id: PlayerId,
    pub dice: [u8; 2],
    pub sum: u8,
}

/// The complete state of one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub room_code: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub current_round: u8,
    /// 1 or 2.
    pub current_set: u8,
    pub turn_order: Vec<PlayerId>,
    /// Index into `turn_order`; equal to its length once everyone acted.
    pub current_turn_index: usize,
    pub pending_selections: HashMap<PlayerId, PendingSelection>,
    /// Results of the set currently on display (SET_REVEAL).
    pub set_results: Vec<SetResult>,
    pub round_history: Vec<RoundResult>,
    pub initial_rolls: Vec<InitialRoll>,
    /// The round-1 order, kept all game for the later-round tie-break.
    pub initial_turn_order: Vec<PlayerId>,
    pub host_id: Option<PlayerId>,
    pub created_at: u64,
}

impl GameState {
    pub fn new(room_code: RoomCode, config: GameConfig, created_at: u64) -> Self {
        Self {
            room_code,
            phase: GamePhase::Lobby,
            players: Vec::new(),
            config,
            current_round: 0,
            current_set: 1,
            turn_order: Vec::new(),
            current_turn_index: 0,
            pending_selections: HashMap::new(),
            set_results: Vec::new(),
            round_history: Vec::new(),
            initial_rolls: Vec::new(),
            initial_turn_order: Vec::new(),
            host_id: None,
            created_at,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The player whose turn it is, or `None` once everyone has acted.
    pub fn current_turn_holder(&self) -> Option<PlayerId> {
        self.turn_order.get(self.current_turn_index).copied()
    }

    pub fn connected_player_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.is_connected)
            .map(|p| p.id)
            .collect()
    }

    /// Case-insensitive display-name collision check.
    pub fn name_taken(&self, name: &str) -> bool {
        self.players
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Final leaderboard, best cumulative score first. Ties share their
    /// input-order placement like set placements do.
    pub fn final_standings(&self) -> Vec<FinalStanding> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| {
            b.cumulative_score
                .partial_cmp(&a.cumulative_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut standings = Vec::with_capacity(ranked.len());
        let mut placement = 0;
        let mut last_score = f64::INFINITY;
        for (i, player) in ranked.iter().enumerate() {
            if player.cumulative_score < last_score {
                placement = i + 1;
                last_score = player.cumulative_score;
            }
            standings.push(FinalStanding {
                player_id: player.id,
                player_name: player.name.clone(),
                score: player.cumulative_score,
                placement,
            });
        }
        standings
    }

    // --- Per-viewer views -------------------------------------------------

    /// Builds the state snapshot a single viewer is allowed to see.
    ///
    /// The viewer sees their own dice and prediction in full; opponents'
    /// unrevealed red/blue dice carry no value, and opponents' predictions
    /// stay hidden until they surface in round results.
    pub fn view_for(&self, viewer: PlayerId) -> GameStateView {
        GameStateView {
            room_code: self.room_code.clone(),
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|p| player_view(p, p.id == viewer))
                .collect(),
            config: self.config,
            current_round: self.current_round,
            current_set: self.current_set,
            turn_order: self.turn_order.clone(),
            current_turn_index: self.current_turn_index,
            selections: self
                .pending_selections
                .iter()
                .map(|(owner, sel)| self.selection_view(*owner, sel, viewer))
                .collect(),
            set_results: self.set_results.iter().map(set_result_view).collect(),
            round_history: self.round_history.iter().map(round_result_view).collect(),
            initial_rolls: self
                .initial_rolls
                .iter()
                .map(|r| InitialRollView {
                    player_id: r.player_id,
                    dice: r.dice,
                    sum: r.sum,
                })
                .collect(),
            host_id: self.host_id,
            created_at: self.created_at,
        }
    }

    /// A selection as `viewer` sees it: the owner sees every die, others
    /// see revealed dice plus a count of the hidden ones.
    pub fn selection_view(
        &self,
        owner: PlayerId,
        selection: &PendingSelection,
        viewer: PlayerId,
    ) -> SelectionView {
        let own = owner == viewer;
        let mut visible = Vec::new();
        let mut hidden = 0;
        if let Some(player) = self.player(owner) {
            for die_id in &selection.die_ids {
                match player.die(die_id) {
                    Some(die) if own || die.revealed => {
                        visible.push(die_view(die, true));
                    }
                    Some(_) => hidden += 1,
                    None => {}
                }
            }
        }
        SelectionView {
            player_id: owner,
            confirmed: selection.confirmed,
            visible_dice: visible,
            hidden_count: hidden,
        }
    }
}

fn die_view(die: &Die, value_visible: bool) -> DieView {
    DieView {
        id: die.id.clone(),
        color: die.color,
        value: value_visible.then_some(die.value),
        spent: die.spent,
        revealed: die.revealed,
    }
}

fn player_view(player: &Player, is_self: bool) -> PlayerView {
    PlayerView {
        id: player.id,
        name: player.name.clone(),
        dice: player
            .dice
            .iter()
            .map(|d| die_view(d, is_self || d.revealed))
            .collect(),
        cumulative_score: player.cumulative_score,
        current_round_score: player.current_round_score,
        set1_score: player.set1_score,
        set2_score: player.set2_score,
        prediction: if is_self { player.prediction } else { None },
        has_prediction: player.prediction.is_some(),
        is_connected: player.is_connected,
        is_ready: player.is_ready,
        is_host: player.is_host,
    }
}

pub(crate) fn set_result_view(result: &SetResult) -> SetResultView {
    SetResultView {
        player_id: result.player_id,
        hand: result.hand.clone(),
        die_ids: result.die_ids.clone(),
        dice_values: result.dice_values.clone(),
        placement: result.placement,
        points: result.points,
    }
}

pub(crate) fn round_result_view(result: &RoundResult) -> RoundResultView {
    RoundResultView {
        round: result.round,
        set1_results: result.set1_results.iter().map(set_result_view).collect(),
        set2_results: result.set2_results.iter().map(set_result_view).collect(),
        prediction_outcomes: result
            .prediction_outcomes
            .iter()
            .map(|o| PredictionOutcomeView {
                player_id: o.player_id,
                prediction: o.prediction,
                round_total: o.round_total,
                hit: o.hit,
                bonus: o.bonus,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state_with_players(n: usize) -> (GameState, Vec<PlayerId>) {
        let mut state = GameState::new(
            "ABC234".parse().unwrap(),
            GameConfig::default(),
            1_700_000_000,
        );
        let mut ids = Vec::new();
        for i in 0..n {
            let id = PlayerId::random();
            state
                .players
                .push(Player::new(id, format!("player{i}"), SessionId(i as u64), i == 0));
            ids.push(id);
        }
        state.host_id = Some(ids[0]);
        (state, ids)
    }

    #[test]
    fn test_dice_pool_composition() {
        let mut rng = StdRng::seed_from_u64(1);
        let dice = roll_dice_pool(&mut rng);
        assert_eq!(dice.len(), DICE_PER_PLAYER);
        let whites = dice.iter().filter(|d| d.color == DieColor::White).count();
        let reds = dice.iter().filter(|d| d.color == DieColor::Red).count();
        let blues = dice.iter().filter(|d| d.color == DieColor::Blue).count();
        assert_eq!((whites, reds, blues), (9, 1, 1));
        assert!(dice.iter().all(|d| (1..=6).contains(&d.value)));
        assert!(dice.iter().all(|d| !d.spent));
    }

    #[test]
    fn test_white_dice_start_revealed_colored_hidden() {
        let mut rng = StdRng::seed_from_u64(2);
        let dice = roll_dice_pool(&mut rng);
        for die in &dice {
            match die.color {
                DieColor::White => assert!(die.revealed),
                _ => assert!(!die.revealed, "{:?} should start hidden", die.color),
            }
        }
    }

    #[test]
    fn test_first_unspent_respects_pool_order() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut player = Player::new(PlayerId::random(), "a".into(), SessionId(1), false);
        player.dice = roll_dice_pool(&mut rng);
        player.dice[0].spent = true;
        player.dice[2].spent = true;

        let picked = player.first_unspent(3);
        assert_eq!(
            picked,
            vec![DieId("d2".into()), DieId("d4".into()), DieId("d5".into())]
        );
    }

    #[test]
    fn test_name_taken_is_case_insensitive() {
        let (mut state, _) = state_with_players(1);
        state.players[0].name = "Ada".into();
        assert!(state.name_taken("ada"));
        assert!(state.name_taken("ADA"));
        assert!(!state.name_taken("Bo"));
    }

    #[test]
    fn test_view_masks_opponents_hidden_dice() {
        let (mut state, ids) = state_with_players(2);
        let mut rng = StdRng::seed_from_u64(4);
        for player in &mut state.players {
            player.dice = roll_dice_pool(&mut rng);
        }

        let view = state.view_for(ids[0]);
        let me = view.players.iter().find(|p| p.id == ids[0]).unwrap();
        let other = view.players.iter().find(|p| p.id == ids[1]).unwrap();

        // Own dice fully visible.
        assert!(me.dice.iter().all(|d| d.value.is_some()));
        // Opponent: whites visible, red/blue masked.
        for die in &other.dice {
            match die.color {
                DieColor::White => assert!(die.value.is_some()),
                _ => assert!(die.value.is_none(), "{:?} leaked", die.color),
            }
        }
    }

    #[test]
    fn test_view_reveals_opponent_die_once_revealed() {
        let (mut state, ids) = state_with_players(2);
        let mut rng = StdRng::seed_from_u64(5);
        for player in &mut state.players {
            player.dice = roll_dice_pool(&mut rng);
        }
        // Reveal the opponent's red die (as selection into a hand would).
        state.players[1].dice[9].revealed = true;

        let view = state.view_for(ids[0]);
        let other = view.players.iter().find(|p| p.id == ids[1]).unwrap();
        let red = other.dice.iter().find(|d| d.color == DieColor::Red).unwrap();
        assert!(red.value.is_some());
    }

    #[test]
    fn test_view_hides_opponent_prediction() {
        let (mut state, ids) = state_with_players(2);
        state.players[1].prediction = Some(Prediction::Max);

        let view = state.view_for(ids[0]);
        let other = view.players.iter().find(|p| p.id == ids[1]).unwrap();
        assert_eq!(other.prediction, None);
        assert!(other.has_prediction);

        let own_view = state.view_for(ids[1]);
        let me = own_view.players.iter().find(|p| p.id == ids[1]).unwrap();
        assert_eq!(me.prediction, Some(Prediction::Max));
    }

    #[test]
    fn test_selection_view_hidden_count() {
        let (mut state, ids) = state_with_players(2);
        let mut rng = StdRng::seed_from_u64(6);
        for player in &mut state.players {
            player.dice = roll_dice_pool(&mut rng);
        }
        // Owner selects two whites and the hidden red die.
        let selection = PendingSelection {
            die_ids: vec![
                DieId("d1".into()),
                DieId("d2".into()),
                DieId("d10".into()),
            ],
            confirmed: false,
        };
        state.pending_selections.insert(ids[1], selection.clone());

        let as_opponent = state.selection_view(ids[1], &selection, ids[0]);
        assert_eq!(as_opponent.visible_dice.len(), 2);
        assert_eq!(as_opponent.hidden_count, 1);

        let as_owner = state.selection_view(ids[1], &selection, ids[1]);
        assert_eq!(as_owner.visible_dice.len(), 3);
        assert_eq!(as_owner.hidden_count, 0);
    }

    #[test]
    fn test_final_standings_rank_and_tie() {
        let (mut state, ids) = state_with_players(3);
        state.players[0].cumulative_score = 10.0;
        state.players[1].cumulative_score = 24.0;
        state.players[2].cumulative_score = 10.0;

        let standings = state.final_standings();
        assert_eq!(standings[0].player_id, ids[1]);
        assert_eq!(standings[0].placement, 1);
        assert_eq!(standings[1].placement, 2);
        assert_eq!(standings[2].placement, 2);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let (mut state, ids) = state_with_players(2);
        let mut rng = StdRng::seed_from_u64(7);
        for player in &mut state.players {
            player.dice = roll_dice_pool(&mut rng);
        }
        state.turn_order = ids.clone();
        state.pending_selections.insert(
            ids[0],
            PendingSelection {
                die_ids: vec![DieId("d1".into())],
                confirmed: false,
            },
        );

        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.players.len(), 2);
        assert_eq!(back.turn_order, state.turn_order);
        assert_eq!(back.pending_selections.len(), 1);
    }
}
