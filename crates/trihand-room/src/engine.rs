//! The per-room game state machine.
//!
//! [`apply_event`] is the single entry point: it validates the event
//! against the current phase, mutates the state, then runs the guarded
//! "always" transitions to fixed point before returning. A rejected event
//! returns a named [`RoomError`] and leaves the state untouched.
//!
//! The function is synchronous and effect-free. Dice rolls and
//! auto-predictions draw from the caller-supplied RNG, so a seeded run
//! replays deterministically. The returned [`Effect`]s tell the room
//! actor what to broadcast and which timers to start or stop.

use rand::Rng;

use trihand_protocol::{DieId, GamePhase, PlayerId};
use trihand_scoring::{self as scoring, Prediction};

use crate::state::{GameState, InitialRoll, PendingSelection, PredictionOutcome, RoundResult, SetResult};
use crate::RoomError;

/// Every event a room's game can receive.
///
/// Player-initiated events carry the caller; `TurnTimeout`,
/// `PredictionTimeout`, `NextSet`, and `NextRound` are synthesized by the
/// timer subsystem and the acknowledgement coordinator.
#[derive(Debug, Clone)]
pub enum GameEvent {
    StartGame { player_id: PlayerId },
    SubmitPrediction { player_id: PlayerId, prediction: Prediction },
    SelectDice { player_id: PlayerId, die_ids: Vec<DieId> },
    ConfirmSelection { player_id: PlayerId },
    TurnTimeout,
    PredictionTimeout,
    NextSet,
    NextRound,
}

/// What happened while applying an event, in emission order.
///
/// The actor translates these into broadcasts and timer operations; the
/// state itself already reflects everything they describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    PhaseChanged(GamePhase),
    /// The 2d6 opening rolls resolved and the turn order is computed.
    InitialRolled,
    PredictionSubmitted { player_id: PlayerId, auto: bool },
    /// Every player now has a prediction.
    PredictionsComplete,
    /// A (new) turn-holder's clock should start.
    TurnStarted { player_id: PlayerId },
    DiceSelected { player_id: PlayerId },
    SelectionConfirmed { player_id: PlayerId, auto: bool },
    /// The current set was evaluated; `state.set_results` holds it.
    SetRevealed,
    /// The round summary is computed; `state.round_history` holds it.
    RoundCompleted,
    GameOver,
}

/// Whether the lobby can transition into a running game.
pub fn can_start(state: &GameState) -> bool {
    state.phase == GamePhase::Lobby
        && state.players.len() >= 2
        && state.players.len() <= state.config.max_players as usize
        && state.players.iter().all(|p| p.is_ready)
}

/// Applies one event and runs "always" transitions to fixed point.
pub fn apply_event(
    state: &mut GameState,
    event: GameEvent,
    rng: &mut impl Rng,
) -> Result<Vec<Effect>, RoomError> {
    let mut effects = Vec::new();
    match event {
        GameEvent::StartGame { player_id } => start_game(state, player_id, rng, &mut effects)?,
        GameEvent::SubmitPrediction { player_id, prediction } => {
            submit_prediction(state, player_id, prediction, &mut effects)?
        }
        GameEvent::SelectDice { player_id, die_ids } => {
            select_dice(state, player_id, die_ids, &mut effects)?
        }
        GameEvent::ConfirmSelection { player_id } => {
            confirm_selection(state, player_id, &mut effects)?
        }
        GameEvent::TurnTimeout => turn_timeout(state, &mut effects)?,
        GameEvent::PredictionTimeout => prediction_timeout(state, rng, &mut effects)?,
        GameEvent::NextSet => next_set(state, &mut effects)?,
        GameEvent::NextRound => next_round(state, rng, &mut effects)?,
    }
    run_always(state, rng, &mut effects);
    Ok(effects)
}

// --- Event handlers (validate first, mutate after) -----------------------

fn start_game(
    state: &mut GameState,
    player_id: PlayerId,
    rng: &mut impl Rng,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::Lobby {
        return Err(RoomError::GameInProgress);
    }
    if state.host_id != Some(player_id) {
        return Err(RoomError::NotHost);
    }
    if !can_start(state) {
        return Err(RoomError::CannotStart);
    }

    state.phase = GamePhase::InitialRoll;
    state.current_round = 1;
    state.current_set = 1;
    state.initial_rolls = state
        .players
        .iter()
        .map(|p| {
            let dice = [rng.random_range(1..=6), rng.random_range(1..=6)];
            InitialRoll {
                player_id: p.id,
                dice,
                sum: dice[0] + dice[1],
            }
        })
        .collect();

    effects.push(Effect::PhaseChanged(GamePhase::InitialRoll));
    effects.push(Effect::InitialRolled);
    Ok(())
}

fn submit_prediction(
    state: &mut GameState,
    player_id: PlayerId,
    prediction: Prediction,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::Prediction {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    let player_count = state.players.len();
    if !Prediction::available(player_count).contains(&prediction) {
        return Err(RoomError::InvalidPayload(format!(
            "prediction {prediction:?} not offered for {player_count} players"
        )));
    }
    let player = state
        .player_mut(player_id)
        .ok_or(RoomError::PlayerNotFound)?;
    if player.prediction.is_some() {
        return Err(RoomError::PredictionAlreadySubmitted);
    }

    player.prediction = Some(prediction);
    effects.push(Effect::PredictionSubmitted {
        player_id,
        auto: false,
    });
    Ok(())
}

fn prediction_timeout(
    state: &mut GameState,
    rng: &mut impl Rng,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::Prediction {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    let available = Prediction::available(state.players.len());
    for player in &mut state.players {
        if player.prediction.is_none() {
            let pick = available[rng.random_range(0..available.len())];
            player.prediction = Some(pick);
            effects.push(Effect::PredictionSubmitted {
                player_id: player.id,
                auto: true,
            });
        }
    }
    Ok(())
}

fn select_dice(
    state: &mut GameState,
    player_id: PlayerId,
    die_ids: Vec<DieId>,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::SetSelection {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    let player = state.player(player_id).ok_or(RoomError::PlayerNotFound)?;
    if state.current_turn_holder() != Some(player_id) {
        return Err(RoomError::NotYourTurn);
    }
    if state
        .pending_selections
        .get(&player_id)
        .is_some_and(|s| s.confirmed)
    {
        return Err(RoomError::AlreadyConfirmed);
    }
    if die_ids.len() != scoring::HAND_SIZE {
        return Err(RoomError::InvalidSelection);
    }
    for (i, id) in die_ids.iter().enumerate() {
        if die_ids[..i].contains(id) {
            return Err(RoomError::InvalidSelection);
        }
        let die = player.die(id).ok_or(RoomError::InvalidDie)?;
        if die.spent {
            return Err(RoomError::DieAlreadySpent);
        }
    }

    state.pending_selections.insert(
        player_id,
        PendingSelection {
            die_ids,
            confirmed: false,
        },
    );
    effects.push(Effect::DiceSelected { player_id });
    Ok(())
}

fn confirm_selection(
    state: &mut GameState,
    player_id: PlayerId,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::SetSelection {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    if state.player(player_id).is_none() {
        return Err(RoomError::PlayerNotFound);
    }
    let selection = state
        .pending_selections
        .get_mut(&player_id)
        .ok_or(RoomError::NoSelection)?;
    if selection.confirmed {
        return Err(RoomError::AlreadyConfirmed);
    }

    selection.confirmed = true;
    effects.push(Effect::SelectionConfirmed {
        player_id,
        auto: false,
    });

    // Only the current turn-holder's confirmation moves the pointer;
    // anyone else confirming must not shift whose turn it is.
    if state.current_turn_holder() == Some(player_id) {
        advance_turn(state, effects);
    }
    Ok(())
}

fn turn_timeout(state: &mut GameState, effects: &mut Vec<Effect>) -> Result<(), RoomError> {
    if state.phase != GamePhase::SetSelection {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    let Some(holder) = state.current_turn_holder() else {
        // Everyone already acted; a straggling timeout is a no-op.
        return Ok(());
    };
    let player = state.player(holder).ok_or(RoomError::PlayerNotFound)?;
    let die_ids = player.first_unspent(scoring::HAND_SIZE);
    debug_assert_eq!(die_ids.len(), scoring::HAND_SIZE, "pool never runs dry mid-round");

    state.pending_selections.insert(
        holder,
        PendingSelection {
            die_ids,
            confirmed: true,
        },
    );
    effects.push(Effect::DiceSelected { player_id: holder });
    effects.push(Effect::SelectionConfirmed {
        player_id: holder,
        auto: true,
    });
    advance_turn(state, effects);
    Ok(())
}

fn advance_turn(state: &mut GameState, effects: &mut Vec<Effect>) {
    state.current_turn_index += 1;
    if let Some(next) = state.current_turn_holder() {
        effects.push(Effect::TurnStarted { player_id: next });
    }
}

fn next_set(state: &mut GameState, effects: &mut Vec<Effect>) -> Result<(), RoomError> {
    if state.phase != GamePhase::SetReveal {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    if state.current_set == 1 {
        // Open this round's history entry with the set-1 results; set 2
        // and the prediction outcomes complete it at the summary.
        let set1_results = std::mem::take(&mut state.set_results);
        state.round_history.push(RoundResult {
            round: state.current_round,
            set1_results,
            set2_results: Vec::new(),
            prediction_outcomes: Vec::new(),
        });
        state.current_set = 2;
        state.current_turn_index = 0;
        state.pending_selections.clear();
        state.phase = GamePhase::SetSelection;
        effects.push(Effect::PhaseChanged(GamePhase::SetSelection));
        if let Some(first) = state.current_turn_holder() {
            effects.push(Effect::TurnStarted { player_id: first });
        }
    } else {
        enter_round_summary(state, effects);
    }
    Ok(())
}

fn enter_round_summary(state: &mut GameState, effects: &mut Vec<Effect>) {
    let player_count = state.players.len();

    let outcomes: Vec<PredictionOutcome> = state
        .players
        .iter()
        .filter_map(|p| {
            p.prediction.map(|prediction| {
                let total = p.current_round_score;
                let hit = prediction
                    .range(player_count)
                    .is_some_and(|r| total >= *r.start() as f64 && total <= *r.end() as f64);
                PredictionOutcome {
                    player_id: p.id,
                    prediction,
                    round_total: total,
                    hit,
                    bonus: prediction.bonus(player_count, total),
                }
            })
        })
        .collect();

    for player in &mut state.players {
        let bonus = outcomes
            .iter()
            .find(|o| o.player_id == player.id)
            .map_or(0.0, |o| o.bonus);
        player.cumulative_score += player.current_round_score + bonus;
    }

    let set2_results = std::mem::take(&mut state.set_results);
    match state.round_history.last_mut() {
        Some(entry) if entry.round == state.current_round => {
            entry.set2_results = set2_results;
            entry.prediction_outcomes = outcomes;
        }
        _ => {
            // Set 1 never advanced through NEXT_SET; keep the record whole
            // rather than losing the set.
            state.round_history.push(RoundResult {
                round: state.current_round,
                set1_results: Vec::new(),
                set2_results,
                prediction_outcomes: outcomes,
            });
        }
    }

    state.phase = GamePhase::RoundSummary;
    effects.push(Effect::RoundCompleted);
    effects.push(Effect::PhaseChanged(GamePhase::RoundSummary));
}

fn next_round(
    state: &mut GameState,
    rng: &mut impl Rng,
    effects: &mut Vec<Effect>,
) -> Result<(), RoomError> {
    if state.phase != GamePhase::RoundSummary {
        return Err(RoomError::InvalidPhase(state.phase));
    }
    if state.current_round < state.config.total_rounds {
        state.current_round += 1;
        state.current_set = 1;
        state.current_turn_index = 0;
        state.pending_selections.clear();
        state.set_results.clear();
        for player in &mut state.players {
            player.start_round(rng);
        }
        let scores: Vec<(PlayerId, f64)> = state
            .players
            .iter()
            .map(|p| (p.id, p.cumulative_score))
            .collect();
        state.turn_order = scoring::next_round_turn_order(&scores, &state.initial_turn_order);
        state.phase = GamePhase::Prediction;
        effects.push(Effect::PhaseChanged(GamePhase::Prediction));
    } else {
        state.phase = GamePhase::GameOver;
        effects.push(Effect::GameOver);
        effects.push(Effect::PhaseChanged(GamePhase::GameOver));
    }
    Ok(())
}

/// Re-runs the "always" guards after a membership change.
///
/// A leave can satisfy a guard no event will ever re-check — the departed
/// player may have held the last missing prediction or the last
/// unconfirmed selection.
pub fn resync(state: &mut GameState, rng: &mut impl Rng) -> Vec<Effect> {
    let mut effects = Vec::new();
    run_always(state, rng, &mut effects);
    effects
}

// --- "Always" transitions (run to fixed point) ---------------------------

fn run_always(state: &mut GameState, rng: &mut impl Rng, effects: &mut Vec<Effect>) {
    loop {
        match state.phase {
            GamePhase::InitialRoll
                if state.initial_rolls.len() == state.players.len() =>
            {
                let rolls: Vec<(PlayerId, u8)> = state
                    .initial_rolls
                    .iter()
                    .map(|r| (r.player_id, r.sum))
                    .collect();
                state.turn_order = scoring::initial_turn_order(&rolls);
                state.initial_turn_order = state.turn_order.clone();
                for player in &mut state.players {
                    player.start_round(rng);
                }
                state.phase = GamePhase::Prediction;
                effects.push(Effect::PhaseChanged(GamePhase::Prediction));
            }

            GamePhase::Prediction
                if !state.players.is_empty()
                    && state.players.iter().all(|p| p.prediction.is_some()) =>
            {
                state.pending_selections.clear();
                state.current_turn_index = 0;
                state.phase = GamePhase::SetSelection;
                effects.push(Effect::PredictionsComplete);
                effects.push(Effect::PhaseChanged(GamePhase::SetSelection));
                if let Some(first) = state.current_turn_holder() {
                    effects.push(Effect::TurnStarted { player_id: first });
                }
            }

            GamePhase::SetSelection if all_selections_confirmed(state) => {
                reveal_set(state, effects);
            }

            _ => break,
        }
    }
}

fn all_selections_confirmed(state: &GameState) -> bool {
    !state.players.is_empty()
        && state.players.iter().all(|p| {
            state
                .pending_selections
                .get(&p.id)
                .is_some_and(|s| s.confirmed)
        })
}

fn reveal_set(state: &mut GameState, effects: &mut Vec<Effect>) {
    let mut committed: Vec<(PlayerId, scoring::EvaluatedHand, Vec<DieId>, Vec<u8>)> = Vec::new();
    for player in &state.players {
        let selection = state
            .pending_selections
            .get(&player.id)
            .expect("guard checked every player confirmed");
        let values: Vec<u8> = selection
            .die_ids
            .iter()
            .map(|id| {
                player
                    .die(id)
                    .expect("selection validated against owned dice")
                    .value
            })
            .collect();
        let hand = scoring::evaluate_hand(&values)
            .expect("selection validated to exactly 3 dice");
        committed.push((player.id, hand, selection.die_ids.clone(), values));
    }

    let ranked: Vec<(PlayerId, scoring::EvaluatedHand)> = committed
        .iter()
        .map(|(id, hand, _, _)| (*id, hand.clone()))
        .collect();
    let placements =
        scoring::assign_placements(&ranked).expect("player count bounded by config");

    state.set_results = placements
        .iter()
        .map(|placement| {
            let (_, hand, die_ids, values) = committed
                .iter()
                .find(|(id, ..)| *id == placement.key)
                .expect("placement keys come from committed hands");
            SetResult {
                player_id: placement.key,
                hand: hand.clone(),
                die_ids: die_ids.clone(),
                dice_values: values.clone(),
                placement: placement.placement,
                points: placement.points,
            }
        })
        .collect();

    let results = state.set_results.clone();
    for result in &results {
        let set = state.current_set;
        let player = state
            .player_mut(result.player_id)
            .expect("results only reference room players");
        for die_id in &result.die_ids {
            if let Some(die) = player.dice.iter_mut().find(|d| &d.id == die_id) {
                die.spent = true;
                die.revealed = true;
            }
        }
        if set == 1 {
            player.set1_score += result.points;
        } else {
            player.set2_score += result.points;
        }
        player.current_round_score = player.set1_score + player.set2_score;
    }

    state.phase = GamePhase::SetReveal;
    effects.push(Effect::SetRevealed);
    effects.push(Effect::PhaseChanged(GamePhase::SetReveal));
}
