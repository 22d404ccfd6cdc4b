//! State-machine tests for the game engine.
//!
//! These drive `apply_event` directly with a seeded RNG — no actor, no
//! timers — and pin the rules arithmetic down to literal scenarios with
//! known placements and payouts.

use rand::rngs::StdRng;
use rand::SeedableRng;

use trihand_protocol::{DieId, GameConfig, GamePhase, PlayerId, SessionId};
use trihand_room::{apply_event, can_start, Effect, GameEvent, GameState, Player, RoomError};
use trihand_scoring::Prediction;

fn rng() -> StdRng {
    StdRng::seed_from_u64(0xD1CE)
}

fn lobby(player_count: usize, total_rounds: u8) -> (GameState, Vec<PlayerId>) {
    let config = GameConfig {
        total_rounds,
        ..GameConfig::default()
    };
    let mut state = GameState::new("ABC234".parse().unwrap(), config, 1_700_000_000);
    let mut ids = Vec::new();
    for i in 0..player_count {
        let id = PlayerId::random();
        let mut player = Player::new(id, format!("player{i}"), SessionId(i as u64), i == 0);
        player.is_ready = true;
        state.players.push(player);
        ids.push(id);
    }
    state.host_id = Some(ids[0]);
    (state, ids)
}

fn start_game(state: &mut GameState, rng: &mut StdRng) -> Vec<Effect> {
    let host = state.host_id.unwrap();
    apply_event(state, GameEvent::StartGame { player_id: host }, rng).unwrap()
}

fn submit_all_predictions(state: &mut GameState, rng: &mut StdRng) {
    let ids: Vec<PlayerId> = state.players.iter().map(|p| p.id).collect();
    let available = Prediction::available(ids.len());
    for id in ids {
        if state.player(id).unwrap().prediction.is_none() {
            apply_event(
                state,
                GameEvent::SubmitPrediction {
                    player_id: id,
                    prediction: available[available.len() - 1],
                },
                rng,
            )
            .unwrap();
        }
    }
}

/// Every player, in turn order, selects their first three unspent dice and
/// confirms.
fn play_out_set(state: &mut GameState, rng: &mut StdRng) {
    while let Some(holder) = state.current_turn_holder() {
        let die_ids = state.player(holder).unwrap().first_unspent(3);
        apply_event(
            state,
            GameEvent::SelectDice {
                player_id: holder,
                die_ids,
            },
            rng,
        )
        .unwrap();
        apply_event(state, GameEvent::ConfirmSelection { player_id: holder }, rng).unwrap();
    }
}

/// Pins a player's dice at indices `start..start+3` to the given values.
fn force_dice(state: &mut GameState, id: PlayerId, start: usize, values: [u8; 3]) {
    let player = state.player_mut(id).unwrap();
    for (offset, value) in values.into_iter().enumerate() {
        player.dice[start + offset].value = value;
    }
}

fn die_ids(range: std::ops::Range<usize>) -> Vec<DieId> {
    range.map(|i| DieId(format!("d{}", i + 1))).collect()
}

// =========================================================================
// Lobby / start guards
// =========================================================================

#[test]
fn test_start_requires_host() {
    let (mut state, ids) = lobby(3, 3);
    let err = apply_event(
        &mut state,
        GameEvent::StartGame { player_id: ids[1] },
        &mut rng(),
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::NotHost));
    assert_eq!(state.phase, GamePhase::Lobby);
}

#[test]
fn test_start_requires_everyone_ready() {
    let (mut state, _) = lobby(3, 3);
    state.players[2].is_ready = false;
    assert!(!can_start(&state));
    let host = state.host_id.unwrap();
    let err = apply_event(&mut state, GameEvent::StartGame { player_id: host }, &mut rng())
        .unwrap_err();
    assert!(matches!(err, RoomError::CannotStart));
}

#[test]
fn test_start_requires_two_players() {
    let (mut state, _) = lobby(1, 3);
    assert!(!can_start(&state));
}

#[test]
fn test_start_rolls_initials_and_lands_in_prediction() {
    let (mut state, ids) = lobby(4, 3);
    let effects = start_game(&mut state, &mut rng());

    // The INITIAL_ROLL phase resolves to fixed point immediately.
    assert_eq!(state.phase, GamePhase::Prediction);
    assert_eq!(state.current_round, 1);
    assert_eq!(state.initial_rolls.len(), 4);
    assert_eq!(state.turn_order.len(), 4);
    assert_eq!(state.initial_turn_order, state.turn_order);
    for player in &state.players {
        assert_eq!(player.dice.len(), 11);
        assert!(player.prediction.is_none());
    }
    // Order is ascending by roll sum.
    let sums: Vec<u8> = state
        .turn_order
        .iter()
        .map(|id| {
            state
                .initial_rolls
                .iter()
                .find(|r| &r.player_id == id)
                .unwrap()
                .sum
        })
        .collect();
    assert!(sums.windows(2).all(|w| w[0] <= w[1]));

    assert!(effects.contains(&Effect::InitialRolled));
    assert!(effects.contains(&Effect::PhaseChanged(GamePhase::Prediction)));
    assert!(ids.iter().all(|id| state.player(*id).is_some()));
}

#[test]
fn test_start_twice_reports_in_progress() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    let host = state.host_id.unwrap();
    let err =
        apply_event(&mut state, GameEvent::StartGame { player_id: host }, &mut rng).unwrap_err();
    assert!(matches!(err, RoomError::GameInProgress));
}

// =========================================================================
// Predictions
// =========================================================================

#[test]
fn test_all_predictions_advance_to_set_selection() {
    let (mut state, _) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    assert_eq!(state.phase, GamePhase::SetSelection);
    assert_eq!(state.current_turn_index, 0);
    assert!(state.pending_selections.is_empty());
}

#[test]
fn test_duplicate_prediction_rejected_without_mutation() {
    let (mut state, ids) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    apply_event(
        &mut state,
        GameEvent::SubmitPrediction {
            player_id: ids[0],
            prediction: Prediction::Zero,
        },
        &mut rng,
    )
    .unwrap();

    let err = apply_event(
        &mut state,
        GameEvent::SubmitPrediction {
            player_id: ids[0],
            prediction: Prediction::Max,
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::PredictionAlreadySubmitted));
    assert_eq!(
        state.player(ids[0]).unwrap().prediction,
        Some(Prediction::Zero)
    );
    assert_eq!(state.phase, GamePhase::Prediction);
}

#[test]
fn test_min_rejected_for_two_players() {
    let (mut state, ids) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    let err = apply_event(
        &mut state,
        GameEvent::SubmitPrediction {
            player_id: ids[0],
            prediction: Prediction::Min,
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::InvalidPayload(_)));
}

#[test]
fn test_prediction_timeout_fills_every_missing_prediction() {
    let (mut state, ids) = lobby(4, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    apply_event(
        &mut state,
        GameEvent::SubmitPrediction {
            player_id: ids[1],
            prediction: Prediction::More,
        },
        &mut rng,
    )
    .unwrap();

    let effects = apply_event(&mut state, GameEvent::PredictionTimeout, &mut rng).unwrap();

    let available = Prediction::available(4);
    for player in &state.players {
        let prediction = player.prediction.expect("auto-assigned");
        assert!(available.contains(&prediction));
    }
    // The one manual submission kept its value.
    assert_eq!(
        state.player(ids[1]).unwrap().prediction,
        Some(Prediction::More)
    );
    // Auto-fills emitted for the three others, then play advanced.
    let autos = effects
        .iter()
        .filter(|e| matches!(e, Effect::PredictionSubmitted { auto: true, .. }))
        .count();
    assert_eq!(autos, 3);
    assert_eq!(state.phase, GamePhase::SetSelection);
}

// =========================================================================
// Selection rules
// =========================================================================

#[test]
fn test_non_turn_holder_select_rejected() {
    let (mut state, _) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let not_holder = state.turn_order[1];
    let die_ids = state.player(not_holder).unwrap().first_unspent(3);
    let err = apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: not_holder,
            die_ids,
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::NotYourTurn));
    assert!(state.pending_selections.is_empty());
}

#[test]
fn test_select_wrong_count_rejected() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let holder = state.current_turn_holder().unwrap();
    let err = apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: holder,
            die_ids: die_ids(0..2),
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::InvalidSelection));
}

#[test]
fn test_select_duplicate_die_rejected() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let holder = state.current_turn_holder().unwrap();
    let err = apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: holder,
            die_ids: vec![
                DieId("d1".into()),
                DieId("d1".into()),
                DieId("d2".into()),
            ],
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::InvalidSelection));
}

#[test]
fn test_select_unknown_die_rejected() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let holder = state.current_turn_holder().unwrap();
    let err = apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: holder,
            die_ids: vec![
                DieId("d1".into()),
                DieId("d2".into()),
                DieId("d99".into()),
            ],
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::InvalidDie));
}

#[test]
fn test_select_spent_die_rejected_in_set_two() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);
    play_out_set(&mut state, &mut rng);
    apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();
    assert_eq!(state.current_set, 2);

    // d1-d3 were spent in set 1.
    let holder = state.current_turn_holder().unwrap();
    let err = apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: holder,
            die_ids: die_ids(0..3),
        },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::DieAlreadySpent));
}

#[test]
fn test_confirm_without_selection_rejected() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let holder = state.current_turn_holder().unwrap();
    let err = apply_event(
        &mut state,
        GameEvent::ConfirmSelection { player_id: holder },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::NoSelection));
}

#[test]
fn test_double_confirm_rejected_and_pointer_stable() {
    let (mut state, _) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let first = state.current_turn_holder().unwrap();
    let die_ids = state.player(first).unwrap().first_unspent(3);
    apply_event(
        &mut state,
        GameEvent::SelectDice {
            player_id: first,
            die_ids,
        },
        &mut rng,
    )
    .unwrap();
    apply_event(&mut state, GameEvent::ConfirmSelection { player_id: first }, &mut rng).unwrap();
    assert_eq!(state.current_turn_index, 1);

    // An out-of-turn re-confirm must not move the pointer again.
    let err = apply_event(
        &mut state,
        GameEvent::ConfirmSelection { player_id: first },
        &mut rng,
    )
    .unwrap_err();
    assert!(matches!(err, RoomError::AlreadyConfirmed));
    assert_eq!(state.current_turn_index, 1);
}

#[test]
fn test_turn_timeout_auto_selects_first_three_unspent() {
    let (mut state, _) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    let holder = state.current_turn_holder().unwrap();
    let expected = state.player(holder).unwrap().first_unspent(3);
    let index_before = state.current_turn_index;

    let effects = apply_event(&mut state, GameEvent::TurnTimeout, &mut rng).unwrap();

    let selection = state.pending_selections.get(&holder).unwrap();
    assert_eq!(selection.die_ids, expected);
    assert!(selection.confirmed);
    assert_eq!(state.current_turn_index, index_before + 1);
    assert!(effects.contains(&Effect::DiceSelected { player_id: holder }));
    assert!(effects.contains(&Effect::SelectionConfirmed {
        player_id: holder,
        auto: true
    }));
}

// =========================================================================
// Scoring scenarios (literal)
// =========================================================================

/// Plays one set with pinned dice: `hands[i]` goes to `ids[i]`, selected
/// from the pool slice starting at `start`.
fn play_pinned_set(
    state: &mut GameState,
    rng: &mut StdRng,
    ids: &[PlayerId],
    hands: &[[u8; 3]],
    start: usize,
) {
    for (id, values) in ids.iter().zip(hands) {
        force_dice(state, *id, start, *values);
    }
    while let Some(holder) = state.current_turn_holder() {
        apply_event(
            state,
            GameEvent::SelectDice {
                player_id: holder,
                die_ids: die_ids(start..start + 3),
            },
            rng,
        )
        .unwrap();
        apply_event(state, GameEvent::ConfirmSelection { player_id: holder }, rng).unwrap();
    }
}

#[test]
fn test_clean_set_four_players_placement_points() {
    let (mut state, ids) = lobby(4, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    play_pinned_set(
        &mut state,
        &mut rng,
        &ids,
        &[[2, 2, 2], [4, 5, 6], [5, 5, 3], [6, 4, 2]],
        0,
    );

    assert_eq!(state.phase, GamePhase::SetReveal);
    let points_of = |id: PlayerId| {
        state
            .set_results
            .iter()
            .find(|r| r.player_id == id)
            .unwrap()
            .points
    };
    assert_eq!(points_of(ids[0]), 6.0); // Triple 2s
    assert_eq!(points_of(ids[1]), 3.0); // Straight
    assert_eq!(points_of(ids[2]), 1.0); // Pair of 5s
    assert_eq!(points_of(ids[3]), 0.0); // High 6-4-2
    for id in &ids {
        assert_eq!(
            state.player(*id).unwrap().set1_score,
            points_of(*id),
            "set score credited"
        );
    }
}

#[test]
fn test_two_players_tied_triples_split_first() {
    let (mut state, ids) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    play_pinned_set(&mut state, &mut rng, &ids, &[[5, 5, 5], [5, 5, 5]], 0);

    for result in &state.set_results {
        assert_eq!(result.placement, 1);
        assert_eq!(result.points, 3.0); // (6 + 0) / 2
    }
}

#[test]
fn test_three_way_tie_for_second_fractional_points() {
    let (mut state, ids) = lobby(4, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    play_pinned_set(
        &mut state,
        &mut rng,
        &ids,
        &[[6, 6, 6], [3, 4, 5], [3, 4, 5], [3, 4, 5]],
        0,
    );

    let result_of = |id: PlayerId| {
        state
            .set_results
            .iter()
            .find(|r| r.player_id == id)
            .unwrap()
    };
    assert_eq!(result_of(ids[0]).placement, 1);
    assert_eq!(result_of(ids[0]).points, 6.0);
    for id in &ids[1..] {
        let result = result_of(*id);
        assert_eq!(result.placement, 2);
        assert!((result.points - 4.0 / 3.0).abs() < 1e-9);
    }
}

#[test]
fn test_prediction_hit_pays_round_total_on_top() {
    let (mut state, ids) = lobby(4, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    // ids[0] is the bettor on MORE ([6, 9] for 4 players).
    apply_event(
        &mut state,
        GameEvent::SubmitPrediction {
            player_id: ids[0],
            prediction: Prediction::More,
        },
        &mut rng,
    )
    .unwrap();
    for id in &ids[1..] {
        apply_event(
            &mut state,
            GameEvent::SubmitPrediction {
                player_id: *id,
                prediction: Prediction::Zero,
            },
            &mut rng,
        )
        .unwrap();
    }

    // Set 1: bettor wins outright (6 points).
    play_pinned_set(
        &mut state,
        &mut rng,
        &ids,
        &[[6, 6, 6], [2, 3, 4], [5, 5, 1], [6, 4, 2]],
        0,
    );
    apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();

    // Set 2: bettor places third (1 point) — round total 7.
    play_pinned_set(
        &mut state,
        &mut rng,
        &ids,
        &[[3, 3, 2], [5, 5, 5], [2, 3, 4], [6, 4, 2]],
        3,
    );
    apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();

    assert_eq!(state.phase, GamePhase::RoundSummary);
    let bettor = state.player(ids[0]).unwrap();
    assert_eq!(bettor.current_round_score, 7.0);
    // Round total 7 inside [6, 9]: bonus equals the total, so +14 overall.
    assert_eq!(bettor.cumulative_score, 14.0);

    let outcome = state.round_history[0]
        .prediction_outcomes
        .iter()
        .find(|o| o.player_id == ids[0])
        .unwrap();
    assert!(outcome.hit);
    assert_eq!(outcome.bonus, 7.0);
}

#[test]
fn test_round_history_keeps_sets_in_their_own_round() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);

    play_out_set(&mut state, &mut rng);
    let set1_snapshot = state.set_results.clone();
    apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();

    // Round 1's history entry opened with its own set-1 results.
    assert_eq!(state.round_history.len(), 1);
    assert_eq!(state.round_history[0].round, 1);
    assert_eq!(state.round_history[0].set1_results, set1_snapshot);
    assert!(state.round_history[0].set2_results.is_empty());

    play_out_set(&mut state, &mut rng);
    apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();

    assert_eq!(state.round_history.len(), 1);
    assert_eq!(state.round_history[0].set2_results.len(), 2);
    assert!(!state.round_history[0].prediction_outcomes.is_empty());
}

// =========================================================================
// Full-game drive
// =========================================================================

#[test]
fn test_full_game_reaches_game_over_after_total_rounds() {
    let total_rounds = 3;
    let (mut state, _) = lobby(4, total_rounds);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    for round in 1..=total_rounds {
        assert_eq!(state.current_round, round);
        assert_eq!(state.phase, GamePhase::Prediction);
        submit_all_predictions(&mut state, &mut rng);

        for _set in 1..=2 {
            assert_eq!(state.phase, GamePhase::SetSelection);
            play_out_set(&mut state, &mut rng);
            assert_eq!(state.phase, GamePhase::SetReveal);
            apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();
        }

        assert_eq!(state.phase, GamePhase::RoundSummary);
        apply_event(&mut state, GameEvent::NextRound, &mut rng).unwrap();
    }

    assert_eq!(state.phase, GamePhase::GameOver);
    assert_eq!(state.round_history.len(), total_rounds as usize);
}

#[test]
fn test_cumulative_scores_never_decrease() {
    let (mut state, ids) = lobby(3, 4);
    let mut rng = rng();
    start_game(&mut state, &mut rng);

    let mut last: Vec<f64> = vec![0.0; ids.len()];
    for _round in 1..=4 {
        submit_all_predictions(&mut state, &mut rng);
        for _set in 1..=2 {
            play_out_set(&mut state, &mut rng);
            apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();
        }
        for (i, id) in ids.iter().enumerate() {
            let cumulative = state.player(*id).unwrap().cumulative_score;
            assert!(cumulative >= last[i], "score decreased for {id}");
            last[i] = cumulative;
        }
        apply_event(&mut state, GameEvent::NextRound, &mut rng).unwrap();
    }
}

#[test]
fn test_later_round_turn_order_by_score_with_initial_tiebreak() {
    let (mut state, _) = lobby(3, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);
    for _set in 1..=2 {
        play_out_set(&mut state, &mut rng);
        apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();
    }
    apply_event(&mut state, GameEvent::NextRound, &mut rng).unwrap();

    assert_eq!(state.current_round, 2);
    // Leader goes first; ties fall back to the round-1 order.
    let scores: Vec<f64> = state
        .turn_order
        .iter()
        .map(|id| state.player(*id).unwrap().cumulative_score)
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    for window in state.turn_order.windows(2) {
        let (a, b) = (window[0], window[1]);
        let score_a = state.player(a).unwrap().cumulative_score;
        let score_b = state.player(b).unwrap().cumulative_score;
        if score_a == score_b {
            let pos = |id| {
                state
                    .initial_turn_order
                    .iter()
                    .position(|x| *x == id)
                    .unwrap()
            };
            assert!(pos(a) < pos(b), "tie must respect initial order");
        }
    }
}

#[test]
fn test_new_round_deals_fresh_dice_and_clears_predictions() {
    let (mut state, ids) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    submit_all_predictions(&mut state, &mut rng);
    for _set in 1..=2 {
        play_out_set(&mut state, &mut rng);
        apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap();
    }
    apply_event(&mut state, GameEvent::NextRound, &mut rng).unwrap();

    for id in &ids {
        let player = state.player(*id).unwrap();
        assert_eq!(player.dice.len(), 11);
        assert!(player.dice.iter().all(|d| !d.spent), "fresh pool");
        assert!(player.prediction.is_none());
        assert_eq!(player.set1_score, 0.0);
        assert_eq!(player.set2_score, 0.0);
        assert_eq!(player.current_round_score, 0.0);
    }
    assert_eq!(state.current_set, 1);
    assert!(state.pending_selections.is_empty());
}

#[test]
fn test_next_set_outside_reveal_rejected() {
    let (mut state, _) = lobby(2, 3);
    let mut rng = rng();
    start_game(&mut state, &mut rng);
    let err = apply_event(&mut state, GameEvent::NextSet, &mut rng).unwrap_err();
    assert!(matches!(err, RoomError::InvalidPhase(GamePhase::Prediction)));
}
