//! The per-room actor.
//!
//! Each room is one tokio task owning its [`GameState`], timer bank,
//! acknowledgement set, and the outbound channel of every connected
//! player. Commands arrive through an mpsc mailbox and apply strictly in
//! order — the single-writer property every room invariant leans on. All
//! broadcasts for one command are dispatched before the next command is
//! taken, and the state is persisted after every mutation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};

use trihand_protocol::{
    ConfigOverrides, DieId, GamePhase, GameStateView, PlayerId, RoomCode, ServerEvent, SessionId,
};
use trihand_scoring::Prediction;
use trihand_store::{game_key, Store, STATE_TTL};
use trihand_timer::{TimerBank, TimerKind, TimerSignal, PREDICTION_GRACE, RESULTS_ACK_TIMEOUT};

use crate::engine::{self, Effect, GameEvent};
use crate::state::{round_result_view, set_result_view, GameState, Player};
use crate::{AckTracker, RoomError};

/// Mailbox depth per room. Commands beyond this apply backpressure to the
/// gateway rather than queueing unboundedly.
const MAILBOX_SIZE: usize = 64;

/// Outbound channel for one player's connection handler.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Result of a successful join or reconnect.
#[derive(Debug)]
pub struct JoinOutcome {
    pub player_id: PlayerId,
    pub game_state: GameStateView,
}

/// Result of a leave.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub new_host_id: Option<PlayerId>,
    pub room_deleted: bool,
}

/// Commands sent to a room actor through its mailbox.
pub enum RoomCommand {
    Join {
        session: SessionId,
        player_name: String,
        sender: PlayerSender,
        reply: Reply<JoinOutcome>,
    },
    Reconnect {
        player_id: PlayerId,
        session: SessionId,
        sender: PlayerSender,
        reply: Reply<JoinOutcome>,
    },
    Leave {
        player_id: PlayerId,
        reply: Reply<LeaveOutcome>,
    },
    SetReady {
        player_id: PlayerId,
        ready: bool,
        reply: Reply<()>,
    },
    UpdateConfig {
        player_id: PlayerId,
        overrides: ConfigOverrides,
        reply: Reply<()>,
    },
    StartGame {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    SubmitPrediction {
        player_id: PlayerId,
        prediction: Prediction,
        reply: Reply<()>,
    },
    SelectDice {
        player_id: PlayerId,
        die_ids: Vec<DieId>,
        reply: Reply<()>,
    },
    ConfirmSelection {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    AcknowledgeResults {
        player_id: PlayerId,
        reply: Reply<()>,
    },
    /// Socket dropped; the player stays in the room pending reconnect.
    /// Carries the dropping session so a stale socket closing after a
    /// reconnect can't mark the live player disconnected.
    Disconnected {
        player_id: PlayerId,
        session: SessionId,
    },
    /// A countdown signal; dropped if its generation is stale.
    Timer {
        kind: TimerKind,
        signal: TimerSignal,
        generation: u64,
    },
    Shutdown,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_code.clone()))?
    }

    pub async fn join(
        &self,
        session: SessionId,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        self.request(|reply| RoomCommand::Join {
            session,
            player_name,
            sender,
            reply,
        })
        .await
    }

    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        session: SessionId,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        self.request(|reply| RoomCommand::Reconnect {
            player_id,
            session,
            sender,
            reply,
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn set_ready(&self, player_id: PlayerId, ready: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SetReady {
            player_id,
            ready,
            reply,
        })
        .await
    }

    pub async fn update_config(
        &self,
        player_id: PlayerId,
        overrides: ConfigOverrides,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::UpdateConfig {
            player_id,
            overrides,
            reply,
        })
        .await
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await
    }

    pub async fn submit_prediction(
        &self,
        player_id: PlayerId,
        prediction: Prediction,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SubmitPrediction {
            player_id,
            prediction,
            reply,
        })
        .await
    }

    pub async fn select_dice(
        &self,
        player_id: PlayerId,
        die_ids: Vec<DieId>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SelectDice {
            player_id,
            die_ids,
            reply,
        })
        .await
    }

    pub async fn confirm_selection(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ConfirmSelection { player_id, reply })
            .await
    }

    pub async fn acknowledge_results(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::AcknowledgeResults { player_id, reply })
            .await
    }

    pub async fn disconnected(&self, player_id: PlayerId, session: SessionId) {
        let _ = self
            .sender
            .send(RoomCommand::Disconnected { player_id, session })
            .await;
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(RoomCommand::Shutdown).await;
    }
}

/// Spawns a room actor and returns its handle.
///
/// `seed` pins the actor's RNG for deterministic tests; production passes
/// `None` and seeds from OS entropy.
pub fn spawn_room<S: Store>(
    state: GameState,
    store: Arc<S>,
    seed: Option<u64>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(MAILBOX_SIZE);
    let room_code = state.room_code.clone();

    let actor = RoomActor {
        state,
        senders: HashMap::new(),
        acks: AckTracker::new(),
        timers: TimerBank::new(),
        rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
        store,
        receiver: rx,
        self_sender: tx.clone(),
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_code,
        sender: tx,
    }
}

struct RoomActor<S: Store> {
    state: GameState,
    senders: HashMap<PlayerId, PlayerSender>,
    acks: AckTracker,
    timers: TimerBank,
    rng: StdRng,
    store: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,
    self_sender: mpsc::Sender<RoomCommand>,
}

impl<S: Store> RoomActor<S> {
    async fn run(mut self) {
        tracing::info!(room = %self.state.room_code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let stop = match cmd {
                RoomCommand::Join {
                    session,
                    player_name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(session, player_name, sender).await;
                    let _ = reply.send(result);
                    false
                }
                RoomCommand::Reconnect {
                    player_id,
                    session,
                    sender,
                    reply,
                } => {
                    let result = self.handle_reconnect(player_id, session, sender).await;
                    let _ = reply.send(result);
                    false
                }
                RoomCommand::Leave { player_id, reply } => {
                    let result = self.handle_leave(player_id).await;
                    let deleted = matches!(&result, Ok(outcome) if outcome.room_deleted);
                    let _ = reply.send(result);
                    deleted
                }
                RoomCommand::SetReady {
                    player_id,
                    ready,
                    reply,
                } => {
                    let _ = reply.send(self.handle_set_ready(player_id, ready).await);
                    false
                }
                RoomCommand::UpdateConfig {
                    player_id,
                    overrides,
                    reply,
                } => {
                    let _ = reply.send(self.handle_update_config(player_id, overrides).await);
                    false
                }
                RoomCommand::StartGame { player_id, reply } => {
                    let _ = reply.send(
                        self.apply_game_event(GameEvent::StartGame { player_id })
                            .await,
                    );
                    false
                }
                RoomCommand::SubmitPrediction {
                    player_id,
                    prediction,
                    reply,
                } => {
                    let _ = reply.send(
                        self.apply_game_event(GameEvent::SubmitPrediction {
                            player_id,
                            prediction,
                        })
                        .await,
                    );
                    false
                }
                RoomCommand::SelectDice {
                    player_id,
                    die_ids,
                    reply,
                } => {
                    let _ = reply.send(
                        self.apply_game_event(GameEvent::SelectDice { player_id, die_ids })
                            .await,
                    );
                    false
                }
                RoomCommand::ConfirmSelection { player_id, reply } => {
                    let _ = reply.send(
                        self.apply_game_event(GameEvent::ConfirmSelection { player_id })
                            .await,
                    );
                    false
                }
                RoomCommand::AcknowledgeResults { player_id, reply } => {
                    let _ = reply.send(self.handle_acknowledge(player_id).await);
                    false
                }
                RoomCommand::Disconnected { player_id, session } => {
                    self.handle_disconnected(player_id, session).await;
                    false
                }
                RoomCommand::Timer {
                    kind,
                    signal,
                    generation,
                } => {
                    self.handle_timer(kind, signal, generation).await;
                    false
                }
                RoomCommand::Shutdown => true,
            };
            if stop {
                break;
            }
        }

        self.timers.cancel_all();
        tracing::info!(room = %self.state.room_code, "room actor stopped");
    }

    // --- Membership -------------------------------------------------------

    async fn handle_join(
        &mut self,
        session: SessionId,
        player_name: String,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        if self.state.phase != GamePhase::Lobby {
            return Err(RoomError::GameInProgress);
        }
        if self.state.name_taken(&player_name) {
            return Err(RoomError::NameTaken(player_name));
        }
        if self.state.players.len() >= self.state.config.max_players as usize {
            return Err(RoomError::RoomFull(self.state.room_code.clone()));
        }

        let player_id = PlayerId::random();
        let is_host = self.state.players.is_empty();
        self.state
            .players
            .push(Player::new(player_id, player_name.clone(), session, is_host));
        if is_host {
            self.state.host_id = Some(player_id);
        }
        self.senders.insert(player_id, sender);

        tracing::info!(
            room = %self.state.room_code,
            player = %player_id,
            players = self.state.players.len(),
            "player joined"
        );

        self.broadcast_except(
            player_id,
            ServerEvent::PlayerJoined {
                player_id,
                player_name,
            },
        );
        self.broadcast_state_update_except(Some(player_id));
        self.persist().await;

        Ok(JoinOutcome {
            player_id,
            game_state: self.state.view_for(player_id),
        })
    }

    async fn handle_reconnect(
        &mut self,
        player_id: PlayerId,
        session: SessionId,
        sender: PlayerSender,
    ) -> Result<JoinOutcome, RoomError> {
        let player = self
            .state
            .player_mut(player_id)
            .ok_or(RoomError::PlayerNotFound)?;
        player.session = Some(session);
        player.is_connected = true;
        self.senders.insert(player_id, sender);

        tracing::info!(room = %self.state.room_code, player = %player_id, "player reconnected");

        self.broadcast_except(player_id, ServerEvent::PlayerReconnected { player_id });
        self.persist().await;

        Ok(JoinOutcome {
            player_id,
            game_state: self.state.view_for(player_id),
        })
    }

    async fn handle_leave(&mut self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        let position = self
            .state
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(RoomError::PlayerNotFound)?;

        let was_host = self.state.players[position].is_host;
        let holder_before = self.state.current_turn_holder();

        self.state.players.remove(position);
        self.senders.remove(&player_id);
        self.state.pending_selections.remove(&player_id);
        if let Some(order_pos) = self.state.turn_order.iter().position(|id| *id == player_id) {
            self.state.turn_order.remove(order_pos);
            if order_pos < self.state.current_turn_index {
                self.state.current_turn_index -= 1;
            }
        }

        tracing::info!(
            room = %self.state.room_code,
            player = %player_id,
            players = self.state.players.len(),
            "player left"
        );

        if self.state.players.is_empty() {
            self.timers.cancel_all();
            let key = game_key(self.state.room_code.as_str());
            if let Err(e) = self.store.delete(&key).await {
                tracing::warn!(room = %self.state.room_code, error = %e, "state delete failed");
            }
            return Ok(LeaveOutcome {
                new_host_id: None,
                room_deleted: true,
            });
        }

        let mut new_host_id = None;
        if was_host {
            let new_host = self.state.players[0].id;
            for player in &mut self.state.players {
                player.is_host = player.id == new_host;
            }
            self.state.host_id = Some(new_host);
            new_host_id = Some(new_host);
            self.broadcast(ServerEvent::HostChanged { host_id: new_host });
        }

        self.broadcast(ServerEvent::PlayerLeft { player_id });

        // The departure may satisfy a pending guard (last unconfirmed
        // selection gone, last missing prediction gone).
        let effects = engine::resync(&mut self.state, &mut self.rng);
        self.process_effects(&effects);

        // A mid-selection departure can hand the turn to the next player
        // without any engine event; restart the clock for them.
        if self.state.phase == GamePhase::SetSelection {
            let holder_now = self.state.current_turn_holder();
            if holder_now != holder_before {
                if let Some(holder) = holder_now {
                    self.start_turn_timer(holder);
                }
            }
        }

        self.check_ack_completion().await;
        self.broadcast_state_update_except(None);
        self.persist().await;

        Ok(LeaveOutcome {
            new_host_id,
            room_deleted: false,
        })
    }

    async fn handle_disconnected(&mut self, player_id: PlayerId, session: SessionId) {
        let Some(player) = self.state.player_mut(player_id) else {
            return;
        };
        if player.session != Some(session) {
            return; // stale socket closing after a reconnect
        }
        player.is_connected = false;
        player.session = None;
        self.senders.remove(&player_id);

        tracing::info!(room = %self.state.room_code, player = %player_id, "player disconnected");
        self.broadcast(ServerEvent::PlayerDisconnected { player_id });

        // Disconnects cancel nothing, but they shrink the connected set —
        // which can complete an acknowledgement round.
        self.check_ack_completion().await;
        self.persist().await;
    }

    // --- Lobby operations ---------------------------------------------------

    async fn handle_set_ready(
        &mut self,
        player_id: PlayerId,
        ready: bool,
    ) -> Result<(), RoomError> {
        if self.state.phase != GamePhase::Lobby {
            return Err(RoomError::GameInProgress);
        }
        let player = self
            .state
            .player_mut(player_id)
            .ok_or(RoomError::PlayerNotFound)?;
        player.is_ready = ready;

        self.broadcast_state_update_except(None);
        self.persist().await;
        Ok(())
    }

    async fn handle_update_config(
        &mut self,
        player_id: PlayerId,
        overrides: ConfigOverrides,
    ) -> Result<(), RoomError> {
        if self.state.phase != GamePhase::Lobby {
            return Err(RoomError::GameInProgress);
        }
        if self.state.host_id != Some(player_id) {
            return Err(RoomError::NotHost);
        }
        let merged = overrides.apply_to(self.state.config);
        if !merged.is_valid() {
            return Err(RoomError::InvalidPayload(
                "config outside allowed ranges".into(),
            ));
        }
        if (merged.max_players as usize) < self.state.players.len() {
            return Err(RoomError::InvalidPayload(
                "maxPlayers below current player count".into(),
            ));
        }

        self.state.config = merged;
        self.broadcast(ServerEvent::ConfigUpdated { config: merged });
        self.broadcast_state_update_except(None);
        self.persist().await;
        Ok(())
    }

    // --- Game events --------------------------------------------------------

    async fn apply_game_event(&mut self, event: GameEvent) -> Result<(), RoomError> {
        let effects = engine::apply_event(&mut self.state, event, &mut self.rng)?;
        self.process_effects(&effects);
        // Every applied event ends with a phase notification carrying the
        // (per-viewer) state, whether or not the phase moved.
        self.broadcast_each(|viewer| ServerEvent::PhaseChange {
            phase: self.state.phase,
            game_state: self.state.view_for(viewer),
        });
        self.persist().await;
        Ok(())
    }

    fn process_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::PhaseChanged(phase) => self.on_phase_entered(*phase),

                Effect::InitialRolled => {
                    let results = self
                        .state
                        .initial_rolls
                        .iter()
                        .map(|r| trihand_protocol::InitialRollView {
                            player_id: r.player_id,
                            dice: r.dice,
                            sum: r.sum,
                        })
                        .collect();
                    self.broadcast(ServerEvent::InitialRoll {
                        results,
                        turn_order: self.state.turn_order.clone(),
                    });
                }

                Effect::PredictionSubmitted { player_id, .. } => {
                    self.broadcast(ServerEvent::PredictionSubmitted {
                        player_id: *player_id,
                    });
                }

                Effect::PredictionsComplete => {
                    self.broadcast(ServerEvent::PredictionAllSubmitted);
                }

                Effect::TurnStarted { player_id } => {
                    self.start_turn_timer(*player_id);
                }

                Effect::DiceSelected { player_id } => {
                    let owner = *player_id;
                    if let Some(selection) = self.state.pending_selections.get(&owner) {
                        let selection = selection.clone();
                        self.broadcast_each(|viewer| {
                            let view = self.state.selection_view(owner, &selection, viewer);
                            ServerEvent::DiceSelected {
                                player_id: owner,
                                visible_dice: view.visible_dice,
                                hidden_count: view.hidden_count,
                            }
                        });
                    }
                }

                Effect::SelectionConfirmed { player_id, .. } => {
                    self.broadcast(ServerEvent::DiceConfirmed {
                        player_id: *player_id,
                    });
                }

                Effect::SetRevealed => {
                    let results: Vec<_> =
                        self.state.set_results.iter().map(set_result_view).collect();
                    self.broadcast_each(|viewer| ServerEvent::SetReveal {
                        results: results.clone(),
                        game_state: self.state.view_for(viewer),
                    });
                }

                Effect::RoundCompleted => {
                    if let Some(result) = self.state.round_history.last() {
                        let result = round_result_view(result);
                        self.broadcast_each(|viewer| ServerEvent::RoundComplete {
                            result: result.clone(),
                            game_state: self.state.view_for(viewer),
                        });
                    }
                }

                Effect::GameOver => {
                    self.broadcast(ServerEvent::GameOver {
                        final_standings: self.state.final_standings(),
                    });
                }
            }
        }
    }

    /// Timer and ack bookkeeping on phase entry.
    fn on_phase_entered(&mut self, phase: GamePhase) {
        match phase {
            GamePhase::Prediction => {
                self.timers.cancel(TimerKind::Turn);
                self.timers.cancel(TimerKind::ResultsAck);
                self.acks.clear();
                let duration =
                    Duration::from_secs(self.state.config.turn_timer_seconds as u64);
                self.timers.start(
                    TimerKind::Prediction,
                    duration,
                    Some(PREDICTION_GRACE),
                    self.self_sender.clone(),
                    make_timer_command,
                );
            }
            GamePhase::SetSelection => {
                self.timers.cancel(TimerKind::Prediction);
                self.timers.cancel(TimerKind::ResultsAck);
                self.acks.clear();
            }
            GamePhase::SetReveal | GamePhase::RoundSummary => {
                self.timers.cancel(TimerKind::Turn);
                self.timers.cancel(TimerKind::ResultsAck);
                self.acks.clear();
            }
            GamePhase::GameOver => {
                self.timers.cancel_all();
            }
            GamePhase::Lobby | GamePhase::InitialRoll => {}
        }
    }

    fn start_turn_timer(&mut self, holder: PlayerId) {
        let seconds = self.state.config.turn_timer_seconds as u32;
        self.timers.start(
            TimerKind::Turn,
            Duration::from_secs(seconds as u64),
            None,
            self.self_sender.clone(),
            make_timer_command,
        );
        self.broadcast(ServerEvent::TurnStart {
            player_id: holder,
            time_remaining: seconds,
        });
    }

    async fn handle_timer(&mut self, kind: TimerKind, signal: TimerSignal, generation: u64) {
        if !self.timers.is_current(kind, generation) {
            // Fired-but-cancelled; the generation bump makes it a no-op.
            return;
        }
        match signal {
            TimerSignal::Tick { seconds_remaining } => {
                if matches!(kind, TimerKind::Turn | TimerKind::Prediction) {
                    self.broadcast(ServerEvent::TimerTick {
                        time_remaining: seconds_remaining,
                    });
                }
            }
            TimerSignal::GraceStarted => {
                if kind == TimerKind::Prediction {
                    self.broadcast(ServerEvent::PredictionAutoSubmitting {
                        countdown: PREDICTION_GRACE.as_secs() as u32,
                    });
                }
            }
            TimerSignal::Expired => {
                self.timers.finish(kind);
                let result = match kind {
                    TimerKind::Turn => self.apply_game_event(GameEvent::TurnTimeout).await,
                    TimerKind::Prediction => {
                        self.apply_game_event(GameEvent::PredictionTimeout).await
                    }
                    TimerKind::ResultsAck => self.force_advance().await,
                };
                if let Err(e) = result {
                    tracing::debug!(
                        room = %self.state.room_code,
                        ?kind,
                        error = %e,
                        "timer expiry had no effect"
                    );
                }
            }
        }
    }

    // --- Acknowledgements -----------------------------------------------------

    async fn handle_acknowledge(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !matches!(
            self.state.phase,
            GamePhase::SetReveal | GamePhase::RoundSummary
        ) {
            return Err(RoomError::InvalidPhase(self.state.phase));
        }
        if self.state.player(player_id).is_none() {
            return Err(RoomError::PlayerNotFound);
        }
        if !self.acks.insert(player_id) {
            return Ok(()); // at most one ack per player; repeats are no-ops
        }

        if self.acks.count() == 1 {
            self.timers.start(
                TimerKind::ResultsAck,
                RESULTS_ACK_TIMEOUT,
                None,
                self.self_sender.clone(),
                make_timer_command,
            );
        }

        let connected = self.state.connected_player_ids();
        let acknowledged_count = connected
            .iter()
            .filter(|id| self.acks.contains(**id))
            .count();
        self.broadcast(ServerEvent::ResultsAcknowledged {
            player_id,
            acknowledged_count,
            total_count: connected.len(),
        });
        self.broadcast(ServerEvent::ResultsWaitingFor {
            waiting_for_player_ids: self.acks.waiting_for(&connected),
        });

        if self.acks.is_complete(&connected) {
            self.timers.cancel(TimerKind::ResultsAck);
            self.force_advance().await?;
        }
        Ok(())
    }

    /// Re-checks ack completion after the connected set shrank.
    async fn check_ack_completion(&mut self) {
        if !matches!(
            self.state.phase,
            GamePhase::SetReveal | GamePhase::RoundSummary
        ) {
            return;
        }
        if self.acks.is_empty() {
            return; // nobody acked yet; the room idles until someone does
        }
        let connected = self.state.connected_player_ids();
        if self.acks.is_complete(&connected) {
            self.timers.cancel(TimerKind::ResultsAck);
            if let Err(e) = self.force_advance().await {
                tracing::debug!(room = %self.state.room_code, error = %e, "forced advance failed");
            }
        }
    }

    /// Drives the engine past the results on display.
    async fn force_advance(&mut self) -> Result<(), RoomError> {
        let event = match self.state.phase {
            GamePhase::SetReveal => GameEvent::NextSet,
            GamePhase::RoundSummary => GameEvent::NextRound,
            phase => return Err(RoomError::InvalidPhase(phase)),
        };
        self.apply_game_event(event).await
    }

    // --- Broadcast fabric -------------------------------------------------

    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn broadcast_except(&self, excluded: PlayerId, event: ServerEvent) {
        for (player_id, sender) in &self.senders {
            if *player_id != excluded {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Per-viewer broadcast: builds each recipient their own payload.
    fn broadcast_each(&self, build: impl Fn(PlayerId) -> ServerEvent) {
        for player_id in self.senders.keys() {
            self.send_to(*player_id, build(*player_id));
        }
    }

    fn broadcast_state_update_except(&self, excluded: Option<PlayerId>) {
        for player_id in self.senders.keys() {
            if Some(*player_id) == excluded {
                continue;
            }
            self.send_to(
                *player_id,
                ServerEvent::StateUpdate {
                    game_state: self.state.view_for(*player_id),
                },
            );
        }
    }

    // --- Persistence --------------------------------------------------------

    async fn persist(&self) {
        let key = game_key(self.state.room_code.as_str());
        match serde_json::to_string(&self.state) {
            Ok(json) => {
                if let Err(e) = self.store.set(&key, &json, STATE_TTL).await {
                    tracing::warn!(room = %self.state.room_code, error = %e, "state write failed");
                }
            }
            Err(e) => {
                tracing::error!(room = %self.state.room_code, error = %e, "state serialize failed");
            }
        }
    }
}

fn make_timer_command(kind: TimerKind, signal: TimerSignal, generation: u64) -> RoomCommand {
    RoomCommand::Timer {
        kind,
        signal,
        generation,
    }
}
