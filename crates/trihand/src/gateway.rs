//! Per-connection gateway: session state, inbound validation, routing.
//!
//! Each WebSocket connection gets one task running [`handle_socket`]. The
//! flow:
//!
//! 1. Allocate a [`SessionId`] and an empty [`Session`].
//! 2. Read loop: decode [`ClientEvent`]s (malformed frames are logged and
//!    dropped), validate payload constraints, route to the registry or
//!    the session's room actor.
//! 3. Rule errors go back to this session only as `room:error`; reconnect
//!    failures as `reconnect:failed`.
//! 4. On socket close the player is marked disconnected in their room —
//!    never removed — pending a token reconnect.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use trihand_protocol::{ClientEvent, PlayerId, RoomCode, ServerEvent, SessionId};
use trihand_room::{JoinOutcome, RoomError};
use trihand_session::{ReconnectToken, Session};
use trihand_store::{reconnect_key, Store, STATE_TTL};

use crate::AppState;

type WsSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Longest display name accepted on create/join.
const MAX_NAME_LEN: usize = 20;

/// Drives one WebSocket connection from upgrade to close.
pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = state.sessions.allocate();
    tracing::debug!(session = %session_id, "connection opened");

    let (sink, mut stream) = socket.split();
    let sink: WsSink = Arc::new(Mutex::new(sink));
    let mut session = Session::new();
    let mut pump: Option<JoinHandle<()>> = None;

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue, // ping/pong/binary
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                // Malformed payloads are sunk, not answered.
                tracing::debug!(session = %session_id, error = %e, "undecodable frame dropped");
                continue;
            }
        };

        if let Err(err) =
            dispatch(&state, session_id, &mut session, &sink, &mut pump, event).await
        {
            send_event(
                &sink,
                &ServerEvent::RoomError {
                    message: err.to_string(),
                    code: err.code().to_string(),
                },
            )
            .await;
        }
    }

    // Soft disconnect: the player stays in the room for the token's
    // lifetime; only the live socket goes away.
    if let (Some(player_id), Some(room_code)) = (session.player_id, session.room_code.clone()) {
        let handle = state.registry.lock().await.get(&room_code).ok();
        if let Some(handle) = handle {
            handle.disconnected(player_id, session_id).await;
        }
    }
    if let Some(pump) = pump {
        pump.abort();
    }
    tracing::debug!(session = %session_id, "connection closed");
}

async fn dispatch(
    state: &Arc<AppState>,
    session_id: SessionId,
    session: &mut Session,
    sink: &WsSink,
    pump: &mut Option<JoinHandle<()>>,
    event: ClientEvent,
) -> Result<(), RoomError> {
    match event {
        ClientEvent::RoomCreate {
            player_name,
            config,
        } => {
            let player_name = validated_name(&player_name)?;
            ensure_not_in_room(session)?;

            let handle = state.registry.lock().await.create_room(config)?;
            let room_code = handle.room_code().clone();

            let (tx, rx) = mpsc::unbounded_channel();
            let outcome = match handle.join(session_id, player_name, tx).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    // The empty room is useless without its creator.
                    state.registry.lock().await.remove(&room_code).await;
                    return Err(err);
                }
            };

            let token = issue_token(state, outcome.player_id, &room_code).await;
            session.attach(outcome.player_id, room_code.clone(), token.clone());

            send_event(
                sink,
                &ServerEvent::RoomCreated {
                    room_code,
                    player_id: outcome.player_id,
                    reconnect_token: token,
                    game_state: outcome.game_state,
                },
            )
            .await;
            replace_pump(pump, start_pump(rx, Arc::clone(sink)));
            Ok(())
        }

        ClientEvent::RoomJoin {
            room_code,
            player_name,
        } => {
            let player_name = validated_name(&player_name)?;
            ensure_not_in_room(session)?;
            let room_code: RoomCode = room_code
                .parse()
                .map_err(|_| RoomError::InvalidPayload("invalid room code".into()))?;

            let handle = state.registry.lock().await.get(&room_code)?;
            let (tx, rx) = mpsc::unbounded_channel();
            let outcome = handle.join(session_id, player_name, tx).await?;

            let token = issue_token(state, outcome.player_id, &room_code).await;
            session.attach(outcome.player_id, room_code.clone(), token.clone());

            send_event(
                sink,
                &ServerEvent::RoomJoined {
                    room_code,
                    player_id: outcome.player_id,
                    reconnect_token: token,
                    game_state: outcome.game_state,
                },
            )
            .await;
            replace_pump(pump, start_pump(rx, Arc::clone(sink)));
            Ok(())
        }

        ClientEvent::RoomLeave => {
            let (player_id, room_code) = bound(session)?;
            state
                .registry
                .lock()
                .await
                .leave(&room_code, player_id)
                .await?;
            if let Some(token) = &session.reconnect_token {
                let _ = state.store.delete(&reconnect_key(token)).await;
            }
            session.detach();
            if let Some(pump) = pump.take() {
                pump.abort();
            }
            Ok(())
        }

        ClientEvent::RoomReconnect { token } => {
            handle_reconnect(state, session_id, session, sink, pump, token).await;
            Ok(())
        }

        ClientEvent::GameReady => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.set_ready(player_id, true).await
        }

        ClientEvent::GameUnready => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.set_ready(player_id, false).await
        }

        ClientEvent::GameUpdateConfig { config } => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.update_config(player_id, config).await
        }

        ClientEvent::GameStart => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.start_game(player_id).await
        }

        ClientEvent::PredictionSubmit { prediction } => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.submit_prediction(player_id, prediction).await
        }

        ClientEvent::DiceSelect { die_ids } => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.select_dice(player_id, die_ids).await
        }

        ClientEvent::DiceConfirm => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.confirm_selection(player_id).await
        }

        ClientEvent::AcknowledgeResults => {
            let (player_id, room_code) = bound(session)?;
            let handle = state.registry.lock().await.get(&room_code)?;
            handle.acknowledge_results(player_id).await
        }
    }
}

/// Token-based reconnect. All failures answer `reconnect:failed` on this
/// socket; nothing here reaches the room until the token checks out.
async fn handle_reconnect(
    state: &Arc<AppState>,
    session_id: SessionId,
    session: &mut Session,
    sink: &WsSink,
    pump: &mut Option<JoinHandle<()>>,
    token: String,
) {
    let token = token.trim().to_string();
    if token.is_empty() {
        reconnect_failed(sink, "missing reconnection token").await;
        return;
    }

    // A degraded store that can't serve the token fails the attempt.
    let stored = match state.store.get(&reconnect_key(&token)).await {
        Ok(Some(json)) => json,
        Ok(None) => {
            reconnect_failed(sink, "unknown or expired reconnection token").await;
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "token lookup failed");
            reconnect_failed(sink, "reconnection unavailable, try again").await;
            return;
        }
    };

    let record: ReconnectToken = match serde_json::from_str(&stored) {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(error = %e, "stored token undecodable");
            reconnect_failed(sink, "unknown or expired reconnection token").await;
            return;
        }
    };
    if record.validate(&token, now_unix()).is_err() {
        reconnect_failed(sink, "unknown or expired reconnection token").await;
        return;
    }

    let handle = match state.registry.lock().await.get(&record.room_code) {
        Ok(handle) => handle,
        Err(_) => {
            reconnect_failed(sink, "room no longer exists").await;
            return;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let outcome: JoinOutcome = match handle.reconnect(record.player_id, session_id, tx).await {
        Ok(outcome) => outcome,
        Err(e) => {
            reconnect_failed(sink, &e.to_string()).await;
            return;
        }
    };

    session.attach(record.player_id, record.room_code.clone(), token);
    send_event(
        sink,
        &ServerEvent::ReconnectSuccess {
            game_state: outcome.game_state,
            player_id: record.player_id,
        },
    )
    .await;
    replace_pump(pump, start_pump(rx, Arc::clone(sink)));
}

// --- Helpers --------------------------------------------------------------

fn validated_name(raw: &str) -> Result<String, RoomError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(RoomError::InvalidPayload(format!(
            "player name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn ensure_not_in_room(session: &Session) -> Result<(), RoomError> {
    if session.in_room() {
        return Err(RoomError::InvalidPayload("already in a room".into()));
    }
    Ok(())
}

/// The session's room binding, or GAME_NOT_FOUND for roomless sessions.
fn bound(session: &Session) -> Result<(PlayerId, RoomCode), RoomError> {
    match (session.player_id, session.room_code.clone()) {
        (Some(player_id), Some(room_code)) => Ok((player_id, room_code)),
        _ => Err(RoomError::GameNotFound),
    }
}

/// Issues and persists a reconnect token; returns the opaque token string.
async fn issue_token(state: &Arc<AppState>, player_id: PlayerId, room_code: &RoomCode) -> String {
    let record = ReconnectToken::issue(player_id, room_code.clone(), now_unix());
    match serde_json::to_string(&record) {
        Ok(json) => {
            if let Err(e) = state
                .store
                .set(&reconnect_key(&record.token), &json, STATE_TTL)
                .await
            {
                tracing::warn!(error = %e, "token write failed");
            }
        }
        Err(e) => tracing::error!(error = %e, "token serialize failed"),
    }
    record.token
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

async fn reconnect_failed(sink: &WsSink, message: &str) {
    send_event(
        sink,
        &ServerEvent::ReconnectFailed {
            message: message.to_string(),
        },
    )
    .await;
}

/// Sends one event directly on the socket (used for replies before or
/// outside the room's broadcast fabric).
async fn send_event(sink: &WsSink, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = sink.lock().await.send(Message::Text(json.into())).await;
    }
}

/// Drains a room's outbound channel into the socket as text frames.
///
/// Started only after the direct join/reconnect reply is on the wire, so
/// the client always sees its own confirmation before any broadcast.
fn start_pump(
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
    sink: WsSink,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(_) => continue,
            };
            if sink.lock().await.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    })
}

fn replace_pump(slot: &mut Option<JoinHandle<()>>, pump: JoinHandle<()>) {
    if let Some(old) = slot.replace(pump) {
        old.abort();
    }
}
