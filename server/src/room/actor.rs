//! The room actor: exclusive owner of one room's state.
//!
//! Commands arrive on an mpsc queue and are processed one at a time to
//! completion, so no two operations ever race on the same room and no
//! command observes a partially-applied prior command. The only
//! long-running collaborator, the advisory AI, is called from a spawned
//! task and its answer re-enters through the same loop.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time;
use tracing::Instrument;

use crate::advisor::parse_suggestion;

use super::commands::{RoomCommand, RoomError};
use super::events::RoomEvent;
use super::snapshot::RoomStatus;
use super::state::{PendingAdvice, RoomState};

pub(crate) async fn run_room_actor(
    state: RoomState,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    event_tx: broadcast::Sender<RoomEvent>,
) {
    let room_id = state.room_id.clone();
    run_room_actor_inner(state, cmd_rx, event_tx)
        .instrument(tracing::info_span!("room", id = %room_id))
        .await;
}

async fn run_room_actor_inner(
    mut state: RoomState,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    event_tx: broadcast::Sender<RoomEvent>,
) {
    tracing::info!(name = %state.name, "room actor started");

    let mut flag_interval = time::interval(state.config.flag_sweep_interval);
    flag_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        // Captured per iteration so the select arm below borrows a local,
        // not the state the advice future holds.
        let expire_deadline = state.expire_at;

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(RoomCommand::Shutdown) | None => {
                        tracing::info!("room actor shutting down");
                        break;
                    }
                    Some(cmd) => {
                        if handle_command(&mut state, cmd, &event_tx) {
                            break;
                        }
                        maybe_request_advice(&mut state);
                    }
                }
            }

            (ply, raw) = state.next_advice() => {
                handle_advice(&mut state, ply, raw, &event_tx);
                maybe_request_advice(&mut state);
            }

            _ = flag_interval.tick(), if state.clock_running() => {
                let prev = state.status;
                if state.check_flag() {
                    broadcast_state(&state, &event_tx);
                    emit_end_if_finished(prev, &state, &event_tx);
                }
            }

            _ = sleep_until_deadline(expire_deadline), if expire_deadline.is_some() => {
                tracing::info!("finished room grace period elapsed, closing");
                break;
            }
        }
    }

    tracing::info!("room actor exited");
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

/// Returns `true` when the room should be torn down.
fn handle_command(
    state: &mut RoomState,
    cmd: RoomCommand,
    event_tx: &broadcast::Sender<RoomEvent>,
) -> bool {
    match cmd {
        RoomCommand::Join {
            user_id,
            name,
            role,
            reply,
        } => {
            let result = state.join(&user_id, &name, role).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::Start { reply } => {
            let result = state.start().map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::Move {
            user_id,
            text,
            reply,
        } => {
            let prev = state.status;
            let result = state.make_move(&user_id, &text);
            match &result {
                Ok(outcome) => {
                    let _ = event_tx.send(RoomEvent::StateChanged(outcome.snapshot.clone()));
                }
                // A flag fall mutates the room even though the command fails.
                Err(RoomError::Timeout(_)) => broadcast_state(state, event_tx),
                Err(_) => {}
            }
            emit_end_if_finished(prev, state, event_tx);
            let _ = reply.send(result);
        }
        RoomCommand::Resign { user_id, reply } => {
            let prev = state.status;
            let result = state.resign(&user_id).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            emit_end_if_finished(prev, state, event_tx);
            let _ = reply.send(result);
        }
        RoomCommand::OfferDraw { user_id, reply } => {
            let result = state.offer_draw(&user_id).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::AcceptDraw {
            user_id,
            offer_id,
            reply,
        } => {
            let prev = state.status;
            let result = state.accept_draw(&user_id, &offer_id).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            emit_end_if_finished(prev, state, event_tx);
            let _ = reply.send(result);
        }
        RoomCommand::RequestRematch { user_id, reply } => {
            let result = state.request_rematch(&user_id).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::AcceptRematch {
            user_id,
            request_id,
            reply,
        } => {
            let result = state.accept_rematch(&user_id, &request_id).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::Leave { user_id, reply } => {
            match state.leave(&user_id) {
                Ok(teardown) => {
                    broadcast_state(state, event_tx);
                    let _ = reply.send(Ok(()));
                    if teardown {
                        tracing::info!("no active human occupant left, closing room");
                        return true;
                    }
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            }
        }
        RoomCommand::Chat {
            user_id,
            text,
            reply,
        } => {
            let result = state.chat(&user_id, &text);
            if let Ok(entry) = &result {
                let _ = event_tx.send(RoomEvent::Chat(entry.clone()));
            }
            let _ = reply.send(result);
        }
        RoomCommand::AddAiOpponent { level, reply } => {
            let result = state.add_ai_opponent(level).map(|_| {
                broadcast_state(state, event_tx);
                state.snapshot()
            });
            let _ = reply.send(result);
        }
        RoomCommand::Heartbeat { user_id, reply } => {
            let _ = reply.send(state.heartbeat(&user_id));
        }
        RoomCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        RoomCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        RoomCommand::Shutdown => unreachable!("handled by the actor loop"),
    }
    false
}

/// Kick off an advisor call when it is the AI seat's turn. Fire-and-forget:
/// the request runs outside the serialization point so it can never stall
/// other players' commands; the answer re-enters as an event.
fn maybe_request_advice(state: &mut RoomState) {
    let Some((ply, level, fen)) = state.ai_move_due() else {
        return;
    };
    let advisor = state.advisor.clone();
    let (tx, rx) = oneshot::channel();
    state.pending_advice = Some(PendingAdvice { ply, rx });
    tokio::spawn(async move {
        let raw = match advisor.suggest(&fen, level).await {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::warn!("advisor unavailable: {e:#}");
                None
            }
        };
        let _ = tx.send(raw);
    });
}

fn handle_advice(
    state: &mut RoomState,
    ply: usize,
    raw: Option<String>,
    event_tx: &broadcast::Sender<RoomEvent>,
) {
    if state.status != RoomStatus::Playing || ply != state.moves.len() {
        tracing::debug!(ply, "discarding stale advice");
        return;
    }
    let Some(ai_id) = state.ai_seat().map(|s| s.id.clone()) else {
        return;
    };

    let suggestion = raw.as_deref().and_then(parse_suggestion);
    if let Some(suggestion) = &suggestion {
        let _ = event_tx.send(RoomEvent::Suggestion(suggestion.clone()));
    }

    let prev = state.status;
    let mut result = match &suggestion {
        Some(suggestion) => state.make_move(&ai_id, &suggestion.best_move),
        None => Err(RoomError::IllegalMove("no usable advice".to_string())),
    };

    // Malformed or illegal advice degrades to the first legal move; the
    // advisor can never break the game.
    if matches!(result, Err(RoomError::IllegalMove(_))) {
        if let Some(mv) = state.game.legal_moves(None).first().copied() {
            let text = coordinate_text(&mv);
            tracing::warn!(fallback = %text, "advice unusable, playing fallback move");
            result = state.make_move(&ai_id, &text);
        }
    }

    match result {
        Ok(outcome) => {
            let _ = event_tx.send(RoomEvent::StateChanged(outcome.snapshot));
        }
        Err(RoomError::Timeout(_)) => broadcast_state(state, event_tx),
        Err(e) => {
            tracing::error!("AI move failed: {e}");
            let _ = event_tx.send(RoomEvent::Error(format!("AI move failed: {e}")));
        }
    }
    emit_end_if_finished(prev, state, event_tx);
}

fn coordinate_text(mv: &chess::Move) -> String {
    match mv.promotion {
        Some(promo) => format!("{}-{}={}", mv.from, mv.to, promo.to_char_upper()),
        None => format!("{}-{}", mv.from, mv.to),
    }
}

fn broadcast_state(state: &RoomState, event_tx: &broadcast::Sender<RoomEvent>) {
    let _ = event_tx.send(RoomEvent::StateChanged(state.snapshot()));
}

fn emit_end_if_finished(
    prev: RoomStatus,
    state: &RoomState,
    event_tx: &broadcast::Sender<RoomEvent>,
) {
    if prev != RoomStatus::Finished && state.status == RoomStatus::Finished {
        let _ = event_tx.send(RoomEvent::GameEnded {
            winner: state.winner.map(|c| c.as_str().to_string()),
            reason: state
                .end_reason
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
        });
    }
}
