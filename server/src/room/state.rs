//! Internal room state, owned entirely by the room actor. No locks: every
//! mutation happens on the actor task, one command at a time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use chess::{Color, Game, GameStatus};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::config::RoomConfig;

use super::commands::{JoinRole, MoveOutcome, RoomError};
use super::snapshot::{
    ChatEntry, ClockView, DrawOffer, EndReason, MoveRecord, OfferStatus, PlayerView,
    RematchRequest, RoomSnapshot, RoomStatus, SpectatorView,
};

/// Seat id used by the AI opponent.
pub(crate) const AI_SEAT_ID: &str = "ai-opponent";

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One of the two board occupants. Seats are soft-deactivated on leave so a
/// reconnecting user gets the same seat and color back; the vector order is
/// join order.
#[derive(Debug, Clone)]
pub(crate) struct Seat {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub role: SeatRole,
    pub is_active: bool,
    pub last_seen: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeatRole {
    Host,
    Player,
    Ai,
}

impl SeatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Player => "player",
            Self::Ai => "ai",
        }
    }

    pub fn is_human(self) -> bool {
        !matches!(self, Self::Ai)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WatcherSeat {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub last_seen: u64,
}

/// Server-owned clock. Wall time is charged lazily at command-processing
/// points; there is no per-room background timer beyond the actor's coarse
/// flag sweep.
#[derive(Debug)]
pub(crate) struct ClockState {
    pub white_secs: u64,
    pub black_secs: u64,
    pub active: Color,
    pub is_running: bool,
    pub last_update: Instant,
    pub last_update_ms: u64,
}

impl ClockState {
    pub fn new(secs: u64) -> Self {
        Self {
            white_secs: secs,
            black_secs: secs,
            active: Color::White,
            is_running: true,
            last_update: Instant::now(),
            last_update_ms: now_ms(),
        }
    }

    /// Charge elapsed wall time to the active side and return its remaining
    /// budget. Accounting is in whole seconds.
    pub fn charge_active(&mut self) -> u64 {
        let elapsed = self.last_update.elapsed().as_secs();
        self.last_update = Instant::now();
        self.last_update_ms = now_ms();
        let bucket = match self.active {
            Color::White => &mut self.white_secs,
            Color::Black => &mut self.black_secs,
        };
        *bucket = bucket.saturating_sub(elapsed);
        *bucket
    }

    pub fn switch_to(&mut self, color: Color) {
        self.active = color;
        self.last_update = Instant::now();
        self.last_update_ms = now_ms();
    }

    pub fn stop(&mut self) {
        self.is_running = false;
    }

    pub fn view(&self) -> ClockView {
        ClockView {
            white: self.white_secs,
            black: self.black_secs,
            active_color: self.active.as_str().to_string(),
            is_running: self.is_running,
            last_update: self.last_update_ms,
        }
    }
}

/// Advice request in flight; `ply` pins the position it was asked about so
/// stale answers are discarded.
pub(crate) struct PendingAdvice {
    pub ply: usize,
    pub rx: oneshot::Receiver<Option<String>>,
}

pub(crate) struct RoomState {
    pub room_id: String,
    pub name: String,
    pub host_id: String,
    pub rules_label: String,
    pub allow_spectators: bool,
    pub allow_ai: bool,
    pub status: RoomStatus,
    pub game: Game,
    pub clock: Option<ClockState>,
    pub players: Vec<Seat>,
    pub spectators: Vec<WatcherSeat>,
    pub draw_offers: Vec<DrawOffer>,
    pub rematch_requests: Vec<RematchRequest>,
    pub chat: VecDeque<ChatEntry>,
    pub moves: Vec<MoveRecord>,
    pub winner: Option<Color>,
    pub end_reason: Option<EndReason>,
    /// Teardown deadline once the game is finished.
    pub expire_at: Option<Instant>,
    pub ai_level: u8,
    pub pending_advice: Option<PendingAdvice>,
    pub advisor: Arc<dyn Advisor>,
    pub config: RoomConfig,
}

impl RoomState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_id: String,
        name: String,
        host_id: String,
        host_name: String,
        rules_label: String,
        allow_spectators: bool,
        allow_ai: bool,
        advisor: Arc<dyn Advisor>,
        config: RoomConfig,
    ) -> Self {
        let host_seat = Seat {
            id: host_id.clone(),
            name: host_name,
            color: Color::White,
            role: SeatRole::Host,
            is_active: true,
            last_seen: now_ms(),
        };
        Self {
            room_id,
            name,
            host_id,
            rules_label,
            allow_spectators,
            allow_ai,
            status: RoomStatus::Waiting,
            game: Game::with_rules(config.rules),
            clock: None,
            players: vec![host_seat],
            spectators: Vec::new(),
            draw_offers: Vec::new(),
            rematch_requests: Vec::new(),
            chat: VecDeque::new(),
            moves: Vec::new(),
            winner: None,
            end_reason: None,
            expire_at: None,
            ai_level: 2,
            pending_advice: None,
            advisor,
            config,
        }
    }

    // ---- rosters ------------------------------------------------------

    pub fn join(&mut self, user_id: &str, name: &str, role: JoinRole) -> Result<(), RoomError> {
        // A known id reactivates its existing record: same seat, same color.
        if let Some(seat) = self.players.iter_mut().find(|p| p.id == user_id) {
            seat.is_active = true;
            seat.last_seen = now_ms();
            return Ok(());
        }
        if let Some(watcher) = self.spectators.iter_mut().find(|s| s.id == user_id) {
            watcher.is_active = true;
            watcher.last_seen = now_ms();
            return Ok(());
        }

        match role {
            JoinRole::Player => {
                if self.status != RoomStatus::Waiting {
                    return Err(RoomError::StateConflict(
                        "game already started".to_string(),
                    ));
                }
                if self.players.len() >= 2 {
                    return Err(RoomError::StateConflict("room is full".to_string()));
                }
                let color = if self.players.is_empty() {
                    Color::White
                } else {
                    Color::Black
                };
                self.players.push(Seat {
                    id: user_id.to_string(),
                    name: name.to_string(),
                    color,
                    role: SeatRole::Player,
                    is_active: true,
                    last_seen: now_ms(),
                });
            }
            JoinRole::Spectator => {
                if !self.allow_spectators {
                    return Err(RoomError::StateConflict(
                        "spectating is disabled in this room".to_string(),
                    ));
                }
                self.spectators.push(WatcherSeat {
                    id: user_id.to_string(),
                    name: name.to_string(),
                    is_active: true,
                    last_seen: now_ms(),
                });
            }
        }
        Ok(())
    }

    pub fn add_ai_opponent(&mut self, level: u8) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::StateConflict(
                "game already started".to_string(),
            ));
        }
        if self.players.iter().any(|p| p.role == SeatRole::Ai) {
            return Err(RoomError::StateConflict(
                "room already has an AI opponent".to_string(),
            ));
        }
        if self.players.len() >= 2 {
            return Err(RoomError::StateConflict("room is full".to_string()));
        }
        let color = match self.players.first() {
            Some(seat) => seat.color.opponent(),
            None => Color::Black,
        };
        self.players.push(Seat {
            id: AI_SEAT_ID.to_string(),
            name: format!("AI level {level}"),
            color,
            role: SeatRole::Ai,
            is_active: true,
            last_seen: now_ms(),
        });
        self.allow_ai = true;
        self.ai_level = level;
        Ok(())
    }

    /// Soft-delete. Returns `true` when the room should be torn down (no
    /// active human occupant remains; AI-only rooms are not kept alive).
    pub fn leave(&mut self, user_id: &str) -> Result<bool, RoomError> {
        let mut known = false;
        if let Some(seat) = self.players.iter_mut().find(|p| p.id == user_id) {
            seat.is_active = false;
            seat.last_seen = now_ms();
            known = true;
        }
        if let Some(watcher) = self.spectators.iter_mut().find(|s| s.id == user_id) {
            watcher.is_active = false;
            watcher.last_seen = now_ms();
            known = true;
        }
        if !known {
            return Err(RoomError::NotFound(format!("occupant {user_id}")));
        }

        if self.active_humans() == 0 {
            return Ok(true);
        }
        // Host handover: earliest-joined active human.
        if self.host_id == user_id {
            if let Some(next) = self
                .players
                .iter()
                .find(|p| p.is_active && p.role.is_human())
            {
                self.host_id = next.id.clone();
                tracing::info!(new_host = %next.id, "host left, role transferred");
            }
        }
        Ok(false)
    }

    pub fn heartbeat(&mut self, user_id: &str) -> Result<(), RoomError> {
        if let Some(seat) = self.players.iter_mut().find(|p| p.id == user_id) {
            seat.is_active = true;
            seat.last_seen = now_ms();
            return Ok(());
        }
        if let Some(watcher) = self.spectators.iter_mut().find(|s| s.id == user_id) {
            watcher.is_active = true;
            watcher.last_seen = now_ms();
            return Ok(());
        }
        Err(RoomError::NotFound(format!("occupant {user_id}")))
    }

    fn active_humans(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.is_active && p.role.is_human())
            .count()
    }

    fn player(&self, user_id: &str) -> Result<&Seat, RoomError> {
        self.players
            .iter()
            .find(|p| p.id == user_id)
            .ok_or_else(|| {
                RoomError::Unauthorized("you are not a player in this room".to_string())
            })
    }

    // ---- game flow ----------------------------------------------------

    pub fn start(&mut self) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::StateConflict(
                "game already started".to_string(),
            ));
        }
        let active = self.players.iter().filter(|p| p.is_active).count();
        if active < 2 || self.active_humans() < 1 {
            return Err(RoomError::StateConflict(
                "need two occupants, at least one of them human".to_string(),
            ));
        }
        self.status = RoomStatus::Playing;
        self.clock = Some(ClockState::new(self.config.initial_clock_secs));
        Ok(())
    }

    pub fn make_move(&mut self, user_id: &str, text: &str) -> Result<MoveOutcome, RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::StateConflict(
                "game is not in progress".to_string(),
            ));
        }
        let seat = self.player(user_id)?;
        let color = seat.color;
        let seat_id = seat.id.clone();
        if color != self.game.side_to_move() {
            return Err(RoomError::StateConflict("not your turn".to_string()));
        }

        // Charge the mover's own budget before the move. A flagged player
        // loses regardless of what they were about to play.
        let flagged = match self.clock.as_mut() {
            Some(clock) if clock.is_running && clock.active == color => {
                clock.charge_active() == 0
            }
            _ => false,
        };
        if flagged {
            self.finish(Some(color.opponent()), EndReason::Timeout);
            return Err(RoomError::Timeout(color.as_str().to_string()));
        }

        let (san, fen) = {
            let entry = self
                .game
                .make_move_text(text)
                .map_err(|e| RoomError::IllegalMove(e.to_string()))?;
            (entry.san.clone(), entry.fen.clone())
        };
        self.moves.push(MoveRecord {
            san: san.clone(),
            fen: fen.clone(),
            timestamp: now_ms(),
            player_id: seat_id,
        });

        if let Some(clock) = self.clock.as_mut() {
            clock.switch_to(color.opponent());
        }

        let status = self.game.status();
        match status {
            GameStatus::Checkmate => self.finish(Some(color), EndReason::Checkmate),
            GameStatus::Stalemate => self.finish(None, EndReason::Stalemate),
            GameStatus::Draw => self.finish(None, EndReason::Draw),
            GameStatus::Ongoing | GameStatus::Check => {}
        }

        Ok(MoveOutcome {
            san,
            fen,
            is_check: matches!(status, GameStatus::Check | GameStatus::Checkmate),
            is_checkmate: status == GameStatus::Checkmate,
            is_draw: matches!(status, GameStatus::Stalemate | GameStatus::Draw),
            snapshot: self.snapshot(),
        })
    }

    pub fn resign(&mut self, user_id: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::StateConflict(
                "game is not in progress".to_string(),
            ));
        }
        let color = self.player(user_id)?.color;
        self.finish(Some(color.opponent()), EndReason::Resignation);
        Ok(())
    }

    pub fn offer_draw(&mut self, user_id: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::StateConflict(
                "game is not in progress".to_string(),
            ));
        }
        let seat = self.player(user_id)?;
        let offer = DrawOffer {
            id: Uuid::new_v4().to_string(),
            from: seat.id.clone(),
            from_name: seat.name.clone(),
            status: OfferStatus::Pending,
            timestamp: now_ms(),
            accepted_by: None,
        };
        self.draw_offers.push(offer);
        Ok(())
    }

    pub fn accept_draw(&mut self, user_id: &str, offer_id: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::Playing {
            return Err(RoomError::StateConflict(
                "game is not in progress".to_string(),
            ));
        }
        self.player(user_id)?;
        let offer = self
            .draw_offers
            .iter_mut()
            .find(|o| o.id == offer_id)
            .ok_or_else(|| RoomError::NotFound(format!("draw offer {offer_id}")))?;
        if offer.from == user_id {
            return Err(RoomError::Unauthorized(
                "cannot accept your own draw offer".to_string(),
            ));
        }
        if offer.status != OfferStatus::Pending {
            return Err(RoomError::StateConflict(
                "draw offer is no longer pending".to_string(),
            ));
        }
        offer.status = OfferStatus::Accepted;
        offer.accepted_by = Some(user_id.to_string());
        self.finish(None, EndReason::Draw);
        Ok(())
    }

    pub fn request_rematch(&mut self, user_id: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::Finished {
            return Err(RoomError::StateConflict(
                "game is not finished".to_string(),
            ));
        }
        let seat = self.player(user_id)?;
        let request = RematchRequest {
            id: Uuid::new_v4().to_string(),
            from: seat.id.clone(),
            from_name: seat.name.clone(),
            status: OfferStatus::Pending,
            timestamp: now_ms(),
            accepted_by: None,
        };
        self.rematch_requests.push(request);
        Ok(())
    }

    pub fn accept_rematch(&mut self, user_id: &str, request_id: &str) -> Result<(), RoomError> {
        if self.status != RoomStatus::Finished {
            return Err(RoomError::StateConflict(
                "game is not finished".to_string(),
            ));
        }
        self.player(user_id)?;
        let request = self
            .rematch_requests
            .iter()
            .find(|r| r.id == request_id)
            .ok_or_else(|| RoomError::NotFound(format!("rematch request {request_id}")))?;
        if request.from == user_id {
            return Err(RoomError::Unauthorized(
                "cannot accept your own rematch request".to_string(),
            ));
        }
        if request.status != OfferStatus::Pending {
            return Err(RoomError::StateConflict(
                "rematch request is no longer pending".to_string(),
            ));
        }

        // Fresh board, everything game-scoped cleared. An explicit start()
        // is required before moves are accepted again.
        self.game.reset();
        self.moves.clear();
        self.clock = None;
        self.draw_offers.clear();
        self.rematch_requests.clear();
        self.winner = None;
        self.end_reason = None;
        self.expire_at = None;
        self.pending_advice = None;
        self.status = RoomStatus::Waiting;
        Ok(())
    }

    pub fn chat(&mut self, user_id: &str, text: &str) -> Result<ChatEntry, RoomError> {
        if text.trim().is_empty() {
            return Err(RoomError::Validation("empty chat message".to_string()));
        }
        let from_name = self
            .players
            .iter()
            .find(|p| p.id == user_id)
            .map(|p| p.name.clone())
            .or_else(|| {
                self.spectators
                    .iter()
                    .find(|s| s.id == user_id)
                    .map(|s| s.name.clone())
            })
            .ok_or_else(|| RoomError::Unauthorized("you are not in this room".to_string()))?;

        let entry = ChatEntry {
            id: Uuid::new_v4().to_string(),
            from: user_id.to_string(),
            from_name,
            text: text.to_string(),
            timestamp: now_ms(),
        };
        self.chat.push_back(entry.clone());
        while self.chat.len() > self.config.chat_capacity {
            self.chat.pop_front();
        }
        Ok(entry)
    }

    fn finish(&mut self, winner: Option<Color>, reason: EndReason) {
        self.status = RoomStatus::Finished;
        self.winner = winner;
        self.end_reason = Some(reason);
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.expire_at = Some(Instant::now() + self.config.finished_grace);
    }

    // ---- clock sweep --------------------------------------------------

    pub fn clock_running(&self) -> bool {
        self.status == RoomStatus::Playing
            && self.clock.as_ref().is_some_and(|c| c.is_running)
    }

    /// Synthetic timeout check, run through the actor's serialization point.
    /// Returns `true` when a flag fell.
    pub fn check_flag(&mut self) -> bool {
        if !self.clock_running() {
            return false;
        }
        let flagged = self.clock.as_mut().and_then(|clock| {
            if clock.charge_active() == 0 {
                Some(clock.active)
            } else {
                None
            }
        });
        if let Some(loser) = flagged {
            tracing::info!(loser = %loser, "flag fell");
            self.finish(Some(loser.opponent()), EndReason::Timeout);
            return true;
        }
        false
    }

    // ---- AI opponent --------------------------------------------------

    pub(crate) fn ai_seat(&self) -> Option<&Seat> {
        self.players.iter().find(|p| p.role == SeatRole::Ai)
    }

    /// When it is the AI seat's turn in a live game and no request is in
    /// flight, returns (ply guard, level, position) for an advisor call.
    pub fn ai_move_due(&self) -> Option<(usize, u8, String)> {
        if self.pending_advice.is_some() || self.status != RoomStatus::Playing {
            return None;
        }
        let seat = self.ai_seat()?;
        if seat.color != self.game.side_to_move() {
            return None;
        }
        Some((self.moves.len(), self.ai_level, self.game.to_fen()))
    }

    /// Await the in-flight advisor reply, or park forever when none is
    /// pending (the actor's select loop relies on this).
    pub async fn next_advice(&mut self) -> (usize, Option<String>) {
        match self.pending_advice.as_mut() {
            Some(pending) => {
                let raw = (&mut pending.rx).await.ok().flatten();
                let ply = pending.ply;
                self.pending_advice = None;
                (ply, raw)
            }
            None => std::future::pending().await,
        }
    }

    // ---- snapshot -----------------------------------------------------

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.room_id.clone(),
            name: self.name.clone(),
            host: self.host_id.clone(),
            rules: self.rules_label.clone(),
            allow_spectators: self.allow_spectators,
            allow_ai: self.allow_ai,
            status: self.status,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    color: p.color.as_str().to_string(),
                    role: p.role.as_str().to_string(),
                    is_active: p.is_active,
                })
                .collect(),
            spectators: self
                .spectators
                .iter()
                .map(|s| SpectatorView {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    is_active: s.is_active,
                })
                .collect(),
            fen: self.game.to_fen(),
            move_history: self.moves.clone(),
            clock: self.clock.as_ref().map(|c| c.view()),
            draw_offers: self.draw_offers.clone(),
            rematch_requests: self.rematch_requests.clone(),
            chat: self.chat.iter().cloned().collect(),
            winner: self.winner.map(|c| c.as_str().to_string()),
            end_reason: self.end_reason,
        }
    }
}
