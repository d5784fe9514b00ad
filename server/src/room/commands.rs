use std::str::FromStr;

use tokio::sync::{broadcast, oneshot};

use super::events::RoomEvent;
use super::snapshot::{ChatEntry, RoomSnapshot};

/// Every player-visible failure. These are expected, recoverable outcomes
/// returned as structured results; a bad command ends the command, never
/// the room actor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("not allowed: {0}")]
    Unauthorized(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("conflicts with current room state: {0}")]
    StateConflict(String),
    #[error("time expired for {0}")]
    Timeout(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// How a user enters the room: on one of the two board seats, or watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRole {
    Player,
    Spectator,
}

impl FromStr for JoinRole {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "spectator" => Ok(Self::Spectator),
            other => Err(RoomError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Result of an accepted move: the normalized SAN plus the state the caller
/// usually wants to render immediately.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub san: String,
    pub fen: String,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
    pub snapshot: RoomSnapshot,
}

/// Commands sent to the room actor. Each embeds a oneshot for the reply;
/// the actor processes one command to completion before the next.
pub(crate) enum RoomCommand {
    Join {
        user_id: String,
        name: String,
        role: JoinRole,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Start {
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Move {
        user_id: String,
        text: String,
        reply: oneshot::Sender<Result<MoveOutcome, RoomError>>,
    },
    Resign {
        user_id: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    OfferDraw {
        user_id: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    AcceptDraw {
        user_id: String,
        offer_id: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    RequestRematch {
        user_id: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    AcceptRematch {
        user_id: String,
        request_id: String,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Leave {
        user_id: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Chat {
        user_id: String,
        text: String,
        reply: oneshot::Sender<Result<ChatEntry, RoomError>>,
    },
    AddAiOpponent {
        level: u8,
        reply: oneshot::Sender<Result<RoomSnapshot, RoomError>>,
    },
    Heartbeat {
        user_id: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    GetSnapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(RoomSnapshot, broadcast::Receiver<RoomEvent>)>,
    },
    Shutdown,
}
