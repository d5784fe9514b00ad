use crate::advisor::MoveSuggestion;

use super::snapshot::{ChatEntry, RoomSnapshot};

/// Events broadcast from the room actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum RoomEvent {
    /// Full snapshot after any state mutation.
    StateChanged(RoomSnapshot),
    /// A chat message was posted.
    Chat(ChatEntry),
    /// The game reached a terminal state.
    GameEnded {
        winner: Option<String>,
        reason: String,
    },
    /// Advice produced for the AI seat (or its neutral fallback).
    Suggestion(MoveSuggestion),
    /// Non-fatal trouble worth showing to clients.
    Error(String),
}
