//! The externally visible room state.
//!
//! Field names follow the JSON wire format clients consume (camelCase). A snapshot
//! is complete and immutable: it is what `join`/`status`/`move` return and
//! what `StateChanged` events carry.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Checkmate,
    Stalemate,
    Draw,
    Resignation,
    Timeout,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::Draw => "draw",
            Self::Resignation => "resignation",
            Self::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: String,
    pub name: String,
    pub host: String,
    pub rules: String,
    pub allow_spectators: bool,
    pub allow_ai: bool,
    pub status: RoomStatus,
    pub players: Vec<PlayerView>,
    pub spectators: Vec<SpectatorView>,
    pub fen: String,
    pub move_history: Vec<MoveRecord>,
    pub clock: Option<ClockView>,
    pub draw_offers: Vec<DrawOffer>,
    pub rematch_requests: Vec<RematchRequest>,
    pub chat: Vec<ChatEntry>,
    pub winner: Option<String>,
    pub end_reason: Option<EndReason>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectatorView {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// One recorded ply: append-only, never reordered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub san: String,
    pub fen: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub player_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockView {
    /// Remaining whole seconds per side.
    pub white: u64,
    pub black: u64,
    pub active_color: String,
    pub is_running: bool,
    /// Unix milliseconds of the last accounting point.
    pub last_update: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOffer {
    pub id: String,
    pub from: String,
    pub from_name: String,
    pub status: OfferStatus,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub accepted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RematchRequest {
    pub id: String,
    pub from: String,
    pub from_name: String,
    pub status: OfferStatus,
    pub timestamp: u64,
    pub accepted_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: String,
    pub from: String,
    pub from_name: String,
    pub text: String,
    pub timestamp: u64,
}
