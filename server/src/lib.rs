//! ChessRoom server core: one actor per room, a manager that maps room ids
//! to live actors, and the advisory-AI collaborator interface.
//!
//! Transport (HTTP routing, connection upgrade) and account storage are
//! external collaborators; this crate is the authoritative game state.

pub mod advisor;
pub mod config;
pub mod room;

pub use advisor::{parse_suggestion, Advisor, MoveSuggestion, NullAdvisor, StaticAdvisor};
pub use config::RoomConfig;
pub use room::{
    CreateRoomRequest, JoinRole, MoveOutcome, RoomError, RoomEvent, RoomHandle, RoomManager,
    RoomSnapshot,
};
