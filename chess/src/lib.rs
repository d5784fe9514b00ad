pub mod board;
pub mod fen;
pub mod game;
pub mod moves;
pub mod notation;
pub mod square;
pub mod types;

pub use board::Board;
pub use fen::{format_fen, parse_fen, FenError};
pub use game::{Game, GameStatus, HistoryEntry, MoveError, Position, Rules};
pub use moves::{is_attacked, legal_moves, Move};
pub use notation::{format_san, parse_move, NotationError};
pub use square::Square;
pub use types::{Color, Piece};
