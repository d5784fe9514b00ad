//! Position state and the game wrapper that owns move history.

use crate::board::Board;
use crate::fen::FenError;
use crate::moves::{is_attacked, legal_moves, Move};
use crate::notation::NotationError;
use crate::square::Square;
use crate::types::{Color, Piece};

/// Rule toggles. The engine deliberately plays the simplified ruleset the
/// rest of the system was built around: castling is a geometric two-file
/// king jump (no moved-before tracking) and there is no en passant.
/// Disabling `geometric_castling` removes castling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub geometric_castling: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            geometric_castling: true,
        }
    }
}

/// Board contents plus side to move and move counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    board: Board,
    side_to_move: Color,
    halfmove_clock: u32,
    fullmove_number: u32,
    rules: Rules,
}

/// Outcome classification for a position, from the perspective of the side
/// to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
    Draw,
}

impl GameStatus {
    /// Checkmate, stalemate and draw all end the game.
    pub fn is_over(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate | Self::Draw)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MoveError {
    #[error("illegal move")]
    Illegal,
    #[error(transparent)]
    Notation(#[from] NotationError),
}

impl Position {
    /// Standard starting position.
    pub fn initial() -> Self {
        Self::with_rules(Rules::default())
    }

    pub fn with_rules(rules: Rules) -> Self {
        Self {
            board: Board::standard(),
            side_to_move: Color::White,
            halfmove_clock: 0,
            fullmove_number: 1,
            rules,
        }
    }

    pub(crate) fn from_parts(
        board: Board,
        side_to_move: Color,
        halfmove_clock: u32,
        fullmove_number: u32,
    ) -> Self {
        Self {
            board,
            side_to_move,
            halfmove_clock,
            fullmove_number,
            rules: Rules::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    pub fn set_rules(&mut self, rules: Rules) {
        self.rules = rules;
    }

    pub fn in_check(&self, color: Color) -> bool {
        match self.board.king_square(color) {
            Some(king) => is_attacked(&self.board, king, color.opponent()),
            None => false,
        }
    }

    /// Validate `mv` against the legal set for this position and apply it.
    /// Recompute-and-check: the caller is never trusted.
    pub fn apply(&self, mv: &Move) -> Result<Position, MoveError> {
        if !legal_moves(self, Some(mv.from)).contains(mv) {
            return Err(MoveError::Illegal);
        }
        Ok(self.apply_unchecked(mv))
    }

    /// Move mechanics without a legality check. Relocates the piece, clears
    /// any captured piece, relocates the rook on a castling king jump,
    /// substitutes the promotion kind and flips the side to move.
    pub(crate) fn apply_unchecked(&self, mv: &Move) -> Position {
        let mut next = self.clone();
        let Some((piece, color)) = next.board.piece_at(mv.from) else {
            return next;
        };

        let is_capture = next.board.piece_at(mv.to).is_some();
        let placed = match (piece, mv.promotion) {
            (Piece::Pawn, Some(promo)) => promo,
            _ => piece,
        };
        next.board.set(mv.from, None);
        next.board.set(mv.to, Some((placed, color)));

        if piece == Piece::King {
            let dfile = mv.to.file() as i32 - mv.from.file() as i32;
            if dfile.abs() == 2 {
                let rank = mv.from.rank();
                let (rook_from, rook_to) = if dfile > 0 {
                    (Square::new(7, rank), Square::new(5, rank))
                } else {
                    (Square::new(0, rank), Square::new(3, rank))
                };
                if let Some(rook) = next.board.piece_at(rook_from) {
                    next.board.set(rook_from, None);
                    next.board.set(rook_to, Some(rook));
                }
            }
        }

        if piece == Piece::Pawn || is_capture {
            next.halfmove_clock = 0;
        } else {
            next.halfmove_clock += 1;
        }
        if self.side_to_move == Color::Black {
            next.fullmove_number += 1;
        }
        next.side_to_move = self.side_to_move.opponent();
        next
    }

    /// Classify the position for the side to move.
    pub fn status(&self) -> GameStatus {
        let has_moves = !legal_moves(self, None).is_empty();
        let in_check = self.in_check(self.side_to_move);
        if !has_moves {
            return if in_check {
                GameStatus::Checkmate
            } else {
                GameStatus::Stalemate
            };
        }
        if self.insufficient_material() {
            return GameStatus::Draw;
        }
        if in_check {
            GameStatus::Check
        } else {
            GameStatus::Ongoing
        }
    }

    /// Neither side can possibly mate: no pawns, rooks or queens, and at
    /// most one minor piece on the whole board.
    fn insufficient_material(&self) -> bool {
        let mut minors = 0;
        for sq in Square::all() {
            match self.board.piece_at(sq) {
                Some((Piece::Pawn | Piece::Rook | Piece::Queen, _)) => return false,
                Some((Piece::Bishop | Piece::Knight, _)) => minors += 1,
                _ => {}
            }
        }
        minors <= 1
    }
}

/// A recorded ply: immutable once appended, never reordered.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub piece: Piece,
    pub color: Color,
    pub captured: Option<Piece>,
    /// Normalized SAN for the applied move.
    pub san: String,
    /// Position encoding after the move.
    pub fen: String,
}

/// Game state wrapper: current position plus an append-only move history.
#[derive(Debug, Clone)]
pub struct Game {
    position: Position,
    history: Vec<HistoryEntry>,
}

impl Game {
    pub fn new() -> Self {
        Self::with_rules(Rules::default())
    }

    pub fn with_rules(rules: Rules) -> Self {
        Self {
            position: Position::with_rules(rules),
            history: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self {
            position: crate::fen::parse_fen(fen)?,
            history: Vec::new(),
        })
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn status(&self) -> GameStatus {
        self.position.status()
    }

    pub fn legal_moves(&self, from: Option<Square>) -> Vec<Move> {
        legal_moves(&self.position, from)
    }

    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    /// Apply a move, recording its SAN and resulting encoding.
    pub fn make_move(&mut self, mv: Move) -> Result<&HistoryEntry, MoveError> {
        let (piece, color) = self
            .position
            .board()
            .piece_at(mv.from)
            .ok_or(MoveError::Illegal)?;
        let captured = self.position.board().piece_at(mv.to).map(|(p, _)| p);
        let san = crate::notation::format_san(&self.position, &mv);
        self.position = self.position.apply(&mv)?;
        let entry = HistoryEntry {
            mv,
            piece,
            color,
            captured,
            san,
            fen: self.to_fen(),
        };
        self.history.push(entry);
        Ok(self.history.last().expect("just pushed"))
    }

    /// Parse either notation and apply.
    pub fn make_move_text(&mut self, text: &str) -> Result<&HistoryEntry, MoveError> {
        let mv = crate::notation::parse_move(text, &self.position)?;
        self.make_move(mv)
    }

    /// Back to the starting position with the same rules; history cleared.
    pub fn reset(&mut self) {
        let rules = self.position.rules();
        self.position = Position::with_rules(rules);
        self.history.clear();
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    #[test]
    fn apply_rejects_illegal_moves() {
        let position = Position::initial();
        // e2-e5 is not a pawn move.
        let bad = Move::new(sq("e2"), sq("e5"));
        assert!(matches!(position.apply(&bad), Err(MoveError::Illegal)));
        // Moving the opponent's piece is illegal too.
        let bad = Move::new(sq("e7"), sq("e5"));
        assert!(matches!(position.apply(&bad), Err(MoveError::Illegal)));
    }

    #[test]
    fn apply_flips_side_and_relocates() {
        let position = Position::initial();
        let next = position.apply(&Move::new(sq("e2"), sq("e4"))).unwrap();
        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(next.board().piece_at(sq("e2")), None);
        assert_eq!(
            next.board().piece_at(sq("e4")),
            Some((Piece::Pawn, Color::White))
        );
    }

    #[test]
    fn capture_clears_target() {
        let position = parse_fen("7k/8/8/3p4/4P3/8/8/7K w").unwrap();
        let next = position.apply(&Move::new(sq("e4"), sq("d5"))).unwrap();
        assert_eq!(
            next.board().piece_at(sq("d5")),
            Some((Piece::Pawn, Color::White))
        );
        assert_eq!(next.halfmove_clock(), 0);
    }

    #[test]
    fn castling_relocates_rook() {
        let position = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w").unwrap();
        let next = position.apply(&Move::new(sq("e1"), sq("g1"))).unwrap();
        assert_eq!(
            next.board().piece_at(sq("f1")),
            Some((Piece::Rook, Color::White))
        );
        assert_eq!(next.board().piece_at(sq("h1")), None);
        assert_eq!(
            next.board().piece_at(sq("g1")),
            Some((Piece::King, Color::White))
        );
    }

    #[test]
    fn promotion_substitutes_kind() {
        let position = parse_fen("7k/P7/8/8/8/8/8/7K w").unwrap();
        let next = position
            .apply(&Move::promoting(sq("a7"), sq("a8"), Piece::Queen))
            .unwrap();
        assert_eq!(
            next.board().piece_at(sq("a8")),
            Some((Piece::Queen, Color::White))
        );
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut game = Game::new();
        for text in ["f2-f3", "e7-e5", "g2-g4", "d8-h4"] {
            game.make_move_text(text).unwrap();
        }
        assert_eq!(game.status(), GameStatus::Checkmate);
        assert_eq!(game.history().len(), 4);
        assert_eq!(game.history()[3].san, "Qh4#");
    }

    #[test]
    fn stalemate_is_detected() {
        // Black to move, no legal moves, not in check.
        let position = parse_fen("7k/5Q2/6K1/8/8/8/8/8 b").unwrap();
        assert_eq!(position.status(), GameStatus::Stalemate);
    }

    #[test]
    fn bare_kings_are_a_draw() {
        let position = parse_fen("7k/8/8/8/8/8/8/K7 w").unwrap();
        assert_eq!(position.status(), GameStatus::Draw);
        let with_knight = parse_fen("7k/8/8/8/8/8/8/KN6 w").unwrap();
        assert_eq!(with_knight.status(), GameStatus::Draw);
        let with_rook = parse_fen("7k/8/8/8/8/8/8/KR6 w").unwrap();
        assert_ne!(with_rook.status(), GameStatus::Draw);
    }

    #[test]
    fn check_is_reported() {
        let position = parse_fen("4k3/8/8/8/8/8/4R3/4K3 b").unwrap();
        assert_eq!(position.status(), GameStatus::Check);
    }

    #[test]
    fn counters_advance() {
        let mut game = Game::new();
        game.make_move_text("g1-f3").unwrap();
        assert_eq!(game.position().halfmove_clock(), 1);
        game.make_move_text("b8-c6").unwrap();
        assert_eq!(game.position().fullmove_number(), 2);
        game.make_move_text("e2-e4").unwrap();
        assert_eq!(game.position().halfmove_clock(), 0);
    }

    #[test]
    fn reset_restores_initial_position() {
        let mut game = Game::new();
        game.make_move_text("e2-e4").unwrap();
        game.reset();
        assert_eq!(game.history().len(), 0);
        assert_eq!(game.position(), &Position::initial());
    }

    #[test]
    fn no_self_check_survives_generation() {
        // Random-ish walk: always play the first legal move and verify the
        // mover's king is never left attacked.
        let mut game = Game::new();
        for _ in 0..40 {
            let mover = game.side_to_move();
            let Some(mv) = game.legal_moves(None).first().copied() else {
                break;
            };
            game.make_move(mv).unwrap();
            assert!(!game.position().in_check(mover));
        }
    }
}
