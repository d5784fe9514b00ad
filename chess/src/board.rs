//! The 8×8 board: pure data, no rules.

use crate::square::Square;
use crate::types::{Color, Piece};

/// Mapping square → optional (piece, color).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<(Piece, Color)>; 64],
}

impl Board {
    pub fn empty() -> Self {
        Self { cells: [None; 64] }
    }

    /// Standard starting arrangement.
    pub fn standard() -> Self {
        let mut board = Self::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, piece) in back_rank.into_iter().enumerate() {
            let file = file as u8;
            board.set(Square::new(file, 0), Some((piece, Color::White)));
            board.set(Square::new(file, 1), Some((Piece::Pawn, Color::White)));
            board.set(Square::new(file, 6), Some((Piece::Pawn, Color::Black)));
            board.set(Square::new(file, 7), Some((piece, Color::Black)));
        }
        board
    }

    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.cells[sq.index()]
    }

    pub fn set(&mut self, sq: Square, piece: Option<(Piece, Color)>) {
        self.cells[sq.index()] = piece;
    }

    /// Occupied squares of one color.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| match self.piece_at(sq) {
            Some((piece, c)) if c == color => Some((sq, piece)),
            _ => None,
        })
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces_of(color)
            .find(|(_, piece)| *piece == Piece::King)
            .map(|(sq, _)| sq)
    }

    pub fn king_count(&self, color: Color) -> usize {
        self.pieces_of(color)
            .filter(|(_, piece)| *piece == Piece::King)
            .count()
    }
}
