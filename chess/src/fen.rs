//! Position ⇄ text encoding.
//!
//! The encoding is FEN-like: 8 rank groups (uppercase = white, digits =
//! empty runs) from rank 8 down to rank 1, the side to move, then the
//! halfmove and fullmove counters. Castling and en-passant fields are not
//! part of this dialect; a full 6-field FEN is still accepted on decode,
//! with those two fields skipped.

use crate::board::Board;
use crate::game::Position;
use crate::square::Square;
use crate::types::{Color, Piece};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FenError {
    #[error("invalid position format")]
    InvalidFormat,
    #[error("invalid board layout: {0}")]
    InvalidBoard(String),
    #[error("invalid side to move: {0}")]
    InvalidSideToMove(String),
    #[error("each color must have exactly one king")]
    BadKingCount,
}

/// Parse a position string. `decode(encode(p)) == p` holds for every
/// position this module emits.
pub fn parse_fen(fen: &str) -> Result<Position, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    let (&board_part, &turn_part) = match (parts.first(), parts.get(1)) {
        (Some(b), Some(t)) => (b, t),
        _ => return Err(FenError::InvalidFormat),
    };

    let board = parse_board(board_part)?;
    if board.king_count(Color::White) != 1 || board.king_count(Color::Black) != 1 {
        return Err(FenError::BadKingCount);
    }

    let side_to_move = match turn_part {
        t if t.len() == 1 => Color::from_char(t.chars().next().unwrap_or('?'))
            .ok_or_else(|| FenError::InvalidSideToMove(t.to_string()))?,
        t => return Err(FenError::InvalidSideToMove(t.to_string())),
    };

    // Counters sit right after the turn in our dialect, or in fields 5 and 6
    // of a standard FEN. Anything unparseable falls back to defaults.
    let (half_idx, full_idx) = if parts.len() >= 6 { (4, 5) } else { (2, 3) };
    let halfmove_clock = parts
        .get(half_idx)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let fullmove_number = parts
        .get(full_idx)
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    Ok(Position::from_parts(
        board,
        side_to_move,
        halfmove_clock,
        fullmove_number,
    ))
}

fn parse_board(text: &str) -> Result<Board, FenError> {
    let ranks: Vec<&str> = text.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::InvalidBoard(text.to_string()));
    }

    let mut board = Board::empty();
    for (i, group) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file: u8 = 0;
        for c in group.chars() {
            if let Some(run) = c.to_digit(10) {
                if run == 0 || run > 8 {
                    return Err(FenError::InvalidBoard(text.to_string()));
                }
                file += run as u8;
            } else {
                let piece =
                    Piece::from_char(c).ok_or_else(|| FenError::InvalidBoard(text.to_string()))?;
                let color = if c.is_ascii_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                if file >= 8 {
                    return Err(FenError::InvalidBoard(text.to_string()));
                }
                board.set(Square::new(file, rank), Some((piece, color)));
                file += 1;
            }
        }
        if file != 8 {
            return Err(FenError::InvalidBoard(text.to_string()));
        }
    }
    Ok(board)
}

/// Encode a position.
pub fn format_fen(position: &Position) -> String {
    let mut out = String::new();
    for rank in (0..8).rev() {
        let mut empty_run = 0;
        for file in 0..8 {
            match position.board().piece_at(Square::new(file, rank)) {
                Some((piece, color)) => {
                    if empty_run > 0 {
                        out.push(char::from_digit(empty_run, 10).unwrap_or('0'));
                        empty_run = 0;
                    }
                    out.push(match color {
                        Color::White => piece.to_char_upper(),
                        Color::Black => piece.to_char_lower(),
                    });
                }
                None => empty_run += 1,
            }
        }
        if empty_run > 0 {
            out.push(char::from_digit(empty_run, 10).unwrap_or('0'));
        }
        if rank > 0 {
            out.push('/');
        }
    }
    out.push(' ');
    out.push(position.side_to_move().to_char());
    out.push_str(&format!(
        " {} {}",
        position.halfmove_clock(),
        position.fullmove_number()
    ));
    out
}
