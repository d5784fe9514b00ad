//! Move generation and attack detection.
//!
//! Generation is two-phase: pseudo-legal moves per piece movement rules,
//! then a legality filter that simulates each move and rejects any that
//! leaves the mover's own king attacked. Callers must not rely on the
//! ordering of the returned moves.

use crate::board::Board;
use crate::game::Position;
use crate::square::Square;
use crate::types::{Color, Piece};

/// A move candidate. Immutable value type; promotion is the piece the pawn
/// becomes on the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn promoting(from: Square, to: Square, promotion: Piece) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const ROOK_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Legal moves for the side to move, optionally restricted to one origin
/// square. A square holding no piece of the side to move yields nothing.
pub fn legal_moves(position: &Position, from: Option<Square>) -> Vec<Move> {
    let side = position.side_to_move();
    let mut moves = Vec::new();
    match from {
        Some(sq) => match position.board().piece_at(sq) {
            Some((piece, color)) if color == side => {
                pseudo_legal_from(position, sq, piece, &mut moves)
            }
            _ => {}
        },
        None => {
            for (sq, piece) in position.board().pieces_of(side) {
                pseudo_legal_from(position, sq, piece, &mut moves);
            }
        }
    }

    moves.retain(|mv| !leaves_king_attacked(position, mv));
    moves
}

/// Whether `target` is attacked by any piece of `by`.
pub fn is_attacked(board: &Board, target: Square, by: Color) -> bool {
    board
        .pieces_of(by)
        .any(|(sq, piece)| attacks(board, sq, target, piece, by))
}

fn leaves_king_attacked(position: &Position, mv: &Move) -> bool {
    let side = position.side_to_move();
    let after = position.apply_unchecked(mv);
    match after.board().king_square(side) {
        Some(king) => is_attacked(after.board(), king, side.opponent()),
        // No king on the board: nothing to expose.
        None => false,
    }
}

fn pseudo_legal_from(position: &Position, from: Square, piece: Piece, out: &mut Vec<Move>) {
    let board = position.board();
    let side = position.side_to_move();
    match piece {
        Piece::Pawn => pawn_moves(board, from, side, out),
        Piece::Knight => step_moves(board, from, side, &KNIGHT_JUMPS, out),
        Piece::Bishop => slide_moves(board, from, side, &BISHOP_DIRS, out),
        Piece::Rook => slide_moves(board, from, side, &ROOK_DIRS, out),
        Piece::Queen => {
            slide_moves(board, from, side, &ROOK_DIRS, out);
            slide_moves(board, from, side, &BISHOP_DIRS, out);
        }
        Piece::King => {
            step_moves(board, from, side, &KING_STEPS, out);
            if position.rules().geometric_castling {
                castling_moves(board, from, side, out);
            }
        }
    }
}

fn pawn_moves(board: &Board, from: Square, side: Color, out: &mut Vec<Move>) {
    let dir: i32 = match side {
        Color::White => 1,
        Color::Black => -1,
    };
    let start_rank: u8 = match side {
        Color::White => 1,
        Color::Black => 6,
    };

    if let Some(one) = from.offset(0, dir) {
        if board.piece_at(one).is_none() {
            push_pawn_move(from, one, out);
            if from.rank() == start_rank {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if board.piece_at(two).is_none() {
                        out.push(Move::new(from, two));
                    }
                }
            }
        }
    }

    for dfile in [-1, 1] {
        if let Some(to) = from.offset(dfile, dir) {
            if matches!(board.piece_at(to), Some((_, c)) if c != side) {
                push_pawn_move(from, to, out);
            }
        }
    }
}

/// Expand last-rank arrivals into one candidate per promotion kind.
fn push_pawn_move(from: Square, to: Square, out: &mut Vec<Move>) {
    if to.rank() == 0 || to.rank() == 7 {
        for promo in [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight] {
            out.push(Move::promoting(from, to, promo));
        }
    } else {
        out.push(Move::new(from, to));
    }
}

fn step_moves(
    board: &Board,
    from: Square,
    side: Color,
    deltas: &[(i32, i32)],
    out: &mut Vec<Move>,
) {
    for &(dfile, drank) in deltas {
        if let Some(to) = from.offset(dfile, drank) {
            match board.piece_at(to) {
                Some((_, c)) if c == side => {}
                _ => out.push(Move::new(from, to)),
            }
        }
    }
}

fn slide_moves(
    board: &Board,
    from: Square,
    side: Color,
    dirs: &[(i32, i32)],
    out: &mut Vec<Move>,
) {
    for &(dfile, drank) in dirs {
        let mut current = from;
        while let Some(to) = current.offset(dfile, drank) {
            match board.piece_at(to) {
                None => out.push(Move::new(from, to)),
                Some((_, c)) => {
                    if c != side {
                        out.push(Move::new(from, to));
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

/// Castling as a geometric two-file king jump: the king must stand on its
/// home square with its rook on the corner and the squares between them
/// empty. Whether the king or rook has moved before is not tracked.
fn castling_moves(board: &Board, from: Square, side: Color, out: &mut Vec<Move>) {
    let home_rank: u8 = match side {
        Color::White => 0,
        Color::Black => 7,
    };
    if from != Square::new(4, home_rank) {
        return;
    }
    // (king target file, rook file, files that must be empty)
    let wings: [(u8, u8, &[u8]); 2] = [(6, 7, &[5, 6]), (2, 0, &[1, 2, 3])];
    for (king_to, rook_file, between) in wings {
        let rook_sq = Square::new(rook_file, home_rank);
        if board.piece_at(rook_sq) != Some((Piece::Rook, side)) {
            continue;
        }
        if between
            .iter()
            .all(|&f| board.piece_at(Square::new(f, home_rank)).is_none())
        {
            out.push(Move::new(from, Square::new(king_to, home_rank)));
        }
    }
}

/// Movement-rule reachability for attack purposes. Differs from move
/// generation only for pawns, which attack diagonally regardless of what
/// occupies the target square.
fn attacks(board: &Board, from: Square, target: Square, piece: Piece, color: Color) -> bool {
    let dfile = target.file() as i32 - from.file() as i32;
    let drank = target.rank() as i32 - from.rank() as i32;
    match piece {
        Piece::Pawn => {
            let dir: i32 = match color {
                Color::White => 1,
                Color::Black => -1,
            };
            dfile.abs() == 1 && drank == dir
        }
        Piece::Knight => {
            (dfile.abs() == 2 && drank.abs() == 1) || (dfile.abs() == 1 && drank.abs() == 2)
        }
        Piece::Bishop => dfile.abs() == drank.abs() && dfile != 0 && path_clear(board, from, target),
        Piece::Rook => {
            (dfile == 0) != (drank == 0) && path_clear(board, from, target)
        }
        Piece::Queen => {
            let aligned = dfile == 0 || drank == 0 || dfile.abs() == drank.abs();
            aligned && (dfile != 0 || drank != 0) && path_clear(board, from, target)
        }
        Piece::King => dfile.abs() <= 1 && drank.abs() <= 1 && (dfile != 0 || drank != 0),
    }
}

/// True when every square strictly between `from` and `to` is empty.
/// `from`/`to` must share a rank, file or diagonal.
fn path_clear(board: &Board, from: Square, to: Square) -> bool {
    let dfile = (to.file() as i32 - from.file() as i32).signum();
    let drank = (to.rank() as i32 - from.rank() as i32).signum();
    let mut current = from;
    loop {
        current = match current.offset(dfile, drank) {
            Some(sq) => sq,
            None => return false,
        };
        if current == to {
            return true;
        }
        if board.piece_at(current).is_some() {
            return false;
        }
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
    fn initial_position_has_twenty_moves() {
        let position = Position::initial();
        assert_eq!(legal_moves(&position, None).len(), 20);
    }

    #[test]
    fn knight_moves_from_corner() {
        let position = parse_fen("N6k/8/8/8/8/8/8/7K w").unwrap();
        let moves = legal_moves(&position, Some(sq("a8")));
        let targets: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        assert_eq!(moves.len(), 2);
        assert!(targets.contains(&"b6".to_string()));
        assert!(targets.contains(&"c7".to_string()));
    }

    #[test]
    fn sliding_pieces_are_blocked() {
        // Rook on a1 blocked by its own pawn on a2 and an enemy pawn on c1.
        let position = parse_fen("7k/8/8/8/8/8/P7/R1p4K w").unwrap();
        let moves = legal_moves(&position, Some(sq("a1")));
        let targets: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        assert_eq!(targets, vec!["b1".to_string(), "c1".to_string()]);
    }

    #[test]
    fn pawn_double_push_only_from_start() {
        let position = Position::initial();
        let moves = legal_moves(&position, Some(sq("e2")));
        assert_eq!(moves.len(), 2);

        let advanced = parse_fen("rnbqkbnr/pppppppp/8/8/8/4P3/PPPP1PPP/RNBQKBNR b").unwrap();
        let black_pawn = legal_moves(&advanced, Some(sq("e7")));
        assert_eq!(black_pawn.len(), 2);
    }

    #[test]
    fn pawn_capture_is_diagonal_only() {
        let position = parse_fen("7k/8/8/3p4/4P3/8/8/7K w").unwrap();
        let moves = legal_moves(&position, Some(sq("e4")));
        let targets: Vec<String> = moves.iter().map(|m| m.to.to_string()).collect();
        assert!(targets.contains(&"d5".to_string()));
        assert!(targets.contains(&"e5".to_string()));
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn promotion_expands_to_four_kinds() {
        let position = parse_fen("7k/P7/8/8/8/8/8/7K w").unwrap();
        let moves = legal_moves(&position, Some(sq("a7")));
        assert_eq!(moves.len(), 4);
        assert!(moves.iter().all(|m| m.promotion.is_some()));
    }

    #[test]
    fn pinned_piece_cannot_move() {
        // White knight on e2 is pinned against the king by the rook on e8.
        let position = parse_fen("4r2k/8/8/8/8/8/4N3/4K3 w").unwrap();
        let moves = legal_moves(&position, Some(sq("e2")));
        assert!(moves.is_empty());
    }

    #[test]
    fn king_cannot_step_into_attack() {
        let position = parse_fen("7k/8/8/8/8/8/r7/4K3 w").unwrap();
        let moves = legal_moves(&position, Some(sq("e1")));
        assert!(moves.iter().all(|m| m.to.rank() != 1));
    }

    #[test]
    fn castling_requires_clear_path_and_rook() {
        let open = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w").unwrap();
        let king_moves = legal_moves(&open, Some(sq("e1")));
        let targets: Vec<String> = king_moves.iter().map(|m| m.to.to_string()).collect();
        assert!(targets.contains(&"g1".to_string()));
        assert!(targets.contains(&"c1".to_string()));

        let blocked = Position::initial();
        let king_moves = legal_moves(&blocked, Some(sq("e1")));
        assert!(king_moves.is_empty());
    }

    #[test]
    fn attack_detection_basics() {
        let position = parse_fen("7k/8/8/8/8/2n5/8/4K3 w").unwrap();
        let board = position.board();
        // Knight on c3 attacks e2 and d1 but not e1.
        assert!(is_attacked(board, sq("e2"), Color::Black));
        assert!(is_attacked(board, sq("d1"), Color::Black));
        assert!(!is_attacked(board, sq("e1"), Color::Black));
    }

    #[test]
    fn pawn_attacks_ignore_occupancy() {
        let position = parse_fen("7k/8/8/8/8/8/4P3/4K3 w").unwrap();
        let board = position.board();
        assert!(is_attacked(board, sq("d3"), Color::White));
        assert!(is_attacked(board, sq("f3"), Color::White));
        assert!(!is_attacked(board, sq("e3"), Color::White));
    }
}
