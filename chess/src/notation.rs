//! Move text parsing and SAN formatting.
//!
//! Two notations are accepted:
//!
//! * coordinate form, the canonical wire format:
//!   `<from>[-|x]<to>[=<promo>][+|#]` (`e2-e4`, `e4xd5`, `d7-d8=Q`);
//! * short algebraic form, best-effort:
//!   `[KQRBN]?<file>?<rank>?[x]?<to>[=<promo>][+|#]` (`e4`, `exd5`, `Nf6`,
//!   `Qxh4+`).
//!
//! Algebraic disambiguation applies any file/rank hint in the text first.
//! If several origins remain, the candidate closest to the target wins
//! (knights by file+rank delta, other pieces by Euclidean distance). That
//! tie-break is a convenience heuristic, not official SAN disambiguation,
//! and can pick a different piece than a strict reading would.

use crate::game::Position;
use crate::moves::{legal_moves, Move};
use crate::square::Square;
use crate::types::Piece;

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotationError {
    #[error("invalid square: {0}")]
    InvalidSquare(String),
    #[error("unrecognized move text: {0}")]
    InvalidFormat(String),
    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(String),
    #[error("no matching legal move for: {0}")]
    NoMatch(String),
}

/// Parse either notation against a position. The returned move still goes
/// through full legality validation when applied.
pub fn parse_move(text: &str, position: &Position) -> Result<Move, NotationError> {
    let raw = text.trim();
    let body = raw.trim_end_matches(['+', '#']);
    if body.is_empty() {
        return Err(NotationError::InvalidFormat(text.to_string()));
    }
    if let Some(mv) = parse_coordinate(body, position)? {
        return Ok(mv);
    }
    parse_algebraic(body, position).ok_or_else(|| NotationError::NoMatch(raw.to_string()))
}

/// Coordinate form. Returns `Ok(None)` when the text is not shaped like a
/// coordinate move at all, so the caller can fall through to algebraic.
fn parse_coordinate(body: &str, position: &Position) -> Result<Option<Move>, NotationError> {
    let chars: Vec<char> = body.chars().collect();
    if chars.len() < 5 || (chars[2] != '-' && chars[2] != 'x') {
        return Ok(None);
    }
    let Some(from) = Square::from_chars(chars[0], chars[1]) else {
        return Ok(None);
    };

    let rest: String = chars[3..].iter().collect();
    let (to_part, promo_part) = match rest.split_once('=') {
        Some((to, promo)) => (to, Some(promo)),
        None => (rest.as_str(), None),
    };
    let to = Square::parse(to_part)?;

    let mut promotion = match promo_part {
        Some(p) => Some(parse_promotion(p)?),
        None => None,
    };
    // A bare pawn push onto the last rank promotes to a queen by default.
    if promotion.is_none() && pawn_reaches_last_rank(position, from, to) {
        promotion = Some(Piece::Queen);
    }

    Ok(Some(Move {
        from,
        to,
        promotion,
    }))
}

fn parse_promotion(text: &str) -> Result<Piece, NotationError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => match Piece::from_char(c) {
            Some(piece) if piece.is_promotion_target() => Ok(piece),
            _ => Err(NotationError::InvalidPromotion(text.to_string())),
        },
        _ => Err(NotationError::InvalidPromotion(text.to_string())),
    }
}

fn pawn_reaches_last_rank(position: &Position, from: Square, to: Square) -> bool {
    matches!(
        position.board().piece_at(from),
        Some((Piece::Pawn, _)) if to.rank() == 0 || to.rank() == 7
    )
}

fn parse_algebraic(body: &str, position: &Position) -> Option<Move> {
    let (main, promo_part) = match body.split_once('=') {
        Some((main, promo)) => (main, Some(promo)),
        None => (body, None),
    };
    let promotion = match promo_part {
        Some(p) => Some(parse_promotion(p).ok()?),
        None => None,
    };

    let chars: Vec<char> = main.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let (piece, hint_part) = if chars[0].is_ascii_uppercase() && "KQRBN".contains(chars[0]) {
        (Piece::from_char(chars[0])?, &chars[1..])
    } else {
        (Piece::Pawn, &chars[..])
    };

    // Destination is always the trailing square; everything between the
    // piece letter and the destination is origin hints plus an optional 'x'.
    if hint_part.len() < 2 {
        return None;
    }
    let to = Square::from_chars(hint_part[hint_part.len() - 2], hint_part[hint_part.len() - 1])?;
    let mut file_hint: Option<u8> = None;
    let mut rank_hint: Option<u8> = None;
    for &c in &hint_part[..hint_part.len() - 2] {
        match c {
            'x' => {}
            'a'..='h' => file_hint = Some(c as u8 - b'a'),
            '1'..='8' => rank_hint = Some(c as u8 - b'1'),
            _ => return None,
        }
    }

    let mut candidates: Vec<Move> = legal_moves(position, None)
        .into_iter()
        .filter(|mv| {
            mv.to == to
                && matches!(position.board().piece_at(mv.from), Some((p, _)) if p == piece)
        })
        .collect();

    if piece == Piece::Pawn {
        // Pawn pushes stay on their file; captures carry the file hint.
        let wanted = promotion.or_else(|| {
            (to.rank() == 0 || to.rank() == 7).then_some(Piece::Queen)
        });
        candidates.retain(|mv| mv.promotion == wanted);
        if file_hint.is_none() {
            candidates.retain(|mv| mv.from.file() == to.file());
        }
    } else if promotion.is_some() {
        return None;
    }

    disambiguate(candidates, file_hint, rank_hint, to, piece)
}

/// Hint filters first, then the closest-candidate heuristic.
fn disambiguate(
    mut candidates: Vec<Move>,
    file_hint: Option<u8>,
    rank_hint: Option<u8>,
    target: Square,
    piece: Piece,
) -> Option<Move> {
    if let Some(file) = file_hint {
        let filtered: Vec<Move> = candidates
            .iter()
            .copied()
            .filter(|mv| mv.from.file() == file)
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }
    if let Some(rank) = rank_hint {
        let filtered: Vec<Move> = candidates
            .iter()
            .copied()
            .filter(|mv| mv.from.rank() == rank)
            .collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }
    candidates
        .into_iter()
        .min_by_key(|mv| origin_distance(mv.from, target, piece))
}

fn origin_distance(from: Square, target: Square, piece: Piece) -> i32 {
    let dfile = (target.file() as i32 - from.file() as i32).abs();
    let drank = (target.rank() as i32 - from.rank() as i32).abs();
    match piece {
        Piece::Knight => dfile + drank,
        _ => dfile * dfile + drank * drank,
    }
}

/// Format the applied SAN for a legal move, with minimal origin hints when
/// another piece of the same kind could also reach the destination, and a
/// `+`/`#` suffix computed from the resulting position.
pub fn format_san(position: &Position, mv: &Move) -> String {
    let Some((piece, _)) = position.board().piece_at(mv.from) else {
        return format!("{}-{}", mv.from, mv.to);
    };
    let is_capture = position.board().piece_at(mv.to).is_some();

    let mut san = String::new();
    match piece {
        Piece::Pawn => {
            if is_capture {
                san.push(mv.from.file_char());
            }
        }
        _ => {
            san.push(piece.to_char_upper());
            san.push_str(&origin_hint(position, mv, piece));
        }
    }
    if is_capture {
        san.push('x');
    }
    san.push_str(&mv.to.to_string());
    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(promo.to_char_upper());
    }

    let after = position.apply_unchecked(mv);
    match after.status() {
        crate::game::GameStatus::Checkmate => san.push('#'),
        _ if after.in_check(after.side_to_move()) => san.push('+'),
        _ => {}
    }
    san
}

fn origin_hint(position: &Position, mv: &Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal_moves(position, None)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && matches!(position.board().piece_at(other.from), Some((p, _)) if p == piece)
        })
        .map(|other| other.from)
        .collect();
    if rivals.is_empty() {
        return String::new();
    }
    if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        return mv.from.file_char().to_string();
    }
    if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        return mv.from.rank_char().to_string();
    }
    mv.from.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::parse_fen;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    #[test]
    fn coordinate_forms() {
        let position = Position::initial();
        let mv = parse_move("e2-e4", &position).unwrap();
        assert_eq!(mv, Move::new(sq("e2"), sq("e4")));

        let capture = parse_fen("7k/8/8/3p4/4P3/8/8/7K w").unwrap();
        let mv = parse_move("e4xd5", &capture).unwrap();
        assert_eq!(mv, Move::new(sq("e4"), sq("d5")));
    }

    #[test]
    fn coordinate_promotion_and_suffixes() {
        let position = parse_fen("7k/P7/8/8/8/8/8/7K w").unwrap();
        let mv = parse_move("a7-a8=N", &position).unwrap();
        assert_eq!(mv.promotion, Some(Piece::Knight));
        // Bare push to the last rank defaults to a queen.
        let mv = parse_move("a7-a8", &position).unwrap();
        assert_eq!(mv.promotion, Some(Piece::Queen));
        // Check/mate markers are accepted and ignored.
        let initial = Position::initial();
        assert!(parse_move("e2-e4+", &initial).is_ok());
        assert!(parse_move("e2-e4#", &initial).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let position = Position::initial();
        for bad in ["", "zz", "e2e4e6", "e9-e4", "e2-e4=X", "Zf3", "x", "e2->e4"] {
            assert!(parse_move(bad, &position).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn algebraic_pawn_moves() {
        let position = Position::initial();
        let mv = parse_move("e4", &position).unwrap();
        assert_eq!(mv, Move::new(sq("e2"), sq("e4")));

        let capture = parse_fen("7k/8/8/3p4/4P3/8/8/7K w").unwrap();
        let mv = parse_move("exd5", &capture).unwrap();
        assert_eq!(mv, Move::new(sq("e4"), sq("d5")));
    }

    #[test]
    fn algebraic_piece_moves() {
        let position = Position::initial();
        let mv = parse_move("Nf3", &position).unwrap();
        assert_eq!(mv, Move::new(sq("g1"), sq("f3")));

        // Fool's mate finish.
        let mate = parse_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b").unwrap();
        let mv = parse_move("Qh4#", &mate).unwrap();
        assert_eq!(mv, Move::new(sq("d8"), sq("h4")));
    }

    #[test]
    fn algebraic_promotion() {
        let position = parse_fen("7k/P7/8/8/8/8/8/7K w").unwrap();
        let mv = parse_move("a8=R", &position).unwrap();
        assert_eq!(mv, Move::promoting(sq("a7"), sq("a8"), Piece::Rook));
    }

    #[test]
    fn disambiguation_by_hint() {
        // Knights on b1 and f1 can both reach d2.
        let position = parse_fen("7k/8/8/8/8/8/8/KN3N2 w").unwrap();
        let mv = parse_move("Nbd2", &position).unwrap();
        assert_eq!(mv.from, sq("b1"));
        let mv = parse_move("Nfd2", &position).unwrap();
        assert_eq!(mv.from, sq("f1"));
    }

    #[test]
    fn disambiguation_by_rank_hint() {
        // Rooks on a1 and a5 can both reach a3.
        let position = parse_fen("7k/8/8/r7/8/8/8/r6K b").unwrap();
        let mv = parse_move("R1a3", &position).unwrap();
        assert_eq!(mv.from, sq("a1"));
        let mv = parse_move("R5a3", &position).unwrap();
        assert_eq!(mv.from, sq("a5"));
    }

    #[test]
    fn disambiguation_falls_back_to_closest() {
        // Rooks on a1 and a7; without a hint the closer one to a6 is picked.
        let position = parse_fen("7k/r7/8/8/8/8/8/r6K b").unwrap();
        let mv = parse_move("Ra6", &position).unwrap();
        assert_eq!(mv.from, sq("a7"));
    }

    #[test]
    fn san_formatting() {
        let position = Position::initial();
        let san = format_san(&position, &Move::new(sq("e2"), sq("e4")));
        assert_eq!(san, "e4");
        let san = format_san(&position, &Move::new(sq("g1"), sq("f3")));
        assert_eq!(san, "Nf3");

        let capture = parse_fen("7k/8/8/3p4/4P3/8/8/7K w").unwrap();
        let san = format_san(&capture, &Move::new(sq("e4"), sq("d5")));
        assert_eq!(san, "exd5");
    }

    #[test]
    fn san_formatting_mate_and_promotion() {
        let mate = parse_fen("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b").unwrap();
        let san = format_san(&mate, &Move::new(sq("d8"), sq("h4")));
        assert_eq!(san, "Qh4#");

        let promo = parse_fen("7k/P7/8/8/8/8/8/7K w").unwrap();
        let san = format_san(&promo, &Move::promoting(sq("a7"), sq("a8"), Piece::Queen));
        assert_eq!(san, "a8=Q+");
    }

    #[test]
    fn san_formatting_disambiguates() {
        let position = parse_fen("7k/8/8/8/8/8/8/KN3N2 w").unwrap();
        let san = format_san(&position, &Move::new(sq("b1"), sq("d2")));
        assert_eq!(san, "Nbd2");
    }

    #[test]
    fn parse_round_trips_formatted_san() {
        let position = parse_fen("7k/8/8/8/8/8/8/KN3N2 w").unwrap();
        for mv in legal_moves(&position, None) {
            let san = format_san(&position, &mv);
            let parsed = parse_move(&san, &position).unwrap();
            assert_eq!(parsed, mv, "san {:?}", san);
        }
    }
}
