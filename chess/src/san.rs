//! Standard Algebraic Notation (SAN) formatting and parsing.

use cozy_chess::{Board, Move, Piece};

use crate::types::PieceKind;
use crate::uci::{file_char, is_castle, rank_char};

/// Format a move as SAN, including the check (`+`) or mate (`#`) suffix.
///
/// `mv` must be legal on `board`.
pub fn format_san(board: &Board, mv: Move) -> String {
    let legal = legal_moves(board);
    format_san_with(board, mv, &legal)
}

/// Same as [`format_san`] but reuses an already generated legal-move list.
pub fn format_san_with(board: &Board, mv: Move, legal: &[Move]) -> String {
    let mut san = san_body(board, mv, legal, true);

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if has_legal_move(&after) {
            san.push('+');
        } else {
            san.push('#');
        }
    }

    san
}

/// SAN without the check/mate suffix. With `disambiguate` false the origin
/// qualifier is omitted, which is how under-qualified input is detected.
fn san_body(board: &Board, mv: Move, legal: &[Move], disambiguate: bool) -> String {
    if is_castle(board, mv) {
        return if mv.to.file() as usize > mv.from.file() as usize {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        };
    }

    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };
    let is_capture = board.color_on(mv.to) == Some(!board.side_to_move())
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    if piece == Piece::Pawn {
        if is_capture {
            san.push(file_char(mv.from.file()));
        }
    } else {
        san.push(PieceKind::from(piece).to_char_upper());
        if disambiguate {
            san.push_str(&disambiguation(board, mv, piece, legal));
        }
    }

    if is_capture {
        san.push('x');
    }
    san.push(file_char(mv.to.file()));
    san.push(rank_char(mv.to.rank()));

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(PieceKind::from(promo).to_char_upper());
    }

    san
}

/// Origin qualifier for a piece move when another piece of the same kind can
/// reach the same square: file if unique, else rank if unique, else both.
fn disambiguation(board: &Board, mv: Move, piece: Piece, legal: &[Move]) -> String {
    let rivals: Vec<&Move> = legal
        .iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castle(board, **other)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());

    match (shares_file, shares_rank) {
        (false, _) => file_char(mv.from.file()).to_string(),
        (true, false) => rank_char(mv.from.rank()).to_string(),
        (true, true) => format!(
            "{}{}",
            file_char(mv.from.file()),
            rank_char(mv.from.rank())
        ),
    }
}

/// Parse a SAN move against the legal moves of `board`.
///
/// Annotation suffixes (`+`, `#`, `!`, `?`) are ignored, `0-0` is accepted for
/// `O-O`, and the `=` before a promotion piece is optional.
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let wanted = normalize(san);
    if wanted.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);
    if let Some(mv) = legal
        .iter()
        .copied()
        .find(|mv| normalize(&san_body(board, *mv, &legal, true)) == wanted)
    {
        return Ok(mv);
    }

    let loose = legal
        .iter()
        .filter(|mv| normalize(&san_body(board, **mv, &legal, false)) == wanted)
        .count();
    if loose > 1 {
        Err(SanError::AmbiguousMove(san.to_string()))
    } else {
        Err(SanError::NoLegalMove(san.to_string()))
    }
}

fn normalize(san: &str) -> String {
    san.trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .replace("0-0-0", "O-O-O")
        .replace("0-0", "O-O")
        .replace('=', "")
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn has_legal_move(board: &Board) -> bool {
    board.generate_moves(|_| true)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::START_FEN;
    use crate::uci::parse_uci_move;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen, false).unwrap()
    }

    fn san_of(fen: &str, uci: &str) -> String {
        format_san(&board(fen), parse_uci_move(uci).unwrap())
    }

    #[test]
    fn test_pawn_push() {
        assert_eq!(san_of(START_FEN, "e2e4"), "e4");
    }

    #[test]
    fn test_knight() {
        assert_eq!(san_of(START_FEN, "g1f3"), "Nf3");
    }

    #[test]
    fn test_pawn_capture() {
        let fen = "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2";
        assert_eq!(san_of(fen, "e4d5"), "exd5");
    }

    #[test]
    fn test_en_passant_capture() {
        let fen = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";
        assert_eq!(san_of(fen, "e5f6"), "exf6");
    }

    #[test]
    fn test_castling() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1h1"), "O-O");
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/R3KBNR w KQkq - 0 1";
        assert_eq!(san_of(fen, "e1a1"), "O-O-O");
    }

    #[test]
    fn test_promotion() {
        let fen = "8/P7/8/8/8/7k/8/4K3 w - - 0 1";
        assert_eq!(san_of(fen, "a7a8q"), "a8=Q");
        assert_eq!(san_of(fen, "a7a8n"), "a8=N");
    }

    #[test]
    fn test_file_disambiguation() {
        // Knights on b1 and f3 can both reach d2
        let fen = "4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1";
        assert_eq!(san_of(fen, "b1d2"), "Nbd2");
        assert_eq!(san_of(fen, "f3d2"), "Nfd2");
    }

    #[test]
    fn test_rank_disambiguation() {
        // Rooks on a1 and a5 can both reach a3
        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1a3"), "R1a3");
        assert_eq!(san_of(fen, "a5a3"), "R5a3");
    }

    #[test]
    fn test_check_and_mate_suffix() {
        // Scholar's mate final move
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";
        assert_eq!(san_of(fen, "h5f7"), "Qxf7#");
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        assert_eq!(san_of(fen, "a1a8"), "Ra8+");
    }

    #[test]
    fn test_parse_san_round_trip() {
        let b = board(START_FEN);
        let mv = parse_san(&b, "Nf3").unwrap();
        assert_eq!(crate::uci::format_uci_move(mv), "g1f3");
        let mv = parse_san(&b, "e4").unwrap();
        assert_eq!(crate::uci::format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_parse_san_accepts_annotations_and_zero_castling() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQK2R w KQkq - 0 1";
        let b = board(fen);
        let mv = parse_san(&b, "0-0").unwrap();
        assert_eq!(crate::uci::format_uci_move(mv), "e1h1");
        let mv = parse_san(&b, "O-O!?").unwrap();
        assert_eq!(crate::uci::format_uci_move(mv), "e1h1");
    }

    #[test]
    fn test_parse_san_rejects_illegal() {
        let b = board(START_FEN);
        assert!(matches!(parse_san(&b, "e5"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&b, ""), Err(SanError::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_san_ambiguous_without_qualifier() {
        let b = board("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1");
        assert!(matches!(parse_san(&b, "Nd2"), Err(SanError::AmbiguousMove(_))));
        assert!(parse_san(&b, "Nbd2").is_ok());
    }
}
