//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// This function checks if the move is a castling move and converts it to the
/// appropriate cozy_chess format by finding the matching legal move.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = if mv.to.file() == File::G {
            File::H
        } else {
            File::A
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Whether `mv` is a castling move in cozy_chess (king-takes-own-rook) encoding.
pub fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Format a move in raw cozy_chess UCI form (castling as king-takes-rook).
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(crate::PieceKind::from(promo).to_char_lower());
    }
    s
}

/// Format a move in standard UCI form as an external engine expects it:
/// castling is written as the king's two-square move (e1g1, e8c8).
pub fn format_standard_uci(board: &Board, mv: Move) -> String {
    if is_castle(board, mv) {
        let king_file = if mv.to.file() as usize > mv.from.file() as usize {
            File::G
        } else {
            File::C
        };
        let to = Square::new(king_file, mv.from.rank());
        return format!("{}{}", format_square(mv.from), format_square(to));
    }
    format_uci_move(mv)
}

/// Parse UCI move format (e2e4, e7e8q)
pub fn parse_uci_move(s: &str) -> Result<Move, UciMoveError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciMoveError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = if s.len() == 5 {
        Some(match &s[4..5] {
            "q" => Piece::Queen,
            "r" => Piece::Rook,
            "b" => Piece::Bishop,
            "n" => Piece::Knight,
            _ => return Err(UciMoveError::InvalidPromotion(s.to_string())),
        })
    } else {
        None
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

pub fn parse_square(s: &str) -> Result<Square, UciMoveError> {
    let mut chars = s.chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(UciMoveError::InvalidSquare(s.to_string()));
    };

    let file = match f {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    let rank = match r {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

pub fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciMoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_uci_move() {
        let mv = parse_uci_move("g1f3").unwrap();
        assert_eq!(mv.from, Square::new(File::G, Rank::First));
        assert_eq!(mv.to, Square::new(File::F, Rank::Third));
        assert_eq!(parse_uci_move("a7a8n").unwrap().promotion, Some(Piece::Knight));
    }

    #[test]
    fn test_parse_uci_move_rejects_garbage() {
        assert!(matches!(parse_uci_move("zz"), Err(UciMoveError::InvalidMove(_))));
        assert!(matches!(parse_uci_move("i2i4"), Err(UciMoveError::InvalidSquare(_))));
        assert!(matches!(parse_uci_move("e7e8k"), Err(UciMoveError::InvalidPromotion(_))));
        assert!(parse_uci_move("(none)").is_err());
    }

    #[test]
    fn test_castling_written_in_standard_form() {
        let board = Board::from_fen(
            "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1",
            false,
        )
        .unwrap();
        let short = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::H, Rank::First),
            promotion: None,
        };
        let long = Move {
            from: Square::new(File::E, Rank::First),
            to: Square::new(File::A, Rank::First),
            promotion: None,
        };
        assert!(is_castle(&board, short));
        assert_eq!(format_standard_uci(&board, short), "e1g1");
        assert_eq!(format_standard_uci(&board, long), "e1c1");
    }

    #[test]
    fn test_convert_standard_castling_to_cozy() {
        let board = Board::from_fen(
            "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1",
            false,
        )
        .unwrap();
        let mut legal = Vec::new();
        board.generate_moves(|mvs| {
            legal.extend(mvs);
            false
        });
        let converted = convert_uci_castling_to_cozy(parse_uci_move("e1g1").unwrap(), &legal);
        assert_eq!(format_uci_move(converted), "e1h1");
    }
}
