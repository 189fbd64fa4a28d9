use cozy_chess::{Board, Move, Piece};

use crate::types::{PieceColor, PieceKind};
use crate::uci::{format_standard_uci, is_castle};

/// Per-move metadata, the verbose form of a legal move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub capture: bool,
    pub check: bool,
    pub checkmate: bool,
    pub castle: bool,
    pub en_passant: bool,
    pub promotion: bool,
}

/// A legal move together with its notations and flags.
///
/// Only produced by [`crate::Position`]; `mv` is in cozy_chess encoding
/// (castling as king-takes-rook) while `uci` is standard UCI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    pub mv: Move,
    pub san: String,
    pub uci: String,
    pub piece: PieceKind,
    pub color: PieceColor,
    pub captured: Option<PieceKind>,
    pub promotion: Option<PieceKind>,
    pub flags: MoveFlags,
}

impl MoveRecord {
    /// Describe `mv`, which must be legal on `board`; `legal` is the full
    /// legal-move list of `board` (needed for SAN disambiguation).
    pub(crate) fn describe(board: &Board, mv: Move, legal: &[Move]) -> Option<Self> {
        let piece = board.piece_on(mv.from)?;
        let color = board.side_to_move();
        let castle = is_castle(board, mv);
        let en_passant = is_en_passant(board, mv);

        let captured = if en_passant {
            Some(PieceKind::Pawn)
        } else if board.color_on(mv.to) == Some(!color) {
            board.piece_on(mv.to).map(PieceKind::from)
        } else {
            None
        };

        let san = crate::san::format_san_with(board, mv, legal);
        let flags = MoveFlags {
            capture: captured.is_some(),
            check: san.ends_with('+') || san.ends_with('#'),
            checkmate: san.ends_with('#'),
            castle,
            en_passant,
            promotion: mv.promotion.is_some(),
        };

        Some(Self {
            mv,
            uci: format_standard_uci(board, mv),
            san,
            piece: piece.into(),
            color: color.into(),
            captured,
            promotion: mv.promotion.map(PieceKind::from),
            flags,
        })
    }
}

impl std::fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.san)
    }
}

/// A pawn moving diagonally onto an empty square.
pub fn is_en_passant(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::Pawn)
        && mv.from.file() != mv.to.file()
        && board.piece_on(mv.to).is_none()
}

/// Whether `mv` takes an enemy piece (en passant included). Castling, which
/// cozy_chess encodes as the king landing on its own rook, is not a capture.
pub fn is_capture(board: &Board, mv: Move) -> bool {
    board.color_on(mv.to) == Some(!board.side_to_move()) || is_en_passant(board, mv)
}
