use chess::{PieceColor, PieceKind};
use cozy_chess::{Board, Color};

use crate::tables::{material, square_value};

/// Static evaluation from White's point of view: material plus
/// piece-square bonus, added for White and subtracted for Black.
pub fn evaluate(board: &Board) -> i32 {
    let mut total = 0;
    for color in [Color::White, Color::Black] {
        let side: PieceColor = color.into();
        let mut side_total = 0;
        for kind in PieceKind::ALL {
            let pieces = board.pieces(kind.into()) & board.colors(color);
            for square in pieces {
                side_total += material(kind) + square_value(kind, side, square);
            }
        }
        total += side.sign() * side_total;
    }
    total
}
