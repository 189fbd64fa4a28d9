pub mod fen;
pub mod moves;
pub mod position;
pub mod san;
pub mod types;
pub mod uci;

pub use cozy_chess::{Board, Move};
pub use fen::{parse_fen, FenError, START_FEN};
pub use moves::{MoveFlags, MoveRecord};
pub use position::{DrawReason, GameStatus, MoveList, Position, PositionError};
pub use san::{format_san, parse_san, SanError};
pub use types::{PieceColor, PieceKind};
pub use uci::{convert_uci_castling_to_cozy, format_standard_uci, format_uci_move, UciMoveError};
