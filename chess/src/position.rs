use cozy_chess::{Board, Move, Piece};
use smallvec::SmallVec;

use crate::fen::{format_fen, parse_fen, FenError};
use crate::moves::MoveRecord;
use crate::san::{parse_san, SanError};
use crate::types::PieceColor;
use crate::uci::{convert_uci_castling_to_cozy, parse_uci_move, UciMoveError};

/// Legal-move buffer. 64 covers nearly every real position without spilling.
pub type MoveList = SmallVec<[Move; 64]>;

/// A chess position with an undo stack.
///
/// Wraps a `cozy_chess::Board`; every move played through [`Position::play`]
/// or [`Position::push`] can be taken back with [`Position::undo`]. Cloning
/// is cheap enough for the search to work on a private copy.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    undo_stack: Vec<UndoEntry>,
}

#[derive(Debug, Clone)]
struct UndoEntry {
    board: Board,
    mv: Move,
    san: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    Draw(DrawReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    FiftyMoveRule,
    InsufficientMaterial,
    ThreefoldRepetition,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

impl Position {
    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        Ok(Self::from_board(parse_fen(fen)?))
    }

    pub fn from_board(board: Board) -> Self {
        Self {
            board,
            undo_stack: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.board.side_to_move().into()
    }

    pub fn fullmove_number(&self) -> u16 {
        self.board.fullmove_number()
    }

    pub fn halfmove_clock(&self) -> u8 {
        self.board.halfmove_clock()
    }

    /// Number of moves on the undo stack.
    pub fn ply(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn to_fen(&self) -> String {
        format_fen(&self.board)
    }

    /// Legal moves in generation order, without notation.
    pub fn legal_moves_raw(&self) -> MoveList {
        let mut moves = MoveList::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Legal moves with SAN, standard UCI and flags.
    pub fn legal_moves(&self) -> Vec<MoveRecord> {
        let legal = self.legal_moves_raw();
        legal
            .iter()
            .filter_map(|mv| MoveRecord::describe(&self.board, *mv, &legal))
            .collect()
    }

    pub fn has_legal_moves(&self) -> bool {
        self.board.generate_moves(|_| true)
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves_raw().contains(&mv)
    }

    /// Describe a legal move without playing it.
    pub fn describe(&self, mv: Move) -> Option<MoveRecord> {
        let legal = self.legal_moves_raw();
        if !legal.contains(&mv) {
            return None;
        }
        MoveRecord::describe(&self.board, mv, &legal)
    }

    /// Whether `mv` takes an enemy piece, en passant included.
    pub fn is_capture(&self, mv: Move) -> bool {
        crate::moves::is_capture(&self.board, mv)
    }

    /// Validate and play a move, recording its SAN in the history.
    pub fn play(&mut self, mv: Move) -> Result<MoveRecord, PositionError> {
        let record = self
            .describe(mv)
            .ok_or_else(|| PositionError::IllegalMove(crate::uci::format_uci_move(mv)))?;
        self.apply(mv, Some(record.san.clone()));
        Ok(record)
    }

    /// Parse `text` as SAN or UCI and play it.
    pub fn play_str(&mut self, text: &str) -> Result<MoveRecord, PositionError> {
        let mv = self.parse_move(text)?;
        self.play(mv)
    }

    /// Play a move known to be legal, skipping validation and notation.
    ///
    /// Used by the search where moves come straight from move generation.
    pub fn push(&mut self, mv: Move) {
        self.apply(mv, None);
    }

    /// Take back the last move. Returns `None` on an empty stack.
    pub fn undo(&mut self) -> Option<Move> {
        let entry = self.undo_stack.pop()?;
        self.board = entry.board;
        Some(entry.mv)
    }

    fn apply(&mut self, mv: Move, san: Option<String>) {
        let before = self.board.clone();
        self.board.play_unchecked(mv);
        self.undo_stack.push(UndoEntry {
            board: before,
            mv,
            san,
        });
    }

    /// SAN of every move played through [`Position::play`], oldest first.
    pub fn history_san(&self) -> Vec<String> {
        self.undo_stack
            .iter()
            .filter_map(|entry| entry.san.clone())
            .collect()
    }

    /// Parse SAN, falling back to UCI (standard or king-takes-rook castling).
    pub fn parse_move(&self, text: &str) -> Result<Move, PositionError> {
        let san_err = match parse_san(&self.board, text) {
            Ok(mv) => return Ok(mv),
            Err(err) => err,
        };

        let text = text.trim();
        let mv = match parse_uci_move(text) {
            Ok(mv) => mv,
            Err(uci_err) if looks_like_uci(text) => return Err(uci_err.into()),
            Err(_) => return Err(san_err.into()),
        };
        let legal = self.legal_moves_raw();
        let mv = convert_uci_castling_to_cozy(mv, &legal);
        if legal.contains(&mv) {
            Ok(mv)
        } else {
            Err(PositionError::IllegalMove(text.to_string()))
        }
    }

    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    pub fn is_checkmate(&self) -> bool {
        self.status() == GameStatus::Checkmate
    }

    pub fn is_stalemate(&self) -> bool {
        self.status() == GameStatus::Stalemate
    }

    pub fn is_draw(&self) -> bool {
        matches!(self.status(), GameStatus::Draw(_) | GameStatus::Stalemate)
    }

    pub fn is_game_over(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn status(&self) -> GameStatus {
        if !self.has_legal_moves() {
            return if self.is_check() {
                GameStatus::Checkmate
            } else {
                GameStatus::Stalemate
            };
        }
        if self.board.halfmove_clock() >= 100 {
            return GameStatus::Draw(DrawReason::FiftyMoveRule);
        }
        if self.is_insufficient_material() {
            return GameStatus::Draw(DrawReason::InsufficientMaterial);
        }
        if self.repetitions() >= 3 {
            return GameStatus::Draw(DrawReason::ThreefoldRepetition);
        }
        GameStatus::Ongoing
    }

    /// Occurrences of the current position, counting this one.
    pub fn repetitions(&self) -> usize {
        let hash = self.board.hash();
        1 + self
            .undo_stack
            .iter()
            .filter(|entry| entry.board.hash() == hash)
            .count()
    }

    /// K v K, K+minor v K, or bishops only with all bishops on one colour.
    pub fn is_insufficient_material(&self) -> bool {
        let board = &self.board;
        let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
        if !heavy.is_empty() {
            return false;
        }

        let knights = board.pieces(Piece::Knight).len();
        let bishops = board.pieces(Piece::Bishop);
        match (knights, bishops.len()) {
            (0, 0) | (1, 0) | (0, 1) => true,
            (0, _) => {
                let mut colours = bishops
                    .into_iter()
                    .map(|sq| (sq.file() as usize + sq.rank() as usize) % 2);
                let first = colours.next();
                colours.all(|c| Some(c) == first)
            }
            _ => false,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl std::str::FromStr for Position {
    type Err = PositionError;

    fn from_str(fen: &str) -> Result<Self, Self::Err> {
        Self::from_fen(fen)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

/// Coordinate notation starts with a file letter and a rank digit.
fn looks_like_uci(text: &str) -> bool {
    let bytes = text.as_bytes();
    (4..=5).contains(&bytes.len())
        && (b'a'..=b'h').contains(&bytes[0])
        && bytes[1].is_ascii_digit()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    San(#[from] SanError),
    #[error(transparent)]
    Uci(#[from] UciMoveError),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}
