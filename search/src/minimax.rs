//! Fixed-depth minimax with alpha-beta pruning.
//!
//! Scores are from White's point of view: White maximizes, Black minimizes.
//! A checkmate scores `∓SCORE_INFINITY` regardless of distance.

use chess::{GameStatus, Move, MoveList, MoveRecord, PieceColor, Position};

use crate::eval::evaluate;

/// Score of a checkmate. Every reachable static score is far below it.
pub const SCORE_INFINITY: i32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub score: i32,
    pub best_move: Option<MoveRecord>,
    pub nodes: u64,
}

/// Best move for the side to move at `depth` plies, `None` when there is
/// no legal move.
pub fn select_move(position: &Position, depth: u32) -> Option<MoveRecord> {
    search(position, depth).best_move
}

pub fn search(position: &Position, depth: u32) -> SearchResult {
    let maximizing = position.side_to_move() == PieceColor::White;
    let mut searcher = Searcher {
        position: position.clone(),
        nodes: 0,
    };
    let (score, best) = searcher.minimax(depth, -SCORE_INFINITY, SCORE_INFINITY, maximizing);

    SearchResult {
        score,
        best_move: best.and_then(|mv| position.describe(mv)),
        nodes: searcher.nodes,
    }
}

/// Score of a finished game at a node where `maximizing` is to move.
pub(crate) fn terminal_score(status: GameStatus, maximizing: bool) -> Option<i32> {
    match status {
        GameStatus::Ongoing => None,
        GameStatus::Checkmate if maximizing => Some(-SCORE_INFINITY),
        GameStatus::Checkmate => Some(SCORE_INFINITY),
        GameStatus::Stalemate | GameStatus::Draw(_) => Some(0),
    }
}

/// Legal moves with captures first, otherwise in generation order.
pub(crate) fn ordered_moves(position: &Position) -> MoveList {
    let moves = position.legal_moves_raw();
    let (mut ordered, quiet): (MoveList, MoveList) =
        moves.into_iter().partition(|mv| position.is_capture(*mv));
    ordered.extend(quiet);
    ordered
}

struct Searcher {
    position: Position,
    nodes: u64,
}

impl Searcher {
    fn minimax(
        &mut self,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
    ) -> (i32, Option<Move>) {
        self.nodes += 1;

        if let Some(score) = terminal_score(self.position.status(), maximizing) {
            return (score, None);
        }
        if depth == 0 {
            return (evaluate(self.position.board()), None);
        }

        let mut best: Option<(i32, Move)> = None;
        for mv in ordered_moves(&self.position) {
            self.position.push(mv);
            let (score, _) = self.minimax(depth - 1, alpha, beta, !maximizing);
            self.position.undo();

            // The first move is kept even when every line is lost
            let improves = match best {
                None => true,
                Some((best_score, _)) if maximizing => score > best_score,
                Some((best_score, _)) => score < best_score,
            };
            if improves {
                best = Some((score, mv));
            }

            if maximizing {
                alpha = alpha.max(score);
            } else {
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }

        match best {
            Some((score, mv)) => (score, Some(mv)),
            // Unreachable: a position with no legal move is terminal
            None => (evaluate(self.position.board()), None),
        }
    }
}
