//! Computer opponent built on the minimax search.
//!
//! The search itself never fails, but the opponent is what a game loop calls
//! on its own turn, so a panic or an empty result must still produce a move.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use chess::{MoveRecord, Position};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::minimax::{search, SearchResult};

pub const DEFAULT_OPPONENT_DEPTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpponentConfig {
    pub depth: u32,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_OPPONENT_DEPTH,
        }
    }
}

type SearchFn = fn(&Position, u32) -> SearchResult;

#[derive(Debug, Clone, Copy)]
pub struct Opponent {
    config: OpponentConfig,
    search: SearchFn,
}

impl Opponent {
    pub fn new(config: OpponentConfig) -> Self {
        Self {
            config,
            search,
        }
    }

    /// Replace the search routine, e.g. with a stub in tests.
    pub fn with_search(mut self, search: SearchFn) -> Self {
        self.search = search;
        self
    }

    pub fn config(&self) -> OpponentConfig {
        self.config
    }

    /// Pick a move for the side to move, `None` only when the game is over.
    pub fn choose_move(&self, position: &Position) -> Option<MoveRecord> {
        let started = Instant::now();
        let depth = self.config.depth;
        let search = self.search;

        match catch_unwind(AssertUnwindSafe(|| search(position, depth))) {
            Ok(result) => {
                tracing::debug!(
                    depth,
                    nodes = result.nodes,
                    score = result.score,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    chosen = ?result.best_move.as_ref().map(|m| m.uci.as_str()),
                    "Search finished"
                );
                result.best_move.or_else(|| random_move(position))
            }
            Err(_) => {
                tracing::error!(depth, "Search panicked, falling back to a random move");
                random_move(position)
            }
        }
    }

    /// Runs [`Opponent::choose_move`] on the blocking pool.
    pub async fn choose_move_async(&self, position: Position) -> Option<MoveRecord> {
        let opponent = *self;
        let fallback = position.clone();

        match tokio::task::spawn_blocking(move || opponent.choose_move(&position)).await {
            Ok(chosen) => chosen,
            Err(e) => {
                tracing::error!("Search task failed: {}", e);
                random_move(&fallback)
            }
        }
    }
}

impl Default for Opponent {
    fn default() -> Self {
        Self::new(OpponentConfig::default())
    }
}

/// Uniformly random legal move.
pub fn random_move(position: &Position) -> Option<MoveRecord> {
    let moves = position.legal_moves();
    moves.choose(&mut thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panicking_search(_: &Position, _: u32) -> SearchResult {
        panic!("search blew up");
    }

    fn empty_search(_: &Position, _: u32) -> SearchResult {
        SearchResult {
            score: 0,
            best_move: None,
            nodes: 0,
        }
    }

    #[test]
    fn test_default_depth() {
        assert_eq!(Opponent::default().config().depth, 3);
    }

    #[test]
    fn test_takes_free_queen() {
        let position = Position::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let chosen = Opponent::default().choose_move(&position).unwrap();
        assert_eq!(chosen.uci, "d2d5");
    }

    #[test]
    fn test_panicking_search_falls_back_to_legal_move() {
        let position = Position::startpos();
        let opponent = Opponent::default().with_search(panicking_search);
        let chosen = opponent.choose_move(&position).unwrap();
        assert!(position.legal_moves_raw().contains(&chosen.mv));
    }

    #[test]
    fn test_empty_search_falls_back_to_legal_move() {
        let position = Position::startpos();
        let opponent = Opponent::default().with_search(empty_search);
        let chosen = opponent.choose_move(&position).unwrap();
        assert!(position.legal_moves_raw().contains(&chosen.mv));
    }

    #[test]
    fn test_no_move_when_game_over() {
        let mated =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(Opponent::default().choose_move(&mated).is_none());
        assert!(random_move(&mated).is_none());
    }

    #[tokio::test]
    async fn test_choose_move_async() {
        let position = Position::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let chosen = Opponent::default().choose_move_async(position).await.unwrap();
        assert_eq!(chosen.uci, "d2d5");
    }

    #[tokio::test]
    async fn test_choose_move_async_survives_panic() {
        let position = Position::startpos();
        let opponent = Opponent::default().with_search(panicking_search);
        let chosen = opponent.choose_move_async(position.clone()).await.unwrap();
        assert!(position.legal_moves_raw().contains(&chosen.mv));
    }
}
