//! Move search for the computer opponent.
//!
//! A fixed-depth alpha-beta minimax over a material plus piece-square
//! evaluation. [`Opponent`] wraps it for game loops and [`SearchEvaluator`]
//! exposes it through the same evaluator seam as an external engine.

pub mod eval;
pub mod evaluator;
pub mod minimax;
pub mod opponent;
pub mod tables;

pub use eval::evaluate;
pub use evaluator::SearchEvaluator;
pub use minimax::{search, select_move, SearchResult, SCORE_INFINITY};
pub use opponent::{random_move, Opponent, OpponentConfig, DEFAULT_OPPONENT_DEPTH};
