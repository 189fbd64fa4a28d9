//! Post-game move quality analysis and player aggregates.
//!
//! [`MoveAnalyzer`] grades each move of a game against any
//! [`engine::PositionEvaluator`]; the other modules roll those grades up
//! into game summaries, openings, ratings and player skill scores.

pub mod accuracy;
pub mod analyzer;
pub mod classification;
pub mod openings;
pub mod player;
pub mod rating;
pub mod summary;

pub use accuracy::{calculate_accuracy, phase_accuracy, GamePhase};
pub use analyzer::{AnalysisError, AnalyzerConfig, MoveAnalysis, MoveAnalyzer};
pub use classification::MoveClassification;
pub use openings::{detect_opening, match_opening, Opening, OpeningMatch};
pub use player::{skill_breakdown, GameRecord, PlayerAnalytics, SkillBreakdown};
pub use rating::{update_rating, GameOutcome, PlayerRatingState, RatingChange};
pub use summary::GameAnalyticsSummary;
