use serde::{Deserialize, Serialize};

use crate::accuracy::{average_cp_loss, calculate_accuracy, phase_accuracy, GamePhase};
use crate::analyzer::MoveAnalysis;
use crate::classification::MoveClassification;

/// Aggregate move quality for one game, computed from the full list of
/// analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameAnalyticsSummary {
    pub total_moves: u32,
    pub brilliant_moves: u32,
    pub great_moves: u32,
    pub good_moves: u32,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    pub avg_centipawn_loss: f64,
    pub accuracy: f64,
    pub opening_accuracy: f64,
    pub middlegame_accuracy: f64,
    pub endgame_accuracy: f64,
}

impl GameAnalyticsSummary {
    pub fn from_analyses(analyses: &[MoveAnalysis]) -> Self {
        let count = |class: MoveClassification| {
            analyses
                .iter()
                .filter(|a| a.classification == class)
                .count() as u32
        };

        Self {
            total_moves: analyses.len() as u32,
            brilliant_moves: count(MoveClassification::Brilliant),
            great_moves: count(MoveClassification::Great),
            good_moves: count(MoveClassification::Good),
            inaccuracies: count(MoveClassification::Inaccuracy),
            mistakes: count(MoveClassification::Mistake),
            blunders: count(MoveClassification::Blunder),
            avg_centipawn_loss: average_cp_loss(analyses),
            accuracy: calculate_accuracy(analyses),
            opening_accuracy: phase_accuracy(analyses, GamePhase::Opening),
            middlegame_accuracy: phase_accuracy(analyses, GamePhase::Middlegame),
            endgame_accuracy: phase_accuracy(analyses, GamePhase::Endgame),
        }
    }

    pub fn phase_accuracy(&self, phase: GamePhase) -> f64 {
        match phase {
            GamePhase::Opening => self.opening_accuracy,
            GamePhase::Middlegame => self.middlegame_accuracy,
            GamePhase::Endgame => self.endgame_accuracy,
        }
    }
}
