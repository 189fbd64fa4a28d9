//! Accuracy percentages derived from centipawn loss.
//!
//! `accuracy = 100 - avg_cp_loss / 10`, rounded to one decimal and clamped to
//! [0, 100]. No moves means no accuracy, reported as 0.

use serde::{Deserialize, Serialize};

use crate::analyzer::MoveAnalysis;

/// Game phase by half-move index into the analyzed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Half-moves 0-19.
    Opening,
    /// Half-moves 20-49.
    Middlegame,
    /// Half-moves 50 onwards.
    Endgame,
}

impl GamePhase {
    pub const ALL: [Self; 3] = [Self::Opening, Self::Middlegame, Self::Endgame];

    pub fn of_index(index: usize) -> Self {
        match index {
            0..=19 => Self::Opening,
            20..=49 => Self::Middlegame,
            _ => Self::Endgame,
        }
    }
}

pub fn accuracy_from_average(avg_cp_loss: f64) -> f64 {
    let accuracy = 100.0 - avg_cp_loss / 10.0;
    ((accuracy * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Mean centipawn loss, 0 for no moves.
pub fn average_cp_loss<'a>(analyses: impl IntoIterator<Item = &'a MoveAnalysis>) -> f64 {
    let (total, count) = analyses
        .into_iter()
        .fold((0i64, 0usize), |(total, count), a| {
            (total + a.centipawn_loss as i64, count + 1)
        });
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

pub fn calculate_accuracy(analyses: &[MoveAnalysis]) -> f64 {
    if analyses.is_empty() {
        return 0.0;
    }
    accuracy_from_average(average_cp_loss(analyses))
}

pub fn phase_accuracy(analyses: &[MoveAnalysis], phase: GamePhase) -> f64 {
    let in_phase: Vec<&MoveAnalysis> = analyses
        .iter()
        .enumerate()
        .filter(|(i, _)| GamePhase::of_index(*i) == phase)
        .map(|(_, a)| a)
        .collect();
    if in_phase.is_empty() {
        return 0.0;
    }
    accuracy_from_average(average_cp_loss(in_phase))
}
