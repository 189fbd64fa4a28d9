use super::parser::{parse_uci_message, Score, UciMessage};
use crate::{EngineEvaluation, MATE_SCORE};

/// Running evaluation for the request currently in flight.
///
/// Folds engine output one line at a time. A `score cp` line only replaces
/// the score, so a mate seen at an earlier depth stays reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    score: i32,
    mate: Option<i32>,
    depth: u32,
    pv: Vec<String>,
}

impl Accumulator {
    /// Fold one line. Returns the finished evaluation on `bestmove`.
    pub fn apply_line(&mut self, line: &str) -> Option<EngineEvaluation> {
        match parse_uci_message(line) {
            Ok(UciMessage::Info(info)) => {
                if let Some(depth) = info.depth {
                    self.depth = depth;
                }
                match info.score {
                    Some(Score::Centipawns(cp)) => self.score = cp,
                    Some(Score::Mate(n)) => {
                        self.mate = Some(n);
                        self.score = if n > 0 { MATE_SCORE } else { -MATE_SCORE };
                    }
                    None => {}
                }
                if let Some(pv) = info.pv {
                    self.pv = pv;
                }
                None
            }
            Ok(UciMessage::BestMove { mv, .. }) => Some(EngineEvaluation {
                score: self.score,
                mate: self.mate,
                best_move: mv,
                depth: self.depth,
                pv: std::mem::take(&mut self.pv),
            }),
            _ => None,
        }
    }
}
