use async_trait::async_trait;
use chess::Position;
use engine::{EngineEvaluation, EvalParams, GatewayError, PositionEvaluator, MATE_SCORE};

use crate::minimax::{search, SCORE_INFINITY};

/// Deepest search the in-house evaluator will run, whatever was requested.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Scores positions with the in-house search, for analysis without an
/// external engine.
///
/// Requested depths are capped at `max_depth`. Mates are reported as
/// `±MATE_SCORE` without a distance.
#[derive(Debug, Clone, Copy)]
pub struct SearchEvaluator {
    max_depth: u32,
}

impl SearchEvaluator {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

impl Default for SearchEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

#[async_trait]
impl PositionEvaluator for SearchEvaluator {
    async fn evaluate(
        &self,
        fen: &str,
        params: EvalParams,
    ) -> Result<EngineEvaluation, GatewayError> {
        let position =
            Position::from_fen(fen).map_err(|e| GatewayError::InvalidPosition(e.to_string()))?;
        let depth = params.depth.min(self.max_depth);
        let sign = position.side_to_move().sign();

        let result = tokio::task::spawn_blocking(move || search(&position, depth))
            .await
            .map_err(|e| {
                tracing::error!("Search task failed: {}", e);
                GatewayError::ChannelClosed
            })?;

        // White-positive search score to the side to move's point of view
        let white_score = if result.score.abs() == SCORE_INFINITY {
            result.score.signum() * MATE_SCORE
        } else {
            result.score.clamp(-MATE_SCORE, MATE_SCORE)
        };
        let score = white_score * sign;
        let best_move = result.best_move.map(|record| record.uci);

        Ok(EngineEvaluation {
            score,
            mate: None,
            pv: best_move.iter().cloned().collect(),
            best_move,
            depth,
        })
    }
}
