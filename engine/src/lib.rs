pub mod connector;
pub mod gateway;
pub mod process;
pub mod uci;

pub use connector::{Connector, EngineChannel};
pub use gateway::{EngineGateway, GatewayConfig, GatewayError, GatewayState};
pub use process::{find_stockfish_path, EngineConfig, StockfishConnector};
pub use uci::{Accumulator, UciError, UciMessage};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Centipawn stand-in for a forced mate, signed by who mates.
pub const MATE_SCORE: i32 = 10_000;

/// Default search depth for a request.
pub const DEFAULT_DEPTH: u32 = 15;

/// Default per-request time budget, before the gateway's grace period.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(2000);

/// Result of evaluating one position.
///
/// `score` is in centipawns from the side to move's point of view. A forced
/// mate sets `mate` and pins `score` to `±MATE_SCORE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvaluation {
    pub score: i32,
    pub mate: Option<i32>,
    /// UCI move, `None` when the engine answered `bestmove (none)`.
    pub best_move: Option<String>,
    pub depth: u32,
    pub pv: Vec<String>,
}

/// Parameters for a single evaluation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalParams {
    pub depth: u32,
    pub time_limit: Duration,
}

impl EvalParams {
    pub fn depth(depth: u32) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

/// Anything that can score a position given as FEN.
///
/// Implemented by [`EngineGateway`] for an external UCI engine and by the
/// in-house search, so the analyzer can run against either.
#[async_trait::async_trait]
pub trait PositionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        fen: &str,
        params: EvalParams,
    ) -> Result<EngineEvaluation, GatewayError>;
}
