//! Per-move quality analysis of a finished or ongoing game.
//!
//! Every move is scored by evaluating the position before and after it. Raw
//! evaluator scores are relative to the side to move, so the score before a
//! move is already in the mover's frame and the score after it is negated.

use chess::{GameStatus, PieceColor, Position, PositionError};
use engine::{EvalParams, GatewayError, PositionEvaluator, DEFAULT_TIME_LIMIT, MATE_SCORE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classification::MoveClassification;

pub const DEFAULT_BATCH_DEPTH: u32 = 15;
pub const DEFAULT_LIVE_DEPTH: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Depth for post-game analysis.
    pub batch_depth: u32,
    /// Depth for per-move feedback during play.
    pub live_depth: u32,
    pub time_limit: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            batch_depth: DEFAULT_BATCH_DEPTH,
            live_depth: DEFAULT_LIVE_DEPTH,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

impl AnalyzerConfig {
    fn batch_params(&self) -> EvalParams {
        EvalParams::depth(self.batch_depth).with_time_limit(self.time_limit)
    }

    fn live_params(&self) -> EvalParams {
        EvalParams::depth(self.live_depth).with_time_limit(self.time_limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid position: {0}")]
    Position(#[from] PositionError),
    #[error("Evaluator failed: {0}")]
    Evaluator(#[from] GatewayError),
}

/// Analysis of one played move.
///
/// `eval_before` and `eval_after` are White-relative centipawns; the loss
/// and classification are from the mover's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    pub san: String,
    pub uci: String,
    /// 1-based index of the move in the analyzed move list.
    pub ply: u32,
    pub move_number: u32,
    pub color: PieceColor,
    pub fen_before: String,
    pub fen_after: String,
    pub eval_before: i32,
    pub eval_after: i32,
    pub centipawn_loss: i32,
    /// Evaluator's preferred move in the position before, as UCI.
    pub best_move: Option<String>,
    pub classification: MoveClassification,
    pub is_brilliant: bool,
    pub is_mistake: bool,
    pub is_blunder: bool,
}

/// Centipawn loss and improvement of a move, both in the mover's frame.
///
/// `raw_before` is relative to the mover (who was to move), `raw_after` to
/// the opponent.
pub fn score_move(raw_before: i32, raw_after: i32) -> (i32, i32) {
    let before = raw_before;
    let after = -raw_after;
    ((before - after).max(0), after - before)
}

pub struct MoveAnalyzer<E> {
    evaluator: E,
    config: AnalyzerConfig,
}

impl<E: PositionEvaluator> MoveAnalyzer<E> {
    pub fn new(evaluator: E, config: AnalyzerConfig) -> Self {
        Self { evaluator, config }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub async fn analyze_game<S: AsRef<str>>(
        &self,
        moves: &[S],
        starting_fen: Option<&str>,
    ) -> Result<Vec<MoveAnalysis>, AnalysisError> {
        self.analyze_game_with_progress(moves, starting_fen, |_, _| {})
            .await
    }

    /// Analyze `moves` (SAN or UCI) played from `starting_fen`, or the
    /// standard start. Moves that do not parse or are illegal are skipped.
    /// `on_progress(done, total)` fires after each input move.
    pub async fn analyze_game_with_progress<S, F>(
        &self,
        moves: &[S],
        starting_fen: Option<&str>,
        mut on_progress: F,
    ) -> Result<Vec<MoveAnalysis>, AnalysisError>
    where
        S: AsRef<str>,
        F: FnMut(usize, usize) + Send,
    {
        let mut position = match starting_fen {
            Some(fen) => Position::from_fen(fen)?,
            None => Position::startpos(),
        };
        let params = self.config.batch_params();
        let total = moves.len();
        let mut analyses = Vec::with_capacity(total);

        tracing::info!(moves = total, depth = params.depth, "Starting game analysis");

        for (i, text) in moves.iter().enumerate() {
            let text = text.as_ref();
            let ply = (i as u32) + 1;

            let mv = match position.parse_move(text) {
                Ok(mv) => mv,
                Err(e) => {
                    tracing::warn!(ply, text, "Skipping move: {}", e);
                    on_progress(i + 1, total);
                    continue;
                }
            };

            let fen_before = position.to_fen();
            let move_number = u32::from(position.fullmove_number());
            let before = self.evaluator.evaluate(&fen_before, params).await?;
            let record = position.play(mv)?;
            let fen_after = position.to_fen();
            let raw_after = self.evaluate_after(&position, &fen_after, params).await?;

            let analysis = build_analysis(AnalysisInput {
                san: record.san,
                uci: record.uci,
                ply,
                move_number,
                color: record.color,
                fen_before,
                fen_after,
                raw_before: before.score,
                raw_after,
                best_move: before.best_move,
            });

            tracing::debug!(
                ply,
                san = %analysis.san,
                cp_loss = analysis.centipawn_loss,
                classification = %analysis.classification,
                "Move analyzed"
            );
            analyses.push(analysis);
            on_progress(i + 1, total);
        }

        tracing::info!(
            analyzed = analyses.len(),
            skipped = total - analyses.len(),
            "Game analysis complete"
        );
        Ok(analyses)
    }

    /// Analyze one move given the positions around it, at live depth.
    ///
    /// `fen_after` is evaluated as given; `mv` (SAN or UCI) only has to be
    /// legal in `fen_before`.
    pub async fn analyze_single_move(
        &self,
        mv: &str,
        fen_before: &str,
        fen_after: &str,
    ) -> Result<MoveAnalysis, AnalysisError> {
        let position = Position::from_fen(fen_before)?;
        let after = Position::from_fen(fen_after)?;
        let record = position
            .parse_move(mv)
            .ok()
            .and_then(|m| position.describe(m))
            .ok_or_else(|| PositionError::IllegalMove(mv.to_string()))?;

        let params = self.config.live_params();
        let before = self.evaluator.evaluate(fen_before, params).await?;
        let raw_after = self.evaluate_after(&after, fen_after, params).await?;

        Ok(build_analysis(AnalysisInput {
            san: record.san,
            uci: record.uci,
            ply: 1,
            move_number: u32::from(position.fullmove_number()),
            color: record.color,
            fen_before: fen_before.to_string(),
            fen_after: fen_after.to_string(),
            raw_before: before.score,
            raw_after,
            best_move: before.best_move,
        }))
    }

    /// Centipawn loss of the move leading from `fen_before` to `fen_after`.
    pub async fn centipawn_loss_between(
        &self,
        fen_before: &str,
        fen_after: &str,
        params: EvalParams,
    ) -> Result<i32, AnalysisError> {
        let after = Position::from_fen(fen_after)?;
        let before = self.evaluator.evaluate(fen_before, params).await?;
        let raw_after = self.evaluate_after(&after, fen_after, params).await?;
        Ok(score_move(before.score, raw_after).0)
    }

    /// Score of the position after a move, relative to its side to move.
    /// Finished games are scored from the rules alone.
    async fn evaluate_after(
        &self,
        position: &Position,
        fen: &str,
        params: EvalParams,
    ) -> Result<i32, AnalysisError> {
        match position.status() {
            GameStatus::Checkmate => Ok(-MATE_SCORE),
            GameStatus::Stalemate | GameStatus::Draw(_) => Ok(0),
            GameStatus::Ongoing => Ok(self.evaluator.evaluate(fen, params).await?.score),
        }
    }
}

struct AnalysisInput {
    san: String,
    uci: String,
    ply: u32,
    move_number: u32,
    color: PieceColor,
    fen_before: String,
    fen_after: String,
    raw_before: i32,
    raw_after: i32,
    best_move: Option<String>,
}

fn build_analysis(input: AnalysisInput) -> MoveAnalysis {
    let (centipawn_loss, improvement) = score_move(input.raw_before, input.raw_after);
    let classification = MoveClassification::classify(centipawn_loss, improvement);
    let sign = input.color.sign();

    MoveAnalysis {
        san: input.san,
        uci: input.uci,
        ply: input.ply,
        move_number: input.move_number,
        color: input.color,
        fen_before: input.fen_before,
        fen_after: input.fen_after,
        eval_before: input.raw_before * sign,
        eval_after: -input.raw_after * sign,
        centipawn_loss,
        best_move: input.best_move,
        classification,
        is_brilliant: classification == MoveClassification::Brilliant,
        is_mistake: classification == MoveClassification::Mistake,
        is_blunder: classification == MoveClassification::Blunder,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine::EngineEvaluation;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Bare analysis carrying only a loss, for aggregate tests.
    pub(crate) fn analysis_with_loss(loss: i32) -> MoveAnalysis {
        build_analysis(AnalysisInput {
            san: "e4".into(),
            uci: "e2e4".into(),
            ply: 1,
            move_number: 1,
            color: PieceColor::White,
            fen_before: chess::START_FEN.into(),
            fen_after: String::new(),
            raw_before: 0,
            raw_after: loss,
            best_move: None,
        })
    }

    /// Answers from a FEN table, 0 for anything else, and records each call.
    #[derive(Default)]
    struct TableEvaluator {
        scores: HashMap<String, i32>,
        calls: Mutex<Vec<(String, u32)>>,
        fail: bool,
    }

    impl TableEvaluator {
        fn with(scores: &[(&str, i32)]) -> Self {
            Self {
                scores: scores
                    .iter()
                    .map(|(fen, score)| (fen.to_string(), *score))
                    .collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PositionEvaluator for TableEvaluator {
        async fn evaluate(
            &self,
            fen: &str,
            params: EvalParams,
        ) -> Result<EngineEvaluation, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((fen.to_string(), params.depth));
            if self.fail {
                return Err(GatewayError::Timeout);
            }
            Ok(EngineEvaluation {
                score: self.scores.get(fen).copied().unwrap_or(0),
                best_move: Some("e2e4".into()),
                depth: params.depth,
                ..Default::default()
            })
        }
    }

    fn fen_after(fen: &str, moves: &[&str]) -> String {
        let mut position = Position::from_fen(fen).unwrap();
        for mv in moves {
            position.play_str(mv).unwrap();
        }
        position.to_fen()
    }

    const SCHOLARS_MATE: [&str; 7] = ["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"];

    #[tokio::test]
    async fn test_analyzes_every_move_at_batch_depth() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&SCHOLARS_MATE, None).await.unwrap();

        assert_eq!(analyses.len(), 7);
        let sans: Vec<&str> = analyses.iter().map(|a| a.san.as_str()).collect();
        assert_eq!(sans, SCHOLARS_MATE);
        assert_eq!(analyses[1].color, PieceColor::Black);
        assert_eq!(analyses[1].move_number, 1);
        assert_eq!(analyses[2].move_number, 2);
        assert_eq!(analyses[6].ply, 7);

        // Seven positions before, six after; the mate is scored by the rules
        let calls = analyzer.evaluator().calls();
        assert_eq!(calls.len(), 13);
        assert!(calls.iter().all(|(_, depth)| *depth == DEFAULT_BATCH_DEPTH));
    }

    #[tokio::test]
    async fn test_mating_move_scores_as_mate() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&SCHOLARS_MATE, None).await.unwrap();
        let mate = &analyses[6];

        assert_eq!(mate.eval_after, MATE_SCORE);
        assert_eq!(mate.centipawn_loss, 0);
        assert_eq!(mate.classification, MoveClassification::Brilliant);
    }

    #[tokio::test]
    async fn test_stalemating_move_scores_zero() {
        let start = "7k/4Q3/8/6K1/8/8/8/8 w - - 0 1";
        let stalemate = fen_after(start, &["Qf7"]);
        let evaluator = TableEvaluator::with(&[(start, 900), (&stalemate, -900)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());

        let analyses = analyzer.analyze_game(&["Qf7"], Some(start)).await.unwrap();
        let analysis = &analyses[0];

        assert_eq!(analysis.eval_before, 900);
        assert_eq!(analysis.eval_after, 0);
        assert_eq!(analysis.centipawn_loss, 900);
        assert_eq!(analysis.classification, MoveClassification::Blunder);
        // Only the position before the move reaches the evaluator
        let calls = analyzer.evaluator().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, start);
    }

    #[tokio::test]
    async fn test_replaying_uci_reproduces_fen_after() {
        let analyzer = MoveAnalyzer::new(
            search::SearchEvaluator::new(1),
            AnalyzerConfig::default(),
        );
        let moves = ["e4", "d5", "exd5", "Qxd5", "Nc3", "Qa5", "d4", "c6", "O-O-O"];
        let analyses = analyzer.analyze_game(&moves, None).await.unwrap();

        // The illegal castle is skipped
        assert_eq!(analyses.len(), 8);
        for analysis in &analyses {
            let mut position = Position::from_fen(&analysis.fen_before).unwrap();
            position.play_str(&analysis.uci).unwrap();
            assert_eq!(position.to_fen(), analysis.fen_after, "{}", analysis.san);
        }
    }

    #[tokio::test]
    async fn test_loss_from_white_mover() {
        let start = chess::START_FEN;
        let after_e4 = fen_after(start, &["e4"]);
        // White +50 before; after e4 Black (to move) stands +200
        let evaluator = TableEvaluator::with(&[(start, 50), (after_e4.as_str(), 200)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&["e4"], None).await.unwrap();

        let a = &analyses[0];
        assert_eq!(a.centipawn_loss, 250);
        assert_eq!(a.classification, MoveClassification::Mistake);
        assert!(a.is_mistake);
        assert_eq!(a.eval_before, 50);
        assert_eq!(a.eval_after, -200);
        assert_eq!(a.best_move.as_deref(), Some("e2e4"));
    }

    #[tokio::test]
    async fn test_loss_from_black_mover() {
        let start = chess::START_FEN;
        let after_e4 = fen_after(start, &["e4"]);
        let after_e5 = fen_after(start, &["e4", "e5"]);
        // Black to move at +30 for Black, then White to move at +400 for White
        let evaluator =
            TableEvaluator::with(&[(after_e4.as_str(), 30), (after_e5.as_str(), 400)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&["e4", "e5"], None).await.unwrap();

        let black = &analyses[1];
        assert_eq!(black.color, PieceColor::Black);
        assert_eq!(black.centipawn_loss, 430);
        assert!(black.is_blunder);
        // Stored White-relative
        assert_eq!(black.eval_before, -30);
        assert_eq!(black.eval_after, 400);
    }

    #[tokio::test]
    async fn test_brilliant_when_mover_gains() {
        let start = chess::START_FEN;
        let after_e4 = fen_after(start, &["e4"]);
        let evaluator = TableEvaluator::with(&[(after_e4.as_str(), -150)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&["e4"], None).await.unwrap();

        assert_eq!(analyses[0].centipawn_loss, 0);
        assert!(analyses[0].is_brilliant);
    }

    #[tokio::test]
    async fn test_illegal_moves_are_skipped() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let mut progress = Vec::new();
        let analyses = analyzer
            .analyze_game_with_progress(&["e4", "e4", "zz9", "e5"], None, |done, total| {
                progress.push((done, total))
            })
            .await
            .unwrap();

        assert_eq!(analyses.len(), 2);
        assert_eq!(analyses[1].san, "e5");
        assert_eq!(analyses[1].ply, 4);
        assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        // Skipped moves cost no evaluations
        assert_eq!(analyzer.evaluator().calls().len(), 4);
    }

    #[tokio::test]
    async fn test_uci_moves_are_accepted() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let analyses = analyzer
            .analyze_game(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6", "e1g1"], None)
            .await
            .unwrap();
        let sans: Vec<&str> = analyses.iter().map(|a| a.san.as_str()).collect();
        assert_eq!(sans, ["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6", "O-O"]);
        assert_eq!(analyses[6].uci, "e1g1");
    }

    #[tokio::test]
    async fn test_custom_starting_position() {
        let fen = "4k3/8/8/8/8/8/4P3/4K3 b - - 3 40";
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let analyses = analyzer.analyze_game(&["Kd7", "e4"], Some(fen)).await.unwrap();

        assert_eq!(analyses[0].color, PieceColor::Black);
        assert_eq!(analyses[0].move_number, 40);
        assert_eq!(analyses[1].move_number, 41);
    }

    #[tokio::test]
    async fn test_invalid_starting_fen() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let err = analyzer
            .analyze_game(&["e4"], Some("garbage"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Position(_)));
    }

    #[tokio::test]
    async fn test_evaluator_failure_aborts() {
        let evaluator = TableEvaluator {
            fail: true,
            ..Default::default()
        };
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());
        let err = analyzer.analyze_game(&["e4", "e5"], None).await.unwrap_err();
        assert_eq!(err, AnalysisError::Evaluator(GatewayError::Timeout));
        assert_eq!(analyzer.evaluator().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_single_move_uses_live_depth() {
        let start = chess::START_FEN;
        let after = fen_after(start, &["Nf3"]);
        let evaluator = TableEvaluator::with(&[(start, 20), (after.as_str(), -5)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());

        let analysis = analyzer
            .analyze_single_move("Nf3", start, &after)
            .await
            .unwrap();
        assert_eq!(analysis.san, "Nf3");
        assert_eq!(analysis.uci, "g1f3");
        assert_eq!(analysis.centipawn_loss, 15);
        assert_eq!(analysis.classification, MoveClassification::Good);
        assert_eq!(analysis.move_number, 1);

        let calls = analyzer.evaluator().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(_, depth)| *depth == DEFAULT_LIVE_DEPTH));
    }

    #[tokio::test]
    async fn test_single_move_rejects_illegal_move() {
        let analyzer = MoveAnalyzer::new(TableEvaluator::default(), AnalyzerConfig::default());
        let err = analyzer
            .analyze_single_move("Ke2", chess::START_FEN, chess::START_FEN)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Position(PositionError::IllegalMove(_))
        ));
        assert!(analyzer.evaluator().calls().is_empty());
    }

    #[tokio::test]
    async fn test_centipawn_loss_between() {
        let start = chess::START_FEN;
        let after = fen_after(start, &["f3"]);
        let evaluator = TableEvaluator::with(&[(start, 30), (after.as_str(), 40)]);
        let analyzer = MoveAnalyzer::new(evaluator, AnalyzerConfig::default());
        let loss = analyzer
            .centipawn_loss_between(start, &after, EvalParams::depth(8))
            .await
            .unwrap();
        assert_eq!(loss, 70);
    }

    #[test]
    fn test_score_move_is_mover_relative() {
        assert_eq!(score_move(50, 200), (250, -250));
        assert_eq!(score_move(0, -150), (0, 150));
        assert_eq!(score_move(-100, 100), (0, 0));
    }
}
