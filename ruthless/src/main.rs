//! Ruthless CLI - move search, engine evaluation and game analysis.
//!
//! Every subcommand prints its result as pretty JSON on stdout; logs go to
//! stderr and are filtered through `RUST_LOG` (default `info`). See
//! [`config`] for the `RUTHLESS_*` environment overrides.

use std::time::Duration;

use analysis::{
    detect_opening, match_opening, update_rating, AnalyzerConfig, GameAnalyticsSummary,
    GameOutcome, MoveAnalyzer,
};
use anyhow::{bail, Context};
use chess::{MoveRecord, Position};
use clap::{Parser, Subcommand};
use engine::{EngineGateway, EvalParams, PositionEvaluator, StockfishConnector};
use search::{Opponent, OpponentConfig, SearchEvaluator};
use serde_json::json;

mod config;

#[derive(Parser)]
#[command(name = "ruthless", about = "Chess move search and game analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick a move with the in-house search.
    Move {
        #[arg(long)]
        fen: String,
        /// Search depth in plies.
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Evaluate a position.
    Evaluate {
        #[arg(long)]
        fen: String,
        #[arg(long, default_value_t = engine::DEFAULT_DEPTH)]
        depth: u32,
        /// Time budget before the request is abandoned.
        #[arg(long)]
        time_ms: Option<u64>,
        /// Use the in-house search instead of Stockfish.
        #[arg(long = "static")]
        use_static: bool,
    },
    /// Grade every move of a game.
    Analyze {
        /// Starting position, the standard start when omitted.
        #[arg(long)]
        fen: Option<String>,
        #[arg(long)]
        depth: Option<u32>,
        /// Use the in-house search instead of Stockfish.
        #[arg(long = "static")]
        use_static: bool,
        /// Moves in SAN or UCI.
        #[arg(required = true)]
        moves: Vec<String>,
    },
    /// Name the opening of a SAN move sequence.
    Opening {
        moves: Vec<String>,
    },
    /// Compute an Elo update.
    Rating {
        #[arg(long)]
        current: i32,
        #[arg(long)]
        opponent: i32,
        /// win, draw or loss
        #[arg(long)]
        result: GameOutcome,
        /// Games played before this one.
        #[arg(long, default_value_t = 0)]
        games: u32,
    },
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn move_json(record: &MoveRecord) -> serde_json::Value {
    json!({
        "san": record.san,
        "uci": record.uci,
        "piece": record.piece,
        "color": record.color,
        "captured": record.captured,
        "check": record.flags.check,
        "checkmate": record.flags.checkmate,
    })
}

fn spawn_gateway() -> EngineGateway {
    let connector = StockfishConnector::new(config::engine_config());
    EngineGateway::spawn(connector, config::gateway_config())
}

async fn choose_move(fen: &str, depth: Option<u32>) -> anyhow::Result<()> {
    let position = Position::from_fen(fen).context("invalid --fen")?;
    let depth = depth.unwrap_or_else(config::get_search_depth);
    let opponent = Opponent::new(OpponentConfig { depth });

    let chosen = opponent.choose_move_async(position.clone()).await;
    let status = position.status();
    print_json(&json!({
        "fen": position.to_fen(),
        "depth": depth,
        "status": format!("{status:?}"),
        "move": chosen.as_ref().map(move_json),
    }))
}

async fn evaluate(fen: &str, params: EvalParams, use_static: bool) -> anyhow::Result<()> {
    let evaluation = if use_static {
        SearchEvaluator::new(config::get_search_depth())
            .evaluate(fen, params)
            .await?
    } else {
        let gateway = spawn_gateway();
        let result = gateway.evaluate(fen, params).await;
        gateway.shutdown().await;
        result?
    };
    print_json(&evaluation)
}

async fn analyze_with<E: PositionEvaluator>(
    evaluator: E,
    config: AnalyzerConfig,
    moves: &[String],
    fen: Option<&str>,
) -> anyhow::Result<serde_json::Value> {
    let analyzer = MoveAnalyzer::new(evaluator, config);
    let analyses = analyzer
        .analyze_game_with_progress(moves, fen, |done, total| {
            tracing::info!("Analyzed move {}/{}", done, total);
        })
        .await?;
    let summary = GameAnalyticsSummary::from_analyses(&analyses);

    // Catalogue lines start from the standard position
    let sans: Vec<&str> = analyses.iter().map(|a| a.san.as_str()).collect();
    let opening = if fen.is_none() {
        match_opening(&sans)
    } else {
        None
    };

    Ok(json!({
        "moves": analyses,
        "summary": summary,
        "opening": opening,
    }))
}

async fn analyze(
    moves: &[String],
    fen: Option<&str>,
    depth: Option<u32>,
    use_static: bool,
) -> anyhow::Result<()> {
    let mut config = AnalyzerConfig::default();
    if let Some(depth) = depth {
        config.batch_depth = depth;
    }

    let report = if use_static {
        let evaluator = SearchEvaluator::new(config::get_search_depth());
        analyze_with(evaluator, config, moves, fen).await?
    } else {
        let gateway = spawn_gateway();
        gateway
            .initialize()
            .await
            .context("failed to start Stockfish (try --static)")?;
        let result = analyze_with(gateway.clone(), config, moves, fen).await;
        gateway.shutdown().await;
        result?
    };
    print_json(&report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Move { fen, depth } => choose_move(&fen, depth).await,
        Commands::Evaluate {
            fen,
            depth,
            time_ms,
            use_static,
        } => {
            let mut params = EvalParams::depth(depth);
            if let Some(ms) = time_ms {
                params = params.with_time_limit(Duration::from_millis(ms));
            }
            evaluate(&fen, params, use_static).await
        }
        Commands::Analyze {
            fen,
            depth,
            use_static,
            moves,
        } => analyze(&moves, fen.as_deref(), depth, use_static).await,
        Commands::Opening { moves } => {
            let opening = detect_opening(&moves);
            print_json(&json!({
                "opening": opening,
                "display_name": opening.map(|o| o.display_name()),
            }))
        }
        Commands::Rating {
            current,
            opponent,
            result,
            games,
        } => {
            if current <= 0 || opponent <= 0 {
                bail!("ratings must be positive");
            }
            let rating = update_rating(current, opponent, result, games);
            print_json(&json!({
                "before": current,
                "after": rating,
                "change": rating - current,
            }))
        }
    }
}
