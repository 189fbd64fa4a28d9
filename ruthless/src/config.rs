//! Runtime tunables for the CLI.
//!
//! Every value has a compile-time default and can be overridden through a
//! `RUTHLESS_*` environment variable. Values that fail to parse fall back to
//! the default.

use std::path::PathBuf;
use std::time::Duration;

use engine::gateway::DEFAULT_INIT_TIMEOUT;
use engine::{EngineConfig, GatewayConfig};
use search::DEFAULT_OPPONENT_DEPTH;

pub const STOCKFISH_PATH_VAR: &str = "RUTHLESS_STOCKFISH_PATH";
pub const ENGINE_THREADS_VAR: &str = "RUTHLESS_ENGINE_THREADS";
pub const ENGINE_HASH_MB_VAR: &str = "RUTHLESS_ENGINE_HASH_MB";
pub const INIT_TIMEOUT_SECS_VAR: &str = "RUTHLESS_INIT_TIMEOUT_SECS";
pub const SEARCH_DEPTH_VAR: &str = "RUTHLESS_SEARCH_DEPTH";

/// Threads given to the engine when not configured.
const DEFAULT_ENGINE_THREADS: u32 = 1;

/// Hash table size in MB when not configured.
const DEFAULT_ENGINE_HASH_MB: u32 = 64;

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

/// Stockfish executable, or `None` to search the usual install locations.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var_os(STOCKFISH_PATH_VAR).map(PathBuf::from)
}

pub fn get_engine_threads() -> u32 {
    env_parse(ENGINE_THREADS_VAR).unwrap_or(DEFAULT_ENGINE_THREADS)
}

pub fn get_engine_hash_mb() -> u32 {
    env_parse(ENGINE_HASH_MB_VAR).unwrap_or(DEFAULT_ENGINE_HASH_MB)
}

pub fn get_init_timeout() -> Duration {
    env_parse(INIT_TIMEOUT_SECS_VAR)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_INIT_TIMEOUT)
}

/// Depth of the in-house search used by `move` and `--static`.
pub fn get_search_depth() -> u32 {
    env_parse(SEARCH_DEPTH_VAR).unwrap_or(DEFAULT_OPPONENT_DEPTH)
}

pub fn engine_config() -> EngineConfig {
    EngineConfig {
        path: get_stockfish_path(),
        skill_level: None,
        threads: Some(get_engine_threads()),
        hash_mb: Some(get_engine_hash_mb()),
    }
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        init_timeout: get_init_timeout(),
        ..Default::default()
    }
}
