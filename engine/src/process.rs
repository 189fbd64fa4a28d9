use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::connector::{Connector, EngineChannel};
use crate::uci::UciError;
use crate::GatewayError;

const CHANNEL_CAPACITY: usize = 256;

/// Configuration for the Stockfish process and its UCI options.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Executable to run; discovered in the usual locations when unset.
    pub path: Option<PathBuf>,
    pub skill_level: Option<u8>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

impl EngineConfig {
    /// `setoption` lines for the configured options, clamped to sane ranges.
    pub fn setoption_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(level) = self.skill_level {
            lines.push(format!("setoption name Skill Level value {}", level.min(20)));
        }
        if let Some(threads) = self.threads {
            lines.push(format!(
                "setoption name Threads value {}",
                threads.clamp(1, 16)
            ));
        }
        if let Some(hash_mb) = self.hash_mb {
            lines.push(format!(
                "setoption name Hash value {}",
                hash_mb.clamp(1, 2048)
            ));
        }
        lines
    }
}

/// Connects to a Stockfish child process over stdin/stdout.
#[derive(Debug, Clone, Default)]
pub struct StockfishConnector {
    config: EngineConfig,
}

impl StockfishConnector {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Configured path, or a search of the usual install locations. The
    /// search blocks on child processes and runs on the blocking pool.
    async fn resolve_path(&self) -> Result<PathBuf, UciError> {
        if let Some(path) = &self.config.path {
            return Ok(path.clone());
        }
        tokio::task::spawn_blocking(find_stockfish_path)
            .await
            .map_err(|e| {
                tracing::error!("Engine lookup task failed: {}", e);
                UciError::NotFound
            })?
            .ok_or(UciError::NotFound)
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn spawn_process(&self) -> Result<EngineChannel, UciError> {
        let path = self.resolve_path().await?;
        tracing::info!(path = %path.display(), "Spawning engine process");

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = process.stdin.take().ok_or(UciError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(UciError::NoStdout)?;

        let (line_tx, line_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (command_tx, mut command_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Engine stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);
                        if line_tx.send(trimmed.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from engine stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Output reader task exiting");
        });

        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                tracing::trace!("UCI >> {}", cmd);
                let written = async {
                    stdin.write_all(cmd.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::error!("Failed to write to engine stdin: {}", e);
                    break;
                }
            }
            tracing::debug!("Stdin writer task exiting");
        });

        Ok(EngineChannel {
            commands: command_tx,
            lines: line_rx,
            child: Some(process),
        })
    }
}

#[async_trait]
impl Connector for StockfishConnector {
    async fn connect(&self) -> Result<EngineChannel, GatewayError> {
        self.spawn_process().await.map_err(|e| {
            tracing::error!("Failed to start engine: {}", e);
            GatewayError::Connect(e.to_string())
        })
    }

    fn setoptions(&self) -> Vec<String> {
        self.config.setoption_lines()
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
        "stockfish", // In PATH
    ];

    for path_str in paths {
        let path = Path::new(path_str);
        if path.exists() || path_str == "stockfish" {
            // Try to verify it's actually runnable
            if std::process::Command::new(path_str)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .arg("quit")
                .status()
                .is_ok()
            {
                return Some(PathBuf::from(path_str));
            }
        }
    }

    None
}
