use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::GatewayError;

/// How long a child gets to exit after `quit` before it is killed.
const QUIT_GRACE: Duration = Duration::from_secs(1);

/// Opens a line-oriented UCI channel to an engine.
///
/// The gateway calls `connect` lazily and again after every teardown.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<EngineChannel, GatewayError>;

    /// `setoption` lines sent once the engine has answered `uciok`.
    fn setoptions(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Both directions of an engine connection, one line per message.
///
/// Dropping `commands` or closing `lines` is how either side signals that
/// the channel is gone.
pub struct EngineChannel {
    pub commands: mpsc::Sender<String>,
    pub lines: mpsc::Receiver<String>,
    pub child: Option<Child>,
}

impl EngineChannel {
    /// Send `quit`, give the child a moment to exit, then kill it.
    pub async fn close(self) {
        let Self {
            commands, child, ..
        } = self;
        let _ = commands.send("quit".to_string()).await;
        drop(commands);

        if let Some(mut child) = child {
            let _ = tokio::time::timeout(QUIT_GRACE, child.wait()).await;
            let _ = child.kill().await;
        }
    }
}
