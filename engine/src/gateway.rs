//! Single-flight dispatcher in front of one UCI engine.
//!
//! [`EngineGateway`] is a cheap, cloneable handle to an actor task that owns
//! the engine channel, a FIFO queue of requests, and the one request in
//! flight. Requests complete in submission order and never see each other's
//! output; a request that times out is abandoned and its late reply drained
//! before the next one is dispatched.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::Instrument;

use crate::connector::{Connector, EngineChannel};
use crate::uci::parser::is_bestmove;
use crate::uci::{parse_uci_message, Accumulator, UciMessage};
use crate::{EngineEvaluation, EvalParams, PositionEvaluator};

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_secs(2);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long to wait for `uciok` after connecting.
    pub init_timeout: Duration,
    /// Added to each request's time limit before it is abandoned.
    pub timeout_grace: Duration,
    /// How long an abandoned request may take to send its `bestmove`.
    pub drain_timeout: Duration,
    pub command_buffer: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            init_timeout: DEFAULT_INIT_TIMEOUT,
            timeout_grace: DEFAULT_TIMEOUT_GRACE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            command_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Uninitialized,
    Initializing,
    Ready,
    Busy,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to connect to engine: {0}")]
    Connect(String),
    #[error("Engine did not answer uciok in time")]
    InitTimeout,
    #[error("Engine channel closed")]
    ChannelClosed,
    #[error("Engine request timed out")]
    Timeout,
    #[error("Engine terminated")]
    Terminated,
    #[error("Engine gateway has shut down")]
    Shutdown,
    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

type Reply<T> = oneshot::Sender<Result<T, GatewayError>>;

enum GatewayCommand {
    Initialize { reply: Reply<()> },
    Submit(PendingTask),
    Terminate { reply: oneshot::Sender<()> },
    State { reply: oneshot::Sender<GatewayState> },
    Shutdown,
}

/// A queued request and the caller waiting for it.
enum PendingTask {
    Evaluate {
        fen: String,
        params: EvalParams,
        reply: Reply<EngineEvaluation>,
    },
    BestMove {
        fen: String,
        params: EvalParams,
        reply: Reply<Option<String>>,
    },
}

impl PendingTask {
    fn fen(&self) -> &str {
        match self {
            Self::Evaluate { fen, .. } | Self::BestMove { fen, .. } => fen,
        }
    }

    fn params(&self) -> EvalParams {
        match self {
            Self::Evaluate { params, .. } | Self::BestMove { params, .. } => *params,
        }
    }

    fn complete(self, evaluation: EngineEvaluation) {
        // A caller that gave up has dropped its receiver; nothing to do then
        match self {
            Self::Evaluate { reply, .. } => {
                let _ = reply.send(Ok(evaluation));
            }
            Self::BestMove { reply, .. } => {
                let _ = reply.send(Ok(evaluation.best_move));
            }
        }
    }

    fn reject(self, err: GatewayError) {
        match self {
            Self::Evaluate { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Self::BestMove { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

/// What the actor is waiting on.
enum Phase {
    Idle,
    Initializing {
        deadline: Instant,
        /// Whether the head of the queue caused this attempt.
        triggered_by_task: bool,
    },
    Running {
        task: PendingTask,
        acc: Accumulator,
        deadline: Instant,
    },
    /// A timed-out request is still running in the engine.
    Draining { deadline: Instant },
}

impl Phase {
    fn deadline(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::Initializing { deadline, .. }
            | Self::Running { deadline, .. }
            | Self::Draining { deadline } => Some(*deadline),
        }
    }
}

/// Cheap, cloneable handle to the gateway actor.
///
/// The actor stops on [`EngineGateway::shutdown`] or once every handle is
/// dropped.
#[derive(Clone)]
pub struct EngineGateway {
    cmd_tx: mpsc::Sender<GatewayCommand>,
}

impl EngineGateway {
    /// Start the actor. The engine itself is connected lazily.
    #[tracing::instrument(level = "info", skip(connector))]
    pub fn spawn<C: Connector>(connector: C, config: GatewayConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
        let actor = GatewayActor {
            connector,
            config,
            state: GatewayState::Uninitialized,
            link: None,
            queue: VecDeque::new(),
            phase: Phase::Idle,
            init_waiters: Vec::new(),
        };
        tokio::spawn(
            actor
                .run(cmd_rx)
                .instrument(tracing::info_span!("engine_gateway")),
        );
        Self { cmd_tx }
    }

    /// Connect and handshake now instead of on the first request.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn initialize(&self) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayCommand::Initialize { reply: tx }).await?;
        rx.await.map_err(|_| GatewayError::Shutdown)?
    }

    pub async fn evaluate(
        &self,
        fen: impl Into<String>,
        params: EvalParams,
    ) -> Result<EngineEvaluation, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayCommand::Submit(PendingTask::Evaluate {
            fen: fen.into(),
            params,
            reply: tx,
        }))
        .await?;
        rx.await.map_err(|_| GatewayError::Shutdown)?
    }

    /// Best move in UCI notation, `None` if the side to move has no move.
    pub async fn best_move(
        &self,
        fen: impl Into<String>,
        params: EvalParams,
    ) -> Result<Option<String>, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayCommand::Submit(PendingTask::BestMove {
            fen: fen.into(),
            params,
            reply: tx,
        }))
        .await?;
        rx.await.map_err(|_| GatewayError::Shutdown)?
    }

    /// Reject everything pending and stop the engine. The next request
    /// starts a fresh one.
    pub async fn terminate(&self) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send(GatewayCommand::Terminate { reply: tx }).await?;
        rx.await.map_err(|_| GatewayError::Shutdown)
    }

    pub async fn state(&self) -> GatewayState {
        let (tx, rx) = oneshot::channel();
        if self.send(GatewayCommand::State { reply: tx }).await.is_err() {
            return GatewayState::Terminated;
        }
        rx.await.unwrap_or(GatewayState::Terminated)
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(GatewayCommand::Shutdown).await;
    }

    async fn send(&self, cmd: GatewayCommand) -> Result<(), GatewayError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| GatewayError::Shutdown)
    }
}

#[async_trait]
impl PositionEvaluator for EngineGateway {
    async fn evaluate(
        &self,
        fen: &str,
        params: EvalParams,
    ) -> Result<EngineEvaluation, GatewayError> {
        EngineGateway::evaluate(self, fen, params).await
    }
}

struct GatewayActor<C> {
    connector: C,
    config: GatewayConfig,
    state: GatewayState,
    link: Option<EngineChannel>,
    queue: VecDeque<PendingTask>,
    phase: Phase,
    init_waiters: Vec<Reply<()>>,
}

impl<C: Connector> GatewayActor<C> {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<GatewayCommand>) {
        tracing::info!("Engine gateway started");

        loop {
            let deadline = self.phase.deadline();
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(GatewayCommand::Shutdown) | None => {
                            tracing::info!("Engine gateway shutting down");
                            self.terminate().await;
                            break;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }

                line = next_line(&mut self.link) => {
                    self.handle_line(line).await;
                }

                () = sleep_until(deadline) => {
                    self.handle_deadline().await;
                }
            }
        }

        tracing::info!("Engine gateway exited");
    }

    async fn handle_command(&mut self, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::Initialize { reply } => match self.state {
                GatewayState::Ready | GatewayState::Busy => {
                    let _ = reply.send(Ok(()));
                }
                GatewayState::Initializing => self.init_waiters.push(reply),
                GatewayState::Uninitialized | GatewayState::Terminated => {
                    self.init_waiters.push(reply);
                    self.begin_init(false).await;
                }
            },
            GatewayCommand::Submit(task) => {
                tracing::debug!(fen = %task.fen(), queued = self.queue.len(), "Request queued");
                self.queue.push_back(task);
            }
            GatewayCommand::Terminate { reply } => {
                self.terminate().await;
                let _ = reply.send(());
            }
            GatewayCommand::State { reply } => {
                let _ = reply.send(self.state);
            }
            GatewayCommand::Shutdown => {}
        }
        self.advance().await;
    }

    /// `None` means the engine closed its output.
    async fn handle_line(&mut self, line: Option<String>) {
        let Some(line) = line else {
            tracing::warn!("Engine channel closed");
            self.channel_lost().await;
            self.advance().await;
            return;
        };

        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                tracing::trace!(line = %line, "Ignoring engine output with no request in flight");
            }
            Phase::Initializing {
                deadline,
                triggered_by_task,
            } => {
                if matches!(parse_uci_message(&line), Ok(UciMessage::UciOk)) {
                    self.finish_init(triggered_by_task).await;
                } else {
                    self.phase = Phase::Initializing {
                        deadline,
                        triggered_by_task,
                    };
                }
            }
            Phase::Running {
                task,
                mut acc,
                deadline,
            } => match acc.apply_line(&line) {
                Some(evaluation) => {
                    tracing::debug!(
                        fen = %task.fen(),
                        score = evaluation.score,
                        depth = evaluation.depth,
                        best_move = ?evaluation.best_move,
                        "Request complete"
                    );
                    task.complete(evaluation);
                    self.state = GatewayState::Ready;
                }
                None => {
                    self.phase = Phase::Running {
                        task,
                        acc,
                        deadline,
                    };
                }
            },
            Phase::Draining { deadline } => {
                if is_bestmove(&line) {
                    tracing::debug!("Drained abandoned request");
                    self.state = GatewayState::Ready;
                } else {
                    self.phase = Phase::Draining { deadline };
                }
            }
        }

        self.advance().await;
    }

    async fn handle_deadline(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {}
            Phase::Initializing {
                triggered_by_task, ..
            } => {
                tracing::warn!(timeout = ?self.config.init_timeout, "Timed out waiting for uciok");
                self.fail_init(GatewayError::InitTimeout, triggered_by_task)
                    .await;
            }
            Phase::Running { task, .. } => {
                tracing::warn!(fen = %task.fen(), "Request timed out, stopping search");
                task.reject(GatewayError::Timeout);
                if self.send_line("stop").await.is_err() {
                    self.channel_lost().await;
                } else {
                    self.phase = Phase::Draining {
                        deadline: Instant::now() + self.config.drain_timeout,
                    };
                }
            }
            Phase::Draining { .. } => {
                tracing::warn!("Abandoned request never finished, restarting engine");
                self.teardown().await;
                self.state = GatewayState::Uninitialized;
            }
        }

        self.advance().await;
    }

    /// Start the next queued request if nothing is in flight.
    async fn advance(&mut self) {
        while matches!(self.phase, Phase::Idle) && !self.queue.is_empty() {
            if self.link.is_none() {
                // On failure this rejects the head, so the loop terminates
                self.begin_init(true).await;
                continue;
            }
            if let Some(task) = self.queue.pop_front() {
                self.dispatch(task).await;
            }
        }
    }

    async fn dispatch(&mut self, task: PendingTask) {
        let params = task.params();
        tracing::debug!(fen = %task.fen(), depth = params.depth, "Dispatching request");

        let position = format!("position fen {}", task.fen());
        let go = format!("go depth {}", params.depth);
        let sent = match self.send_line(&position).await {
            Ok(()) => self.send_line(&go).await,
            Err(err) => Err(err),
        };

        if let Err(err) = sent {
            tracing::warn!("Failed to send request to engine");
            task.reject(err);
            self.teardown().await;
            self.state = GatewayState::Uninitialized;
            return;
        }

        self.state = GatewayState::Busy;
        self.phase = Phase::Running {
            task,
            acc: Accumulator::default(),
            deadline: Instant::now() + params.time_limit + self.config.timeout_grace,
        };
    }

    async fn begin_init(&mut self, triggered_by_task: bool) {
        tracing::info!("Connecting to engine");
        self.state = GatewayState::Initializing;

        let link = match self.connector.connect().await {
            Ok(link) => link,
            Err(err) => {
                self.fail_init(err, triggered_by_task).await;
                return;
            }
        };
        self.link = Some(link);

        if let Err(err) = self.send_line("uci").await {
            self.fail_init(err, triggered_by_task).await;
            return;
        }
        self.phase = Phase::Initializing {
            deadline: Instant::now() + self.config.init_timeout,
            triggered_by_task,
        };
    }

    async fn finish_init(&mut self, triggered_by_task: bool) {
        for option in self.connector.setoptions() {
            tracing::info!(option = %option, "Setting engine option");
            if let Err(err) = self.send_line(&option).await {
                self.fail_init(err, triggered_by_task).await;
                return;
            }
        }

        tracing::info!("Engine ready");
        self.state = GatewayState::Ready;
        for waiter in self.init_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
    }

    /// Back to `Uninitialized`; only the request that caused the attempt is
    /// rejected, the rest of the queue stays.
    async fn fail_init(&mut self, err: GatewayError, triggered_by_task: bool) {
        tracing::warn!(error = %err, "Engine initialization failed");
        self.teardown().await;
        self.state = GatewayState::Uninitialized;
        self.phase = Phase::Idle;

        for waiter in self.init_waiters.drain(..) {
            let _ = waiter.send(Err(err.clone()));
        }
        if triggered_by_task {
            if let Some(task) = self.queue.pop_front() {
                task.reject(err);
            }
        }
    }

    async fn channel_lost(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Running { task, .. } => task.reject(GatewayError::ChannelClosed),
            Phase::Initializing {
                triggered_by_task, ..
            } => {
                self.fail_init(GatewayError::ChannelClosed, triggered_by_task)
                    .await;
                return;
            }
            Phase::Idle | Phase::Draining { .. } => {}
        }
        self.teardown().await;
        self.state = GatewayState::Uninitialized;
    }

    async fn terminate(&mut self) {
        let pending = self.queue.len()
            + usize::from(matches!(self.phase, Phase::Running { .. }));
        tracing::info!(pending, "Terminating engine");

        if let Phase::Running { task, .. } = std::mem::replace(&mut self.phase, Phase::Idle) {
            task.reject(GatewayError::Terminated);
        }
        for task in self.queue.drain(..) {
            task.reject(GatewayError::Terminated);
        }
        for waiter in self.init_waiters.drain(..) {
            let _ = waiter.send(Err(GatewayError::Terminated));
        }

        self.teardown().await;
        self.state = GatewayState::Terminated;
    }

    async fn teardown(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), GatewayError> {
        let link = self.link.as_ref().ok_or(GatewayError::ChannelClosed)?;
        tracing::trace!("UCI >> {}", line);
        link.commands
            .send(line.to_string())
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }
}

async fn next_line(link: &mut Option<EngineChannel>) -> Option<String> {
    match link.as_mut() {
        Some(link) => link.lines.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
