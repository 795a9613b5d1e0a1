pub(crate) mod actor;
pub mod commands;
pub(crate) mod handle;
pub(crate) mod state;

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use crate::config::SessionConfig;
use crate::process::{EngineIo, EngineSpawner};
use crate::sink::EventSink;
use actor::{run_output_reader, run_session_actor};
pub use commands::{AnalysisOptions, SessionError};
use handle::RunningSession;
use state::SessionState;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Default think time for [`AnalysisSession::computer_move`].
pub const DEFAULT_MOVETIME_MS: u64 = 1000;
/// Default depth limit for [`AnalysisSession::computer_move`].
pub const DEFAULT_MOVE_DEPTH: u32 = 15;

/// Controller for one engine process and its analysis pipeline.
///
/// Methods take `&self`, so a session can be shared behind an `Arc` and shut
/// down from a different task than the one that started it.
pub struct AnalysisSession<S: EngineSpawner> {
    spawner: S,
    sink: Arc<dyn EventSink>,
    config: SessionConfig,
    running: Mutex<Option<RunningSession>>,
}

impl<S: EngineSpawner> AnalysisSession<S> {
    pub fn new(spawner: S, sink: impl EventSink, config: SessionConfig) -> Self {
        Self {
            spawner,
            sink: Arc::new(sink),
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Launch the engine and the session tasks. No-op when already started.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            tracing::debug!("Session already started");
            return Ok(());
        }

        let EngineIo { reader, writer } = self.spawner.spawn().await?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (chunk_tx, chunk_rx) = mpsc::channel(self.config.chunk_capacity.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);

        let state = SessionState::new(&self.config, Arc::clone(&self.sink));
        let actor = tokio::spawn(run_session_actor(
            state,
            writer,
            cmd_rx,
            chunk_rx,
            self.config.shutdown_grace,
        ));
        let reader = tokio::spawn(run_output_reader(reader, chunk_tx, stop_rx));

        *running = Some(RunningSession::new(cmd_tx, stop_tx, actor, reader));
        tracing::info!("Analysis session started");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Forward a UCI command to the engine, applying position and stop
    /// resets first.
    pub async fn send_command(&self, command: &str) -> Result<(), SessionError> {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(session) => session.send(command.to_string()).await,
            None => Err(SessionError::NotRunning),
        }
    }

    /// Quit the engine and stop the session tasks. Safe to call repeatedly.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn shutdown(&self) {
        let Some(session) = self.running.lock().await.take() else {
            tracing::debug!("Session not running, nothing to shut down");
            return;
        };
        session.shutdown(self.config.shutdown_grace).await;
        tracing::info!("Analysis session shut down");
    }

    /// Analyze `fen` with the given limits and number of lines.
    pub async fn analyze_position(
        &self,
        fen: &str,
        options: &AnalysisOptions,
    ) -> Result<(), SessionError> {
        tracing::info!(
            "Analyzing position (multi_pv={}, depth={:?})",
            options.multi_pv,
            options.depth
        );
        self.send_command("uci").await?;
        self.send_command("isready").await?;
        self.send_command("ucinewgame").await?;
        self.send_command(&format!("setoption name MultiPV value {}", options.multi_pv))
            .await?;
        self.send_command(&format!("position fen {}", fen)).await?;
        self.send_command(&options.go_command()).await
    }

    pub async fn stop_analysis(&self) -> Result<(), SessionError> {
        self.send_command("stop").await
    }

    /// Ask the engine to pick a move for `fen`. The answer arrives as a
    /// bestmove event.
    pub async fn computer_move(
        &self,
        fen: &str,
        movetime_ms: u64,
        depth: u32,
    ) -> Result<(), SessionError> {
        self.send_command("uci").await?;
        self.send_command("isready").await?;
        self.send_command(&format!("position fen {}", fen)).await?;
        self.send_command(&format!("go movetime {} depth {}", movetime_ms, depth))
            .await
    }
}
