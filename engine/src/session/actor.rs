use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::Instrument;

use super::commands::{CommandKind, SessionCommand, SessionError};
use super::state::SessionState;
use crate::process::{ChunkReader, LineWriter};

/// The main session actor loop.
/// Owns all pipeline state and the engine's write half. Processes commands,
/// engine output and the coalescing timer sequentially.
pub(crate) async fn run_session_actor(
    state: SessionState,
    writer: Box<dyn LineWriter>,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    chunk_rx: mpsc::Receiver<String>,
    grace: Duration,
) {
    run_session_actor_inner(state, writer, cmd_rx, chunk_rx, grace)
        .instrument(tracing::info_span!("analysis_session"))
        .await;
}

async fn run_session_actor_inner(
    mut state: SessionState,
    mut writer: Box<dyn LineWriter>,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut chunk_rx: mpsc::Receiver<String>,
    grace: Duration,
) {
    tracing::info!("Session actor started");
    let mut output_open = true;

    loop {
        let deadline = state.coalescer_deadline();

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Send { command, reply }) => {
                        let result =
                            handle_command(&mut state, writer.as_mut(), &mut chunk_rx, &command).await;
                        let _ = reply.send(result);
                    }
                    Some(SessionCommand::Shutdown { reply }) => {
                        tracing::info!("Session actor shutting down");
                        teardown(&mut state, writer.as_mut(), grace).await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::info!("Session handle dropped, shutting down");
                        teardown(&mut state, writer.as_mut(), grace).await;
                        break;
                    }
                }
            }

            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                state.flush_window();
            }

            chunk = chunk_rx.recv(), if output_open => {
                match chunk {
                    Some(chunk) => state.process_chunk(&chunk),
                    None => {
                        tracing::warn!("Engine output closed");
                        output_open = false;
                    }
                }
            }
        }
    }

    tracing::info!("Session actor exited");
}

/// Apply a command's state resets, then forward it to the engine.
async fn handle_command(
    state: &mut SessionState,
    writer: &mut dyn LineWriter,
    chunk_rx: &mut mpsc::Receiver<String>,
    command: &str,
) -> Result<(), SessionError> {
    match CommandKind::classify(command) {
        CommandKind::Position => {
            tracing::info!("Setting position: {}", command.trim());
            state.set_position(command);
        }
        CommandKind::Stop => {
            let mut dropped = 0;
            while chunk_rx.try_recv().is_ok() {
                dropped += 1;
            }
            tracing::info!("Stopping analysis, discarded {} unparsed chunks", dropped);
            state.discard_analysis();
        }
        CommandKind::Go => {
            tracing::info!("Starting engine calculation: {}", command.trim());
            state.begin_search();
        }
        CommandKind::Other => {
            tracing::debug!("Forwarding command: {}", command.trim());
        }
    }

    writer.write_line(command).await.map_err(|e| {
        tracing::error!("Failed to send command to engine: {}", e);
        SessionError::Engine(e)
    })
}

async fn teardown(state: &mut SessionState, writer: &mut dyn LineWriter, grace: Duration) {
    if let Err(e) = writer.write_line("quit").await {
        tracing::warn!("Failed to send quit to engine: {}", e);
    }
    state.clear();
    writer.close(grace).await;
}

/// Pull output from the engine until it closes or the session stops.
pub(crate) async fn run_output_reader(
    mut reader: Box<dyn ChunkReader>,
    chunk_tx: mpsc::Sender<String>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            _ = stop_rx.changed() => {
                tracing::debug!("Output reader stopped");
                break;
            }

            result = reader.read_chunk() => {
                match result {
                    Ok(Some(chunk)) => {
                        if chunk_tx.send(chunk).await.is_err() {
                            tracing::debug!("Session gone, output reader exiting");
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Error reading engine output: {}", e);
                        break;
                    }
                }
            }
        }
    }
    tracing::info!("Output reader task exiting");
}
