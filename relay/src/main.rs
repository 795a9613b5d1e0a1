//! Command-line relay for the engine bridge.
//!
//! Spawns a UCI engine, relays commands from stdin (or runs a one-shot
//! `analyze` / `move` request) and prints every emitted event as a JSON line
//! on stdout.

mod cli;
mod commands;
mod logging;
mod output;

use anyhow::Context;
use clap::Parser;
use engine_bridge::{AnalysisSession, EmittedEvent, StockfishSpawner};
use tokio::io::BufReader;
use tokio::sync::mpsc;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init(cli.log_dir.as_deref())?;

    tracing::info!("Engine relay starting up");

    let (event_tx, event_rx) = mpsc::unbounded_channel::<EmittedEvent>();
    let spawner = StockfishSpawner::new(cli.engine.stockfish_config());
    let session = AnalysisSession::new(spawner, event_tx, cli.session.session_config());
    session.start().await.context("failed to start engine")?;

    let one_shot = cli.command.is_some();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        output::print_events(event_rx, &mut stdout, one_shot).await
    });

    let result = tokio::select! {
        result = run(&session, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    };

    if one_shot && result.is_ok() {
        // Wait for the best move before tearing the engine down.
        tokio::select! {
            printed = printer => printed.context("output task failed")??,
            _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
        }
        session.shutdown().await;
    } else {
        session.shutdown().await;
        // The session owns the only sender; dropping it ends the printer.
        drop(session);
        printer.await.context("output task failed")??;
    }

    tracing::info!("Engine relay shutting down");
    result
}

async fn run(
    session: &AnalysisSession<StockfishSpawner>,
    command: Option<Command>,
) -> anyhow::Result<()> {
    match command {
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            commands::relay_commands(session, stdin).await
        }
        Some(Command::Analyze {
            fen,
            depth,
            multipv,
            movetime,
            nodes,
        }) => {
            let options = Command::analysis_options(depth, multipv, movetime, nodes);
            session
                .analyze_position(&fen, &options)
                .await
                .context("failed to start analysis")
        }
        Some(Command::Move {
            fen,
            movetime,
            depth,
        }) => session
            .computer_move(&fen, movetime, depth)
            .await
            .context("failed to request a move"),
    }
}
