use anyhow::Context;
use engine_bridge::{AnalysisSession, EngineSpawner, SessionError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Forward UCI commands line by line until end of input or `quit`.
///
/// A failed write is logged and the relay keeps going; the engine may still
/// accept later commands.
pub async fn relay_commands<S, R>(session: &AnalysisSession<S>, input: R) -> anyhow::Result<()>
where
    S: EngineSpawner,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let command = line.trim();
        if command.is_empty() {
            continue;
        }
        if command == "quit" {
            tracing::info!("Quit requested");
            break;
        }

        match session.send_command(command).await {
            Ok(()) => {}
            Err(SessionError::NotRunning) => {
                anyhow::bail!("engine session is not running");
            }
            Err(e) => tracing::error!("Command '{}' failed: {}", command, e),
        }
    }
    Ok(())
}
