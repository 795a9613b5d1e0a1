use anyhow::Context;
use engine_bridge::{AnalysisEvent, EmittedEvent};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Print each event as one JSON line until the channel closes, or until the
/// first bestmove when `until_best_move` is set.
pub async fn print_events<W>(
    mut rx: mpsc::UnboundedReceiver<EmittedEvent>,
    out: &mut W,
    until_best_move: bool,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        let mut line = serde_json::to_string(&event).context("failed to serialize event")?;
        line.push('\n');
        out.write_all(line.as_bytes())
            .await
            .context("failed to write event")?;
        out.flush().await?;

        if until_best_move && event.analysis().is_some_and(AnalysisEvent::is_best_move) {
            tracing::debug!("Best move printed, output done");
            break;
        }
    }
    Ok(())
}
