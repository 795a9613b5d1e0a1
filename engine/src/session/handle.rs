use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::commands::{SessionCommand, SessionError};

/// Handle to a started session: the actor's command channel plus the two
/// tasks it owns.
pub(crate) struct RunningSession {
    cmd_tx: mpsc::Sender<SessionCommand>,
    stop_tx: watch::Sender<bool>,
    actor: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl RunningSession {
    pub(crate) fn new(
        cmd_tx: mpsc::Sender<SessionCommand>,
        stop_tx: watch::Sender<bool>,
        actor: JoinHandle<()>,
        reader: JoinHandle<()>,
    ) -> Self {
        Self {
            cmd_tx,
            stop_tx,
            actor,
            reader,
        }
    }

    pub(crate) async fn send(&self, command: String) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Send { command, reply: tx })
            .await
            .map_err(|_| SessionError::ActorClosed)?;
        rx.await.map_err(|_| SessionError::ActorClosed)?
    }

    /// Tear down the actor and reader, forcing either one that outlives
    /// `grace`.
    pub(crate) async fn shutdown(self, grace: Duration) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SessionCommand::Shutdown { reply: tx })
            .await
            .is_ok()
        {
            // The actor waits up to `grace` for the engine itself.
            if tokio::time::timeout(grace * 2, rx).await.is_err() {
                tracing::warn!("Session actor did not acknowledge shutdown");
            }
        }

        let _ = self.stop_tx.send(true);
        join_or_abort("output reader", self.reader, grace).await;
        join_or_abort("session actor", self.actor, grace).await;
    }
}

async fn join_or_abort(name: &str, mut task: JoinHandle<()>, grace: Duration) {
    match tokio::time::timeout(grace, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("{} task failed: {}", name, e),
        Err(_) => {
            tracing::warn!("{} did not stop within {:?}, aborting", name, grace);
            task.abort();
        }
    }
}
