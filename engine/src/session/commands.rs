use tokio::sync::oneshot;

use crate::position::{is_go_command, is_position_command};
use crate::process::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Engine is not running")]
    NotRunning,
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Session actor closed")]
    ActorClosed,
}

/// Commands sent to the session actor. Each embeds a oneshot for the reply.
pub(crate) enum SessionCommand {
    Send {
        command: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// How a command affects pipeline state before it is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Position,
    Stop,
    Go,
    Other,
}

impl CommandKind {
    pub(crate) fn classify(command: &str) -> Self {
        if is_position_command(command) {
            CommandKind::Position
        } else if command.trim() == "stop" {
            CommandKind::Stop
        } else if is_go_command(command) {
            CommandKind::Go
        } else {
            CommandKind::Other
        }
    }
}

/// Parameters for a one-shot position analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub depth: Option<u32>,
    pub multi_pv: u32,
    pub movetime: Option<u64>, // Move time in milliseconds
    pub nodes: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            depth: Some(20),
            multi_pv: 1,
            movetime: None,
            nodes: None,
        }
    }
}

impl AnalysisOptions {
    /// Build the `go` command; with no limit at all the search is infinite.
    pub fn go_command(&self) -> String {
        let mut go_cmd = "go".to_string();
        if let Some(depth) = self.depth {
            go_cmd.push_str(&format!(" depth {}", depth));
        }
        if let Some(movetime) = self.movetime {
            go_cmd.push_str(&format!(" movetime {}", movetime));
        }
        if let Some(nodes) = self.nodes {
            go_cmd.push_str(&format!(" nodes {}", nodes));
        }
        if go_cmd == "go" {
            go_cmd.push_str(" infinite");
        }
        go_cmd
    }
}
