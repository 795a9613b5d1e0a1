//! Interfaces to the engine process the session drives.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine executable not found")]
    NotFound,
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Timeout waiting for engine to respond")]
    HandshakeTimeout,
    #[error("Engine closed")]
    Closed,
}

/// Read side of the engine's output stream.
#[async_trait]
pub trait ChunkReader: Send + 'static {
    /// Wait for the next chunk of output. Chunks may split lines anywhere
    /// but never reorder bytes. `Ok(None)` means the stream is closed.
    async fn read_chunk(&mut self) -> Result<Option<String>, EngineError>;
}

/// Write side of the engine's input stream.
#[async_trait]
pub trait LineWriter: Send + 'static {
    async fn write_line(&mut self, command: &str) -> Result<(), EngineError>;

    /// Release the engine after `quit` has been written, waiting at most
    /// `grace` for it to exit on its own.
    async fn close(&mut self, _grace: Duration) {}
}

/// A launched engine, split into its two stream halves.
pub struct EngineIo {
    pub reader: Box<dyn ChunkReader>,
    pub writer: Box<dyn LineWriter>,
}

/// Launches engine processes for a session.
#[async_trait]
pub trait EngineSpawner: Send + Sync + 'static {
    async fn spawn(&self) -> Result<EngineIo, EngineError>;
}
