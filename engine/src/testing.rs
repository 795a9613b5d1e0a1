//! In-memory scripted engine for exercising a session without a process.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::process::{ChunkReader, EngineError, EngineIo, EngineSpawner, LineWriter};

/// Scripted engine. Cloning shares the same script, so a test keeps one
/// copy to drive output and inspect written commands while the session owns
/// the other.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    output: Mutex<Option<mpsc::UnboundedSender<String>>>,
    written: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, String)>>,
    spawns: AtomicUsize,
    closes: AtomicUsize,
    fail_spawn: AtomicBool,
    fail_writes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` whenever a written command starts with `trigger`.
    pub fn with_response(self, trigger: &str, output: &str) -> Self {
        lock(&self.inner.responses).push((trigger.to_string(), output.to_string()));
        self
    }

    /// Make the next spawns fail.
    pub fn fail_spawn(&self, fail: bool) {
        self.inner.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail as if the pipe were broken.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Deliver a raw output chunk. Returns false once output is closed.
    pub fn push_output(&self, chunk: &str) -> bool {
        match lock(&self.inner.output).as_ref() {
            Some(tx) => tx.send(chunk.to_string()).is_ok(),
            None => false,
        }
    }

    /// End the output stream.
    pub fn close_output(&self) {
        lock(&self.inner.output).take();
    }

    /// Every command written to the engine so far, without terminators.
    pub fn written(&self) -> Vec<String> {
        lock(&self.inner.written).clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.inner.spawns.load(Ordering::SeqCst)
    }

    /// How many times a session released the engine on teardown.
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineSpawner for ScriptedEngine {
    async fn spawn(&self) -> Result<EngineIo, EngineError> {
        if self.inner.fail_spawn.load(Ordering::SeqCst) {
            return Err(EngineError::Spawn("scripted spawn failure".to_string()));
        }
        self.inner.spawns.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.inner.output) = Some(tx);
        Ok(EngineIo {
            reader: Box::new(ScriptedReader { rx }),
            writer: Box::new(ScriptedWriter {
                engine: self.clone(),
            }),
        })
    }
}

struct ScriptedReader {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl ChunkReader for ScriptedReader {
    async fn read_chunk(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.rx.recv().await)
    }
}

struct ScriptedWriter {
    engine: ScriptedEngine,
}

#[async_trait]
impl LineWriter for ScriptedWriter {
    async fn write_line(&mut self, command: &str) -> Result<(), EngineError> {
        let inner = &self.engine.inner;
        if inner.fail_writes.load(Ordering::SeqCst) {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted write failure",
            )));
        }

        let command = command.trim_end_matches('\n').to_string();
        lock(&inner.written).push(command.clone());

        if command == "quit" {
            self.engine.close_output();
            return Ok(());
        }

        let replies: Vec<String> = lock(&inner.responses)
            .iter()
            .filter(|(trigger, _)| command.starts_with(trigger.as_str()))
            .map(|(_, output)| output.clone())
            .collect();
        for reply in replies {
            self.engine.push_output(&reply);
        }
        Ok(())
    }

    async fn close(&mut self, _grace: std::time::Duration) {
        self.engine.inner.closes.fetch_add(1, Ordering::SeqCst);
    }
}
