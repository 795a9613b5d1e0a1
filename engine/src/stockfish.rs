use crate::config;
use crate::process::{ChunkReader, EngineError, EngineIo, EngineSpawner, LineWriter};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};

const READ_BUFFER_SIZE: usize = 4096;

/// Configuration for launching and tuning the engine process.
#[derive(Debug, Clone)]
pub struct StockfishConfig {
    /// Explicit executable path. Resolved from `STOCKFISH_PATH` and common
    /// install locations when `None`.
    pub path: Option<PathBuf>,
    pub skill_level: Option<u8>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
    pub handshake_timeout: Duration,
}

impl Default for StockfishConfig {
    fn default() -> Self {
        Self {
            path: None,
            skill_level: None,
            threads: None,
            hash_mb: None,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Spawns a native Stockfish (or any UCI engine) as a child process.
#[derive(Debug, Clone, Default)]
pub struct StockfishSpawner {
    config: StockfishConfig,
}

impl StockfishSpawner {
    pub fn new(config: StockfishConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineSpawner for StockfishSpawner {
    #[tracing::instrument(level = "info", skip(self))]
    async fn spawn(&self) -> Result<EngineIo, EngineError> {
        let config = &self.config;
        tracing::info!("Starting engine spawn (config: {:?})", config);
        let path = match config.path.clone() {
            Some(path) => path,
            None => find_stockfish_path().ok_or(EngineError::NotFound)?,
        };
        tracing::info!("Found engine at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn engine: {}", e);
                EngineError::Spawn(e.to_string())
            })?;

        let stdin = process.stdin.take().ok_or(EngineError::NoStdin)?;
        let stdout = process.stdout.take().ok_or(EngineError::NoStdout)?;
        let mut writer = StockfishWriter { stdin, process };
        let mut stdout = BufReader::new(stdout);

        writer.write_line("uci").await?;
        wait_for_uciok(&mut stdout, config.handshake_timeout).await?;

        if let Some(level) = config.skill_level {
            let level = level.min(20);
            tracing::info!("Setting skill level to {}", level);
            writer
                .write_line(&format!("setoption name Skill Level value {}", level))
                .await?;
        }

        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 16);
            tracing::info!("Setting Threads to {}", threads);
            writer
                .write_line(&format!("setoption name Threads value {}", threads))
                .await?;
        }

        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 2048);
            tracing::info!("Setting Hash to {} MB", hash_mb);
            writer
                .write_line(&format!("setoption name Hash value {}", hash_mb))
                .await?;
        }

        tracing::info!("Engine spawned and initialized successfully");
        Ok(EngineIo {
            reader: Box::new(StockfishReader {
                stdout,
                buf: vec![0; READ_BUFFER_SIZE],
                carry: Vec::new(),
            }),
            writer: Box::new(writer),
        })
    }
}

/// Consume output until `uciok`, giving up after `limit`.
async fn wait_for_uciok(
    stdout: &mut BufReader<ChildStdout>,
    limit: Duration,
) -> Result<(), EngineError> {
    tracing::debug!("Waiting for uciok from engine");
    let handshake = async {
        let mut line = String::new();
        loop {
            line.clear();
            if stdout.read_line(&mut line).await? == 0 {
                return Err(EngineError::Closed);
            }
            let trimmed = line.trim();
            tracing::trace!("UCI << {}", trimmed);
            if trimmed == "uciok" {
                return Ok(());
            }
        }
    };

    match tokio::time::timeout(limit, handshake).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("Timeout waiting for uciok");
            Err(EngineError::HandshakeTimeout)
        }
    }
}

struct StockfishReader {
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
    // Bytes of a multi-byte character split across reads.
    carry: Vec<u8>,
}

#[async_trait]
impl ChunkReader for StockfishReader {
    async fn read_chunk(&mut self) -> Result<Option<String>, EngineError> {
        loop {
            let n = self.stdout.read(&mut self.buf).await?;
            if n == 0 {
                if self.carry.is_empty() {
                    tracing::warn!("Engine stdout EOF - engine closed");
                    return Ok(None);
                }
                let tail = std::mem::take(&mut self.carry);
                return Ok(Some(String::from_utf8_lossy(&tail).into_owned()));
            }

            self.carry.extend_from_slice(&self.buf[..n]);
            let valid = match std::str::from_utf8(&self.carry) {
                Ok(text) => text.len(),
                Err(e) if e.error_len().is_none() => e.valid_up_to(),
                Err(_) => self.carry.len(),
            };
            if valid == 0 {
                continue;
            }

            let rest = self.carry.split_off(valid);
            let chunk = std::mem::replace(&mut self.carry, rest);
            return Ok(Some(String::from_utf8_lossy(&chunk).into_owned()));
        }
    }
}

struct StockfishWriter {
    stdin: ChildStdin,
    process: Child,
}

#[async_trait]
impl LineWriter for StockfishWriter {
    async fn write_line(&mut self, command: &str) -> Result<(), EngineError> {
        tracing::trace!("UCI >> {}", command.trim());
        let mut line = command.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.stdin.write_all(line.as_bytes()).await.map_err(|e| {
            tracing::error!("Failed to write to stdin: {}", e);
            EngineError::Io(e)
        })?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self, grace: Duration) {
        match tokio::time::timeout(grace, self.process.wait()).await {
            Ok(Ok(status)) => tracing::info!("Engine exited with {}", status),
            Ok(Err(e)) => tracing::warn!("Failed to wait for engine exit: {}", e),
            Err(_) => {
                tracing::warn!("Engine did not exit within {:?}, killing it", grace);
                if let Err(e) = self.process.kill().await {
                    tracing::error!("Failed to kill engine: {}", e);
                }
            }
        }
    }
}

/// Find the engine executable: `STOCKFISH_PATH`, then common install
/// locations, then `$PATH`.
pub fn find_stockfish_path() -> Option<PathBuf> {
    if let Some(path) = config::get_stockfish_path() {
        return Some(path);
    }

    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];
    for path_str in paths {
        let path = Path::new(path_str);
        if path.is_file() {
            return Some(path.to_path_buf());
        }
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join("stockfish"))
        .find(|candidate| candidate.is_file())
}
