//! Command-line surface of the relay.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use engine_bridge::{AnalysisOptions, SessionConfig, StockfishConfig};

/// Relay between a UCI engine and a line-oriented consumer.
///
/// Reads UCI commands from stdin and prints every analysis event as one JSON
/// object per line on stdout. Logs go to stderr unless `--log-dir` is given.
#[derive(Debug, Parser)]
#[command(name = "engine-relay", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Write logs to a daily-rolling file in this directory instead of stderr.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// One-shot mode. When omitted, commands are relayed from stdin.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a position and exit after the engine's best move.
    Analyze {
        /// Position to analyze.
        #[arg(long)]
        fen: String,
        /// Search depth limit.
        #[arg(long, default_value_t = 20)]
        depth: u32,
        /// Number of principal variations to report.
        #[arg(long, default_value_t = 1)]
        multipv: u32,
        /// Search time limit in milliseconds.
        #[arg(long)]
        movetime: Option<u64>,
        /// Node count limit.
        #[arg(long)]
        nodes: Option<u64>,
    },
    /// Ask the engine for a move and exit after it answers.
    Move {
        #[arg(long)]
        fen: String,
        /// Think time in milliseconds.
        #[arg(long, default_value_t = engine_bridge::DEFAULT_MOVETIME_MS)]
        movetime: u64,
        #[arg(long, default_value_t = engine_bridge::DEFAULT_MOVE_DEPTH)]
        depth: u32,
    },
}

impl Command {
    pub fn analysis_options(
        depth: u32,
        multipv: u32,
        movetime: Option<u64>,
        nodes: Option<u64>,
    ) -> AnalysisOptions {
        AnalysisOptions {
            depth: Some(depth),
            multi_pv: multipv.max(1),
            movetime,
            nodes,
        }
    }
}

#[derive(Debug, Args)]
pub struct EngineArgs {
    /// Engine executable. Defaults to `STOCKFISH_PATH`, then common install
    /// locations and `$PATH`.
    #[arg(long, global = true)]
    pub engine: Option<PathBuf>,

    /// Skill level (0-20).
    #[arg(long, global = true)]
    pub skill: Option<u8>,

    /// Search threads (1-16).
    #[arg(long, global = true)]
    pub threads: Option<u32>,

    /// Hash table size in MB (1-2048).
    #[arg(long, global = true)]
    pub hash: Option<u32>,
}

impl EngineArgs {
    pub fn stockfish_config(&self) -> StockfishConfig {
        StockfishConfig {
            path: self.engine.clone(),
            skill_level: self.skill,
            threads: self.threads,
            hash_mb: self.hash,
            ..StockfishConfig::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Coalescing window for info events in milliseconds
    /// (overrides `ENGINE_BRIDGE_COALESCE_MS`).
    #[arg(long, global = true)]
    pub coalesce_ms: Option<u64>,

    /// Teardown grace period in milliseconds
    /// (overrides `ENGINE_BRIDGE_SHUTDOWN_GRACE_MS`).
    #[arg(long, global = true)]
    pub grace_ms: Option<u64>,

    /// Do not print raw engine lines.
    #[arg(long, global = true)]
    pub no_raw_output: bool,
}

impl SessionArgs {
    /// Environment-derived config with command-line overrides applied.
    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::from_env();
        if let Some(ms) = self.coalesce_ms {
            config.coalesce_window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.grace_ms {
            config.shutdown_grace = Duration::from_millis(ms);
        }
        if self.no_raw_output {
            config.emit_raw_output = false;
        }
        config
    }
}
