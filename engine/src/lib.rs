//! Analysis-output pipeline between a UCI engine process and a consumer UI.
//!
//! Raw engine output flows one way through the pipeline:
//! chunks → [`uci::LineReassembler`] → [`uci::parse_uci_line`] →
//! [`position::PositionGate`] → [`aggregator::MultiPvAggregator`] →
//! [`coalescer::Coalescer`] → [`sink::EventSink`].
//!
//! Commands flow the other way through [`session::AnalysisSession`], which
//! owns the engine process and serializes all pipeline state in one actor.

pub mod aggregator;
pub mod coalescer;
pub mod config;
pub mod events;
pub mod position;
pub mod process;
pub mod session;
pub mod sink;
pub mod stockfish;
pub mod uci;

#[cfg(any(test, feature = "mock"))]
pub mod testing;

pub use aggregator::{MultiPvAggregator, PvEntry};
pub use coalescer::Coalescer;
pub use config::SessionConfig;
pub use events::{AggregatedInfoEvent, AnalysisEvent, BestMoveEvent};
pub use position::{PositionContext, PositionGate};
pub use process::{ChunkReader, EngineError, EngineIo, EngineSpawner, LineWriter};
pub use session::{
    AnalysisOptions, AnalysisSession, SessionError, DEFAULT_MOVETIME_MS, DEFAULT_MOVE_DEPTH,
};
pub use sink::{EmittedEvent, EventPayload, EventSink, ANALYZED_OUTPUT_EVENT, ENGINE_OUTPUT_EVENT};
pub use stockfish::{StockfishConfig, StockfishSpawner};
pub use uci::{parse_uci_line, LineReassembler, UciRecord};

/// Engine score as reported on an `info` line, from the engine's (side to
/// move's) point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}
