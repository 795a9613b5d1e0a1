//! Active position tracking and the staleness gate for engine analysis.

use std::collections::VecDeque;

use cozy_chess::{Board, Color};

use crate::uci::{format_evaluation, InfoLine, InfoRecord};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The position most recently sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionContext {
    fen: String,
    side_to_move: Color,
    generation: u64,
}

impl PositionContext {
    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Incremented on every position command.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for PositionContext {
    fn default() -> Self {
        Self {
            fen: STARTPOS_FEN.to_string(),
            side_to_move: Color::White,
            generation: 0,
        }
    }
}

/// Returns true for commands that replace the engine's position.
pub fn is_position_command(command: &str) -> bool {
    let command = command.trim_start();
    command.starts_with("position fen") || command.starts_with("position startpos")
}

/// Returns true for commands that start a search.
pub fn is_go_command(command: &str) -> bool {
    command.split_whitespace().next() == Some("go")
}

/// Tracks the current position and the positions of searches the engine has
/// not answered yet, and decides whether analysis output is stale.
///
/// The engine answers searches in order, so its output belongs to the oldest
/// outstanding search until that search's `bestmove` arrives.
#[derive(Debug, Default)]
pub struct PositionGate {
    current: PositionContext,
    searches: VecDeque<PositionContext>,
}

impl PositionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &PositionContext {
        &self.current
    }

    /// Apply a `position fen …` / `position startpos …` command.
    ///
    /// The FEN is everything up to an optional `moves` clause. Side to move
    /// comes from the FEN's second field and is flipped once per move in the
    /// clause. Returns `None` if `command` is not a position command.
    pub fn set_position(&mut self, command: &str) -> Option<&PositionContext> {
        let command = command.trim();
        let (fen, moves) = if let Some(rest) = command.strip_prefix("position fen") {
            split_moves(rest)
        } else if let Some(rest) = command.strip_prefix("position startpos") {
            (STARTPOS_FEN.to_string(), split_moves(rest).1)
        } else {
            return None;
        };

        if fen.parse::<Board>().is_err() {
            tracing::warn!("Position command carries an unparseable FEN: {}", fen);
        }

        let fen_side = match fen.split(' ').nth(1) {
            Some("w") => Color::White,
            Some(_) => Color::Black,
            None => {
                tracing::warn!("FEN has no side-to-move field, keeping previous side");
                self.current.side_to_move
            }
        };
        let side_to_move = if moves % 2 == 1 { !fen_side } else { fen_side };

        self.current = PositionContext {
            fen,
            side_to_move,
            generation: self.current.generation + 1,
        };
        tracing::debug!(
            "Position set: fen={}, side_to_move={:?}, generation={}",
            self.current.fen,
            self.current.side_to_move,
            self.current.generation
        );
        Some(&self.current)
    }

    /// A `go` was sent: queue a search on the current position.
    pub fn begin_search(&mut self) {
        self.searches.push_back(self.current.clone());
    }

    /// A `bestmove` arrived: retire the oldest outstanding search and return
    /// the position it ran on.
    pub fn end_search(&mut self) -> Option<PositionContext> {
        self.searches.pop_front()
    }

    /// Forget all outstanding searches.
    pub fn clear_searches(&mut self) {
        self.searches.clear();
    }

    pub fn outstanding_searches(&self) -> usize {
        self.searches.len()
    }

    /// The position engine output is currently attributed to: the oldest
    /// unanswered search, or the current position.
    pub fn attribution(&self) -> &PositionContext {
        self.searches.front().unwrap_or(&self.current)
    }

    /// Whether `context` is still the active position.
    pub fn is_current(&self, context: &PositionContext) -> bool {
        context.side_to_move == self.current.side_to_move
            && context.generation == self.current.generation
    }

    /// Normalize an info line against the position it is attributed to.
    pub fn attribute(&self, info: InfoLine) -> InfoRecord {
        let context = self.attribution();
        InfoRecord {
            multipv: info.multipv,
            depth: info.depth,
            evaluation: format_evaluation(info.score, context.side_to_move),
            best_move: info.pv.first().cloned().unwrap_or_default(),
            line: info.pv.join(" "),
            side_to_move: context.side_to_move,
            generation: context.generation,
        }
    }

    /// A record is stale when the position it was normalized against is no
    /// longer the active one.
    pub fn is_stale(&self, record: &InfoRecord) -> bool {
        record.side_to_move != self.current.side_to_move
            || record.generation != self.current.generation
    }
}

fn split_moves(rest: &str) -> (String, usize) {
    let mut fen = Vec::new();
    let mut moves = 0;
    let mut in_moves = false;
    for token in rest.split_whitespace() {
        if in_moves {
            moves += 1;
        } else if token == "moves" {
            in_moves = true;
        } else {
            fen.push(token);
        }
    }
    (fen.join(" "), moves)
}
