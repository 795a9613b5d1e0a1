use std::collections::BTreeMap;

use crate::events::{AggregatedInfoEvent, BestMoveEvent};
use crate::position::PositionGate;
use crate::uci::{BestMoveLine, InfoRecord};

/// Best-known analysis for one PV index of the current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvEntry {
    pub index: u32,
    pub evaluation: String,
    pub best_move: String,
    pub line: String,
    pub depth: u32,
}

/// Folds a stream of partial `info` updates into per-PV state.
///
/// Depth is monotonic per index: a record is accepted only if its depth is
/// at least the depth last accepted for that index. Equal depth overwrites.
#[derive(Debug, Default)]
pub struct MultiPvAggregator {
    entries: BTreeMap<u32, PvEntry>,
}

impl MultiPvAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one info record and return a full snapshot if it was accepted.
    ///
    /// A record for an index above 1 that arrives while PV 1 is still unknown
    /// is accepted and stored, but returns `None`: snapshots always lead with
    /// PV 1, so the first one is built once PV 1 arrives. `None` therefore
    /// means "nothing to emit", not necessarily "rejected".
    pub fn apply_info(
        &mut self,
        record: InfoRecord,
        gate: &PositionGate,
    ) -> Option<AggregatedInfoEvent> {
        if gate.is_stale(&record) {
            tracing::debug!(
                "Dropping stale info (multipv {}, depth {}, generation {})",
                record.multipv,
                record.depth,
                record.generation
            );
            return None;
        }

        let last_depth = self
            .entries
            .get(&record.multipv)
            .map_or(0, |entry| entry.depth);
        if record.depth < last_depth {
            tracing::trace!(
                "Rejecting multipv {} at depth {} (already at {})",
                record.multipv,
                record.depth,
                last_depth
            );
            return None;
        }

        self.entries.insert(
            record.multipv,
            PvEntry {
                index: record.multipv,
                evaluation: record.evaluation,
                best_move: record.best_move,
                line: record.line,
                depth: record.depth,
            },
        );

        self.snapshot(gate.current().fen())
    }

    /// Close the analysis session: clear all per-PV state and build the
    /// terminal event.
    pub fn apply_bestmove(&mut self, record: BestMoveLine, gate: &PositionGate) -> BestMoveEvent {
        self.reset();
        BestMoveEvent {
            mv: record.mv,
            ponder: record.ponder,
            fen: gate.current().fen().to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &PvEntry> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn snapshot(&self, fen: &str) -> Option<AggregatedInfoEvent> {
        let depth = self.entries.get(&1)?.depth;
        let mut event = AggregatedInfoEvent {
            evaluations: Vec::with_capacity(self.entries.len()),
            best_moves: Vec::with_capacity(self.entries.len()),
            lines: Vec::with_capacity(self.entries.len()),
            depths: Vec::with_capacity(self.entries.len()),
            depth,
            fen: fen.to_string(),
        };
        for entry in self.entries.values() {
            event.evaluations.push(entry.evaluation.clone());
            event.best_moves.push(entry.best_move.clone());
            event.lines.push(entry.line.clone());
            event.depths.push(entry.depth);
        }
        Some(event)
    }
}
