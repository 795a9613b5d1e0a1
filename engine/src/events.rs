use serde::Serialize;

/// Consolidated multi-PV snapshot for one position.
///
/// The per-PV arrays are parallel and ordered by ascending PV index, so
/// `evaluations[0]` always belongs to PV 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedInfoEvent {
    pub evaluations: Vec<String>,
    pub best_moves: Vec<String>,
    pub lines: Vec<String>,
    pub depths: Vec<u32>,
    /// Depth of PV 1.
    pub depth: u32,
    pub fen: String,
}

/// Terminal event of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestMoveEvent {
    #[serde(rename = "move")]
    pub mv: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ponder: Option<String>,
    pub fen: String,
}

/// Payload of the analyzed stream, tagged with `"type"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    #[serde(rename = "info")]
    Info(AggregatedInfoEvent),
    #[serde(rename = "bestmove")]
    BestMove(BestMoveEvent),
}

impl AnalysisEvent {
    pub fn is_best_move(&self) -> bool {
        matches!(self, AnalysisEvent::BestMove(_))
    }
}
