use std::sync::Arc;

use tokio::time::Instant;

use crate::aggregator::MultiPvAggregator;
use crate::coalescer::Coalescer;
use crate::config::SessionConfig;
use crate::events::AnalysisEvent;
use crate::position::PositionGate;
use crate::sink::{EventPayload, EventSink, ANALYZED_OUTPUT_EVENT, ENGINE_OUTPUT_EVENT};
use crate::uci::{parse_uci_line, LineReassembler, UciRecord};

/// All mutable pipeline state of one session. Owned by the session actor;
/// every method is one unit of work.
pub(crate) struct SessionState {
    gate: PositionGate,
    reassembler: LineReassembler,
    aggregator: MultiPvAggregator,
    coalescer: Coalescer,
    sink: Arc<dyn EventSink>,
    emit_raw_output: bool,
}

impl SessionState {
    pub(crate) fn new(config: &SessionConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            gate: PositionGate::new(),
            reassembler: LineReassembler::new(),
            aggregator: MultiPvAggregator::new(),
            coalescer: Coalescer::new(config.coalesce_window),
            sink,
            emit_raw_output: config.emit_raw_output,
        }
    }

    pub(crate) fn coalescer_deadline(&self) -> Option<Instant> {
        self.coalescer.deadline()
    }

    /// Run a chunk of engine output through the pipeline.
    pub(crate) fn process_chunk(&mut self, chunk: &str) {
        let lines: Vec<String> = self.reassembler.feed(chunk).collect();
        for line in lines {
            self.process_line(&line);
        }
    }

    fn process_line(&mut self, line: &str) {
        tracing::trace!("UCI << {}", line);
        if self.emit_raw_output {
            self.sink
                .emit(ENGINE_OUTPUT_EVENT, EventPayload::Line(line.to_string()));
        }

        match parse_uci_line(line) {
            Some(UciRecord::Info(info)) => {
                let record = self.gate.attribute(info);
                if let Some(snapshot) = self.aggregator.apply_info(record, &self.gate) {
                    self.coalescer.push(snapshot, Instant::now());
                }
            }
            Some(UciRecord::BestMove(best)) => {
                let search = self.gate.end_search();
                if search.is_some_and(|s| !self.gate.is_current(&s)) {
                    tracing::debug!("Dropping bestmove {} of an abandoned search", best.mv);
                    return;
                }
                tracing::info!("Received bestmove: {}", best.mv);
                let event = self.aggregator.apply_bestmove(best, &self.gate);
                for event in self.coalescer.finish(event) {
                    self.emit(event);
                }
            }
            None => {}
        }
    }

    /// The coalescing window elapsed.
    pub(crate) fn flush_window(&mut self) {
        if let Some(snapshot) = self.coalescer.fire() {
            self.emit(AnalysisEvent::Info(snapshot));
        }
    }

    /// A new position replaces the old one before the command reaches the
    /// engine.
    pub(crate) fn set_position(&mut self, command: &str) {
        self.gate.set_position(command);
        self.discard_analysis();
    }

    /// A search starts on the current position. Its output is attributed
    /// once every earlier search has been answered.
    pub(crate) fn begin_search(&mut self) {
        self.gate.begin_search();
    }

    /// Forget everything about the in-flight analysis without emitting.
    pub(crate) fn discard_analysis(&mut self) {
        self.aggregator.reset();
        self.reassembler.reset();
        self.coalescer.cancel();
    }

    /// Full reset on teardown.
    pub(crate) fn clear(&mut self) {
        self.discard_analysis();
        self.gate.clear_searches();
    }

    fn emit(&self, event: AnalysisEvent) {
        self.sink
            .emit(ANALYZED_OUTPUT_EVENT, EventPayload::Analysis(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AggregatedInfoEvent;
    use crate::sink::EmittedEvent;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const BLACK_TO_MOVE: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1";

    fn state() -> (SessionState, mpsc::UnboundedReceiver<EmittedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel::<EmittedEvent>();
        let config = SessionConfig {
            coalesce_window: Duration::from_millis(500),
            emit_raw_output: false,
            ..SessionConfig::default()
        };
        (SessionState::new(&config, Arc::new(tx)), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EmittedEvent>) -> Vec<AnalysisEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.name, ANALYZED_OUTPUT_EVENT);
            out.extend(event.analysis().cloned());
        }
        out
    }

    fn info(event: &AnalysisEvent) -> &AggregatedInfoEvent {
        match event {
            AnalysisEvent::Info(info) => info,
            other => panic!("expected info event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_window_holds_until_flush() {
        let (mut state, mut rx) = state();
        state.process_chunk("info depth 10 score cp 20 pv e2e4\ninfo depth 11 score cp 25 pv e2e4\n");
        assert!(drain(&mut rx).is_empty());
        assert!(state.coalescer_deadline().is_some());

        state.flush_window();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(info(&events[0]).depth, 11);
        assert!(state.coalescer_deadline().is_none());
    }

    #[tokio::test]
    async fn test_out_of_order_depth_keeps_deeper_result() {
        let (mut state, mut rx) = state();
        state.process_chunk("info depth 10 multipv 1 score cp 40 pv e2e4\n");
        state.process_chunk("info depth 9 multipv 1 score cp -80 pv a2a3\n");
        state.flush_window();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let event = info(&events[0]);
        assert_eq!(event.depth, 10);
        assert_eq!(event.evaluations, vec!["0.40"]);
    }

    #[tokio::test]
    async fn test_bestmove_flushes_then_terminates() {
        let (mut state, mut rx) = state();
        state.process_chunk("info depth 7 score cp 1 pv e2e4\ninfo depth 8 score cp 2 pv e2e4\nbestmove e7e6\n");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(info(&events[0]).depth, 8);
        assert!(events[1].is_best_move());

        // Nothing left to flush for this session.
        state.flush_window();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_black_to_move_flips_sign() {
        let (mut state, mut rx) = state();
        state.set_position(&format!("position fen {}", BLACK_TO_MOVE));
        state.process_chunk("info depth 10 score cp 50 pv e7e6\n");
        state.flush_window();

        let events = drain(&mut rx);
        let event = info(&events[0]);
        assert_eq!(event.evaluations, vec!["-0.50"]);
        assert_eq!(event.best_moves, vec!["e7e6"]);
        assert_eq!(event.fen, BLACK_TO_MOVE);
    }

    #[tokio::test]
    async fn test_new_position_discards_window_and_partial_line() {
        let (mut state, mut rx) = state();
        state.begin_search();
        state.process_chunk("info depth 12 score cp 30 pv e2e4\ninfo depth 13 sco");
        state.set_position(&format!("position fen {}", BLACK_TO_MOVE));
        assert!(state.coalescer_deadline().is_none());

        // Tail of the old partial line and late output of the old search.
        state.process_chunk("re cp 31 pv e2e4\ninfo depth 14 score cp 33 pv e2e4\n");
        state.flush_window();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_search_output_after_new_go_is_dropped() {
        let (mut state, mut rx) = state();
        state.begin_search();
        state.discard_analysis();
        state.set_position(&format!("position fen {}", BLACK_TO_MOVE));
        state.begin_search();

        // The stopped search finishes only after the new `go` went out.
        state.process_chunk("info depth 20 score cp 30 pv e2e4\nbestmove e2e4\n");
        assert!(drain(&mut rx).is_empty());
        assert!(state.coalescer_deadline().is_none());

        state.process_chunk("info depth 5 score cp 10 pv e7e5\n");
        assert!(state.coalescer_deadline().is_some());
        state.process_chunk("bestmove e7e5\n");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        let event = info(&events[0]);
        assert_eq!(event.depth, 5);
        assert_eq!(event.evaluations, vec!["-0.10"]);
        assert_eq!(event.fen, BLACK_TO_MOVE);
        match &events[1] {
            AnalysisEvent::BestMove(best) => {
                assert_eq!(best.mv, "e7e5");
                assert_eq!(best.fen, BLACK_TO_MOVE);
            }
            other => panic!("expected bestmove event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_output_passthrough() {
        let (tx, mut rx) = mpsc::unbounded_channel::<EmittedEvent>();
        let mut state = SessionState::new(&SessionConfig::default(), Arc::new(tx));
        state.process_chunk("readyok\n");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, ENGINE_OUTPUT_EVENT);
        assert_eq!(event.payload, EventPayload::Line("readyok".to_string()));
    }
}
