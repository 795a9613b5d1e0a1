use std::time::Duration;

use tokio::time::Instant;

use crate::events::{AggregatedInfoEvent, AnalysisEvent, BestMoveEvent};

/// Batches snapshots over a fixed window and keeps only the deepest one.
///
/// `Idle → Accumulating` on the first snapshot of a window; back to `Idle`
/// when the window fires, when a bestmove flushes it, or when it is
/// cancelled. The owner drives the timer through [`deadline`](Self::deadline)
/// and [`fire`](Self::fire).
#[derive(Debug)]
pub struct Coalescer {
    window: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    best: AggregatedInfoEvent,
    deadline: Instant,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// When the current window expires, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Buffer a snapshot. The deepest snapshot of the window is kept; on a
    /// tie the later one wins.
    pub fn push(&mut self, event: AggregatedInfoEvent, now: Instant) {
        match self.pending {
            Some(ref mut pending) => {
                if event.depth >= pending.best.depth {
                    pending.best = event;
                }
            }
            None => {
                self.pending = Some(Pending {
                    best: event,
                    deadline: now + self.window,
                });
            }
        }
    }

    /// Close the window and hand back its deepest snapshot.
    pub fn fire(&mut self) -> Option<AggregatedInfoEvent> {
        self.pending.take().map(|p| p.best)
    }

    /// Flush the open window, if any, followed by the terminal event.
    pub fn finish(&mut self, best_move: BestMoveEvent) -> Vec<AnalysisEvent> {
        let mut out = Vec::with_capacity(2);
        if let Some(info) = self.fire() {
            out.push(AnalysisEvent::Info(info));
        }
        out.push(AnalysisEvent::BestMove(best_move));
        out
    }

    /// Discard the open window without emitting.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("Cancelled pending coalescing window");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(depth: u32, eval: &str) -> AggregatedInfoEvent {
        AggregatedInfoEvent {
            evaluations: vec![eval.to_string()],
            best_moves: vec!["e2e4".to_string()],
            lines: vec!["e2e4 e7e5".to_string()],
            depths: vec![depth],
            depth,
            fen: crate::position::STARTPOS_FEN.to_string(),
        }
    }

    fn best_move() -> BestMoveEvent {
        BestMoveEvent {
            mv: "e2e4".to_string(),
            ponder: None,
            fen: crate::position::STARTPOS_FEN.to_string(),
        }
    }

    #[test]
    fn test_window_opens_on_first_push() {
        let mut c = Coalescer::new(Duration::from_millis(500));
        let now = Instant::now();
        assert!(c.is_idle());
        c.push(snapshot(5, "0.10"), now);
        assert_eq!(c.deadline(), Some(now + Duration::from_millis(500)));

        // Later pushes do not extend the window.
        c.push(snapshot(6, "0.12"), now + Duration::from_millis(300));
        assert_eq!(c.deadline(), Some(now + Duration::from_millis(500)));
    }

    #[test]
    fn test_fire_emits_deepest() {
        let mut c = Coalescer::new(Duration::from_millis(500));
        let now = Instant::now();
        c.push(snapshot(7, "0.20"), now);
        c.push(snapshot(9, "0.25"), now);
        c.push(snapshot(8, "0.40"), now);
        c.push(snapshot(9, "0.30"), now);

        let fired = c.fire().unwrap();
        assert_eq!(fired.depth, 9);
        assert_eq!(fired.evaluations, vec!["0.30"]);
        assert!(c.is_idle());
        assert!(c.fire().is_none());
    }

    #[test]
    fn test_finish_flushes_then_terminates() {
        let mut c = Coalescer::new(Duration::from_millis(500));
        c.push(snapshot(12, "1.00"), Instant::now());
        let out = c.finish(best_move());
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], AnalysisEvent::Info(e) if e.depth == 12));
        assert!(out[1].is_best_move());
        assert!(c.is_idle());
    }

    #[test]
    fn test_finish_when_idle() {
        let mut c = Coalescer::new(Duration::from_millis(500));
        let out = c.finish(best_move());
        assert_eq!(out.len(), 1);
        assert!(out[0].is_best_move());
    }

    #[test]
    fn test_cancel_discards() {
        let mut c = Coalescer::new(Duration::from_millis(500));
        c.push(snapshot(3, "0.00"), Instant::now());
        c.cancel();
        assert!(c.is_idle());
        assert!(c.deadline().is_none());
        assert!(c.fire().is_none());
    }
}
