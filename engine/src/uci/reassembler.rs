/// Rebuilds line boundaries from arbitrarily chunked engine output.
///
/// Trailing content without a terminator stays buffered until a later
/// [`feed`](Self::feed) completes it.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: String,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw chunk and iterate over every line it completes.
    ///
    /// Lines are trimmed; lines that are empty after trimming are skipped.
    /// Lines not pulled from the iterator stay buffered for the next call.
    pub fn feed(&mut self, chunk: &str) -> Lines<'_> {
        self.buffer.push_str(chunk);
        Lines { buffer: &mut self.buffer }
    }

    /// Drop any buffered partial line.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!("Discarding {} buffered bytes of engine output", self.buffer.len());
        }
        self.buffer.clear();
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Lazy iterator over the complete lines in a [`LineReassembler`] buffer.
pub struct Lines<'a> {
    buffer: &'a mut String,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.find('\n')?;
            let rest = self.buffer.split_off(end + 1);
            let line = std::mem::replace(self.buffer, rest);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn feed_all(reassembler: &mut LineReassembler, chunks: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(reassembler.feed(chunk));
        }
        out
    }

    #[test]
    fn test_single_chunk_multiple_lines() {
        let mut r = LineReassembler::new();
        let lines = feed_all(&mut r, &["uciok\nreadyok\n"]);
        assert_eq!(lines, vec!["uciok", "readyok"]);
        assert!(r.pending().is_empty());
    }

    #[test]
    fn test_every_split_offset_yields_line_once() {
        let line = "info depth 12 multipv 1 score cp 35 pv e2e4 e7e5";
        let input = format!("{}\n", line);
        for split in 0..=input.len() {
            let mut r = LineReassembler::new();
            let (a, b) = input.split_at(split);
            let lines = feed_all(&mut r, &[a, b]);
            assert_eq!(lines, vec![line.to_string()], "split at {}", split);
            assert!(r.pending().is_empty());
        }
    }

    #[test]
    fn test_byte_by_byte_feed() {
        let input = "  bestmove e2e4 ponder e7e5 \r\n";
        let mut r = LineReassembler::new();
        let chunks: Vec<String> = input.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let lines = feed_all(&mut r, &refs);
        assert_eq!(lines, vec!["bestmove e2e4 ponder e7e5"]);
    }

    #[test]
    fn test_partial_tail_is_retained() {
        let mut r = LineReassembler::new();
        assert_eq!(feed_all(&mut r, &["readyok\ninfo dep"]), vec!["readyok"]);
        assert_eq!(r.pending(), "info dep");
        assert_eq!(feed_all(&mut r, &["th 3\n"]), vec!["info depth 3"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut r = LineReassembler::new();
        assert_eq!(feed_all(&mut r, &["\n\r\n  \nuciok\n"]), vec!["uciok"]);
    }

    #[test]
    fn test_unconsumed_lines_stay_buffered() {
        let mut r = LineReassembler::new();
        let first = r.feed("a\nb\n").next();
        assert_eq!(first.as_deref(), Some("a"));
        assert_eq!(feed_all(&mut r, &[""]), vec!["b"]);
    }

    #[test]
    fn test_reset_discards_partial_line() {
        let mut r = LineReassembler::new();
        assert!(feed_all(&mut r, &["info depth 20 score cp 1"]).is_empty());
        r.reset();
        assert_eq!(feed_all(&mut r, &["readyok\n"]), vec!["readyok"]);
    }

    proptest! {
        #[test]
        fn prop_any_chunking_yields_each_line_once(
            raw_lines in proptest::collection::vec("[a-z0-9 ]{1,20}", 1..6),
            cuts in proptest::collection::vec(0usize..200, 0..8),
        ) {
            let lines: Vec<String> = raw_lines
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();

            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % (input.len() + 1)).collect();
            cuts.sort_unstable();
            let mut chunks = Vec::new();
            let mut start = 0;
            for cut in cuts {
                chunks.push(&input[start..cut]);
                start = cut;
            }
            chunks.push(&input[start..]);

            let mut r = LineReassembler::new();
            prop_assert_eq!(feed_all(&mut r, &chunks), lines);
            prop_assert!(r.pending().is_empty());
        }
    }
}
