use crate::Score;
use cozy_chess::Color;

/// Line of engine output that the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciRecord {
    Info(InfoLine),
    BestMove(BestMoveLine),
}

/// Fields extracted from an `info … score … pv …` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: u32,
    pub multipv: u32,
    pub score: Score,
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMoveLine {
    pub mv: String,
    pub ponder: Option<String>,
}

/// An [`InfoLine`] attributed to a position, with its score normalized to
/// White's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRecord {
    pub multipv: u32,
    pub depth: u32,
    pub evaluation: String,
    pub best_move: String,
    pub line: String,
    /// Side to move the evaluation was normalized against.
    pub side_to_move: Color,
    /// Generation of the position the record was attributed to.
    pub generation: u64,
}

/// Classify a trimmed line of engine output.
///
/// Returns `None` for progress noise (`currmove`), malformed lines and
/// everything that is neither a scored `info` line nor a `bestmove`.
pub fn parse_uci_line(line: &str) -> Option<UciRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    if tokens.contains(&"currmove") {
        return None;
    }

    if tokens.first() == Some(&"bestmove") {
        return parse_bestmove(&tokens).map(UciRecord::BestMove);
    }

    if ["info", "score", "pv"].iter().all(|t| tokens.contains(t)) {
        return parse_info_line(&tokens).map(UciRecord::Info);
    }

    None
}

fn parse_bestmove(tokens: &[&str]) -> Option<BestMoveLine> {
    let mv = tokens.get(1)?.to_string();
    let ponder = match tokens.get(2) {
        Some(&"ponder") => tokens.get(3).map(|p| p.to_string()),
        _ => None,
    };
    Some(BestMoveLine { mv, ponder })
}

fn parse_info_line(tokens: &[&str]) -> Option<InfoLine> {
    let position = |keyword: &str| tokens.iter().position(|t| *t == keyword);

    let score_at = position("score")?;
    let score = match (tokens.get(score_at + 1), tokens.get(score_at + 2)) {
        (Some(&"cp"), Some(value)) => Score::Centipawns(value.parse().ok()?),
        (Some(&"mate"), Some(value)) => Score::Mate(value.parse().ok()?),
        _ => return None,
    };

    let depth = tokens.get(position("depth")? + 1)?.parse::<u32>().ok()?;

    let multipv = match position("multipv") {
        Some(at) => tokens.get(at + 1)?.parse::<u32>().ok().filter(|n| *n >= 1)?,
        None => 1,
    };

    let pv: Vec<String> = tokens[position("pv")? + 1..]
        .iter()
        .map(|mv| mv.to_string())
        .collect();
    if pv.is_empty() {
        return None;
    }

    Some(InfoLine {
        depth,
        multipv,
        score,
        pv,
    })
}

/// Render a score from White's point of view.
///
/// Centipawns become pawns with exactly two decimals (`"-0.50"`); mates
/// become `M<n>` / `-M<n>`. When Black is to move the sign is flipped.
pub fn format_evaluation(score: Score, side_to_move: Color) -> String {
    match score {
        Score::Centipawns(cp) => {
            let cp = i64::from(cp);
            let white_cp = if side_to_move == Color::Black { -cp } else { cp };
            let sign = if white_cp < 0 { "-" } else { "" };
            let abs = white_cp.unsigned_abs();
            format!("{}{}.{:02}", sign, abs / 100, abs % 100)
        }
        Score::Mate(moves) => {
            let marker = if moves < 0 {
                format!("-M{}", moves.unsigned_abs())
            } else {
                format!("M{}", moves)
            };
            if side_to_move == Color::White {
                marker
            } else {
                match marker.strip_prefix('-') {
                    Some(unsigned) => unsigned.to_string(),
                    None => format!("-{}", marker),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(line: &str) -> InfoLine {
        match parse_uci_line(line) {
            Some(UciRecord::Info(info)) => info,
            other => panic!("expected info record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_line("bestmove e2e4 ponder e7e5").unwrap();
        assert_eq!(
            msg,
            UciRecord::BestMove(BestMoveLine {
                mv: "e2e4".to_string(),
                ponder: Some("e7e5".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_bestmove_without_move() {
        assert_eq!(parse_uci_line("bestmove"), None);
    }

    #[test]
    fn test_parse_info() {
        let info = info("info depth 12 seldepth 18 multipv 2 score cp 35 nodes 15234 pv e2e4 e7e5 g1f3");
        assert_eq!(info.depth, 12);
        assert_eq!(info.multipv, 2);
        assert_eq!(info.score, Score::Centipawns(35));
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_multipv_defaults_to_one() {
        let info = info("info depth 5 score mate -3 pv g1f3");
        assert_eq!(info.multipv, 1);
        assert_eq!(info.score, Score::Mate(-3));
    }

    #[test]
    fn test_depth_zero_is_valid() {
        assert_eq!(info("info depth 0 score cp 0 pv a2a3").depth, 0);
    }

    #[test]
    fn test_currmove_lines_ignored() {
        assert_eq!(
            parse_uci_line("info depth 20 currmove e2e4 currmovenumber 1 score cp 3 pv e2e4"),
            None
        );
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(parse_uci_line("info score cp 20 pv e2e4"), None);
        assert_eq!(parse_uci_line("info depth 3 score cp pv e2e4"), None);
        assert_eq!(parse_uci_line("info depth 3 score wdl 500 pv e2e4"), None);
        assert_eq!(parse_uci_line("info depth 3 score cp 20 pv"), None);
        assert_eq!(parse_uci_line("info depth x score cp 20 pv e2e4"), None);
        assert_eq!(parse_uci_line("info depth 3 multipv 0 score cp 20 pv e2e4"), None);
    }

    #[test]
    fn test_uninteresting_lines() {
        assert_eq!(parse_uci_line("uciok"), None);
        assert_eq!(parse_uci_line("readyok"), None);
        assert_eq!(parse_uci_line("info depth 1 seldepth 1 nodes 20"), None);
        assert_eq!(parse_uci_line("id name Stockfish 17"), None);
    }

    #[test]
    fn test_format_centipawns() {
        assert_eq!(format_evaluation(Score::Centipawns(50), Color::White), "0.50");
        assert_eq!(format_evaluation(Score::Centipawns(50), Color::Black), "-0.50");
        assert_eq!(format_evaluation(Score::Centipawns(-5), Color::White), "-0.05");
        assert_eq!(format_evaluation(Score::Centipawns(-250), Color::Black), "2.50");
        assert_eq!(format_evaluation(Score::Centipawns(1234), Color::White), "12.34");
    }

    #[test]
    fn test_format_zero_has_no_sign() {
        assert_eq!(format_evaluation(Score::Centipawns(0), Color::Black), "0.00");
    }

    #[test]
    fn test_format_mate() {
        assert_eq!(format_evaluation(Score::Mate(3), Color::White), "M3");
        assert_eq!(format_evaluation(Score::Mate(3), Color::Black), "-M3");
        assert_eq!(format_evaluation(Score::Mate(-2), Color::White), "-M2");
        assert_eq!(format_evaluation(Score::Mate(-2), Color::Black), "M2");
    }
}
