pub mod parser;
pub mod reassembler;

pub use parser::{format_evaluation, parse_uci_line, BestMoveLine, InfoLine, InfoRecord, UciRecord};
pub use reassembler::{LineReassembler, Lines};
