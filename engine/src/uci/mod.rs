pub mod accumulator;
pub mod parser;

pub use accumulator::Accumulator;
pub use parser::{parse_uci_message, InfoLine, Score, UciMessage};

#[derive(Debug, thiserror::Error)]
pub enum UciError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine has no stdin")]
    NoStdin,
    #[error("Engine has no stdout")]
    NoStdout,
    #[error("Engine executable not found")]
    NotFound,
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    #[error("Unknown UCI message: {0}")]
    UnknownMessage(String),
}
