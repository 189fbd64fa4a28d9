use super::UciError;

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)` or a bare `bestmove`.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
    },
    Info(InfoLine),
}

/// The fields of an `info` line the gateway cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub score: Option<Score>,
    /// Everything after the `pv` token, when present.
    pub pv: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32), // Negative for being mated
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let mv = tokens.get(1).and_then(|s| move_token(s));
            let ponder = if tokens.get(2) == Some(&"ponder") {
                tokens.get(3).and_then(|s| move_token(s))
            } else {
                None
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

fn move_token(token: &str) -> Option<String> {
    (token != "(none)").then(|| token.to_string())
}

/// Whether `line` is a `bestmove` reply, without parsing the rest.
pub fn is_bestmove(line: &str) -> bool {
    line.split_whitespace().next() == Some("bestmove")
}

/// Parse the tokens of an "info" line that follow `info`
fn parse_info_line(tokens: &[&str]) -> InfoLine {
    let mut info = InfoLine::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "seldepth" => {
                i += 1;
                info.seldepth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(Score::Centipawns),
                            "mate" => value_str.parse().ok().map(Score::Mate),
                            _ => None,
                        };
                    }
                }
            }
            "pv" => {
                // The variation runs to the end of the line
                info.pv = Some(tokens[i + 1..].iter().map(|s| s.to_string()).collect());
                break;
            }
            "string" => break,
            _ => {
                // Unknown keyword, skip
            }
        }
        i += 1;
    }

    info
}
