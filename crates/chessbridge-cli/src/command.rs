//! Frontend command grammar, one command per input line.
//!
//! ```text
//! move <uci> [display]   submit a move, e.g. `move e4d5 e4xd5`
//! pending                read-once notification of the last accepted move
//! best [uci ...]         engine suggestion; listed moves are checked against the ledger
//! over                   game-over status
//! moves                  the ledger
//! quit
//! ```

use std::fmt;

use chessbridge::types::parse_moves;
use chessbridge::{BrokerError, DisplayMove, ErrorReply, UciMove};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Move {
        mv: UciMove,
        display: Option<DisplayMove>,
    },
    Pending,
    /// `None` skips the consistency check against the caller's move list.
    Best(Option<Vec<UciMove>>),
    Over,
    Moves,
    Quit,
}

/// A line that could not be turned into a [`Command`].
#[derive(Debug)]
pub enum CommandError {
    Unknown(String),
    Usage(&'static str),
    Move(BrokerError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Unknown(word) => write!(f, "unknown command '{word}'"),
            CommandError::Usage(usage) => write!(f, "usage: {usage}"),
            CommandError::Move(err) => err.fmt(f),
        }
    }
}

impl From<BrokerError> for CommandError {
    fn from(err: BrokerError) -> Self {
        CommandError::Move(err)
    }
}

impl From<&CommandError> for ErrorReply {
    fn from(err: &CommandError) -> Self {
        match err {
            CommandError::Move(inner) => ErrorReply::from(inner),
            other => ErrorReply {
                error: other.to_string(),
                kind: "bad_request",
            },
        }
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Command>, CommandError> {
    let mut tokens = line.split_whitespace();
    let Some(word) = tokens.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = tokens.collect();

    let command = match (word, rest.as_slice()) {
        ("move", [mv]) => Command::Move {
            mv: mv.parse()?,
            display: None,
        },
        ("move", [mv, display]) => Command::Move {
            mv: mv.parse()?,
            display: Some(display.parse()?),
        },
        ("move", _) => return Err(CommandError::Usage("move <uci> [display]")),
        ("pending", []) => Command::Pending,
        ("best", []) => Command::Best(None),
        ("best", moves) => Command::Best(Some(parse_moves(moves.iter().copied())?)),
        ("over", []) => Command::Over,
        ("moves", []) => Command::Moves,
        ("quit", []) => Command::Quit,
        ("pending" | "over" | "moves" | "quit", _) => {
            return Err(CommandError::Usage("pending | over | moves | quit take no arguments"));
        }
        (other, _) => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(text: &str) -> UciMove {
        text.parse().unwrap()
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(
            parse_line("move e2e4").unwrap(),
            Some(Command::Move {
                mv: mv("e2e4"),
                display: None
            })
        );
        assert_eq!(
            parse_line("move e4d5 e4xd5").unwrap(),
            Some(Command::Move {
                mv: mv("e4d5"),
                display: Some("e4xd5".parse().unwrap())
            })
        );
        assert_eq!(parse_line("pending").unwrap(), Some(Command::Pending));
        assert_eq!(parse_line("best").unwrap(), Some(Command::Best(None)));
        assert_eq!(
            parse_line("  best e2e4 e7e5 ").unwrap(),
            Some(Command::Best(Some(vec![mv("e2e4"), mv("e7e5")])))
        );
        assert_eq!(parse_line("over").unwrap(), Some(Command::Over));
        assert_eq!(parse_line("moves").unwrap(), Some(Command::Moves));
        assert_eq!(parse_line("quit").unwrap(), Some(Command::Quit));
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn bad_lines_map_to_error_kinds() {
        let kind = |line: &str| ErrorReply::from(&parse_line(line).unwrap_err()).kind;
        assert_eq!(kind("castle"), "bad_request");
        assert_eq!(kind("move"), "bad_request");
        assert_eq!(kind("over now"), "bad_request");
        assert_eq!(kind("move e2e9"), "invalid_move");
        assert_eq!(kind("best e2e4 zz"), "invalid_move");
    }
}
