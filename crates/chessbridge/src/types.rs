//! Pure and display move forms.
//!
//! - [`UciMove`]: origin, destination and optional promotion (`e2e4`, `e7e8q`)
//! - [`DisplayMove`]: pure form plus an optional capture marker (`e4xd5`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::uci::UciMove as OracleUci;
use shakmaty::{Role, Square};

use crate::error::BrokerError;

/// Marker inserted between the squares of a capturing move.
pub const CAPTURE_MARKER: char = 'x';

/// A move in pure UCI form. Immutable once parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UciMove {
    from: Square,
    to: Square,
    promotion: Option<Role>,
}

impl UciMove {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    pub fn from_square(&self) -> Square {
        self.from
    }

    pub fn to_square(&self) -> Square {
        self.to
    }

    pub fn promotion(&self) -> Option<Role> {
        self.promotion
    }

    /// The same move in the rules oracle's representation.
    pub(crate) fn to_oracle(self) -> OracleUci {
        OracleUci::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        }
    }
}

fn parse_square(text: &str, bytes: &[u8]) -> Result<Square, BrokerError> {
    Square::from_ascii(bytes).map_err(|_| BrokerError::InvalidMove(text.to_string()))
}

fn parse_promotion(text: &str, c: char) -> Result<Role, BrokerError> {
    match Role::from_char(c) {
        Some(role @ (Role::Knight | Role::Bishop | Role::Rook | Role::Queen)) => Ok(role),
        _ => Err(BrokerError::InvalidMove(text.to_string())),
    }
}

impl FromStr for UciMove {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let bytes = text.as_bytes();
        if !text.is_ascii() || !(4..=5).contains(&bytes.len()) {
            return Err(BrokerError::InvalidMove(s.to_string()));
        }
        let from = parse_square(s, &bytes[0..2])?;
        let to = parse_square(s, &bytes[2..4])?;
        let promotion = match bytes.get(4) {
            Some(&c) => Some(parse_promotion(s, char::from(c))?),
            None => None,
        };
        Ok(Self::new(from, to, promotion))
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for UciMove {
    type Error = BrokerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UciMove> for String {
    fn from(mv: UciMove) -> Self {
        mv.to_string()
    }
}

/// A move as presented to players: the pure form with a capture marker when
/// the move takes a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayMove {
    mv: UciMove,
    capture: bool,
}

impl DisplayMove {
    pub fn new(mv: UciMove, capture: bool) -> Self {
        Self { mv, capture }
    }

    pub fn pure(&self) -> UciMove {
        self.mv
    }

    pub fn is_capture(&self) -> bool {
        self.capture
    }
}

impl FromStr for DisplayMove {
    type Err = BrokerError;

    /// Accepts both `e4xd5` and a bare pure form such as `e2e4`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        match text.char_indices().nth(2) {
            Some((idx, CAPTURE_MARKER)) => {
                let pure = format!("{}{}", &text[..idx], &text[idx + 1..]);
                let mv = pure
                    .parse()
                    .map_err(|_| BrokerError::InvalidMove(s.to_string()))?;
                Ok(Self::new(mv, true))
            }
            _ => Ok(Self::new(text.parse()?, false)),
        }
    }
}

impl fmt::Display for DisplayMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mv.from)?;
        if self.capture {
            write!(f, "{CAPTURE_MARKER}")?;
        }
        write!(f, "{}", self.mv.to)?;
        if let Some(role) = self.mv.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for DisplayMove {
    type Error = BrokerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DisplayMove> for String {
    fn from(mv: DisplayMove) -> Self {
        mv.to_string()
    }
}

/// Parses a whitespace- or list-provided sequence of pure moves.
pub fn parse_moves<'a, I>(tokens: I) -> Result<Vec<UciMove>, BrokerError>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().map(str::parse).collect()
}
