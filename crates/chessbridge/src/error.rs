//! Error taxonomy of the broker.

use std::io;
use std::path::PathBuf;

use crate::types::UciMove;

/// Errors surfaced by the ledger, the engine adapter and the session façade.
///
/// The variants are split so that callers can tell "your move was illegal"
/// (reprompt) apart from "the engine failed" (retry later), see
/// [`BrokerError::is_client_error`].
#[derive(thiserror::Error, Debug)]
pub enum BrokerError {
    /// Move text could not be parsed as a pure or display move.
    #[error("invalid move text '{0}'")]
    InvalidMove(String),

    /// Start position text could not be parsed or is not a legal setup.
    #[error("invalid start position '{0}'")]
    InvalidFen(String),

    /// The move is well-formed but not legal in the current position.
    #[error("illegal move {mv} at ply {ply}")]
    IllegalMove { mv: UciMove, ply: usize },

    /// The engine process could not be started.
    #[error("failed to start engine at {}: {source}", path.display())]
    EngineUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed, absent or late engine response.
    #[error("engine protocol error: {0}")]
    EngineProtocol(String),

    /// Ledger replay hit a move that is illegal in its predecessor position.
    #[error("ledger consistency violation: move {mv} at ply {ply} is illegal")]
    Consistency { mv: UciMove, ply: usize },

    /// The caller's view of the game differs from the ledger.
    #[error("client move list ({client} plies) does not match the ledger ({ledger} plies)")]
    LedgerMismatch { client: usize, ledger: usize },
}

impl BrokerError {
    /// Stable machine-readable tag, used in wire payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::InvalidMove(_) => "invalid_move",
            BrokerError::InvalidFen(_) => "invalid_fen",
            BrokerError::IllegalMove { .. } => "illegal_move",
            BrokerError::EngineUnavailable { .. } => "engine_unavailable",
            BrokerError::EngineProtocol(_) => "engine_protocol",
            BrokerError::Consistency { .. } => "consistency",
            BrokerError::LedgerMismatch { .. } => "ledger_mismatch",
        }
    }

    /// `true` when the request itself was at fault and retrying it unchanged
    /// cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BrokerError::InvalidMove(_)
                | BrokerError::InvalidFen(_)
                | BrokerError::IllegalMove { .. }
                | BrokerError::LedgerMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_and_service_errors_are_told_apart() {
        let mv: UciMove = "e2e5".parse().unwrap();
        assert!(BrokerError::IllegalMove { mv, ply: 0 }.is_client_error());
        assert!(BrokerError::LedgerMismatch { client: 1, ledger: 2 }.is_client_error());
        assert!(!BrokerError::EngineProtocol("eof".into()).is_client_error());
        let unavailable = BrokerError::EngineUnavailable {
            path: PathBuf::from("/nonexistent/engine"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(!unavailable.is_client_error());
        assert_eq!(unavailable.kind(), "engine_unavailable");
        assert!(unavailable.to_string().contains("/nonexistent/engine"));
    }
}
