//! Move ledger and UCI engine-query broker for a two-player chess session.
//!
//! A [`Session`] keeps the authoritative list of played moves, validates each
//! submission through the rules oracle, asks an external UCI engine for a
//! best move and memoizes the answer until the ledger changes.

pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod position;
pub mod session;
pub mod types;

pub use config::{BrokerConfig, EngineConfig, SessionConfig};
pub use engine::{BestMoveSource, UciEngine};
pub use error::{BrokerError, Result};
pub use ledger::{GameStatus, Ledger, SubmitOutcome, Suggestion};
pub use position::{Board, GameOverReason, StartPosition, TerminalState};
pub use session::{ErrorReply, GameOverReply, PendingReply, Session, SubmitReply};
pub use types::{DisplayMove, UciMove};
