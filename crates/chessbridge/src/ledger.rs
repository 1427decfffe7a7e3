//! Move ledger and suggestion cache.
//!
//! [`Ledger`] is the single-threaded state machine behind a session: the
//! append-only move list, the replayed board of its tip, the single-slot
//! pending notification and the memoized engine suggestion. Locking lives in
//! [`crate::session`].

use log::{debug, info};
use serde::Serialize;

use crate::error::{BrokerError, Result};
use crate::position::{Board, Replay, StartPosition, TerminalState, replay_from};
use crate::types::{DisplayMove, UciMove};

/// Result of a successful submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Appended; carries the display form.
    Accepted(DisplayMove),
    /// Same as the last accepted move; nothing changed.
    Duplicate,
}

/// A memoized engine answer, valid while the ledger length equals `ply`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    #[serde(skip)]
    pub ply: usize,
    #[serde(rename = "move")]
    pub mv: UciMove,
    #[serde(rename = "formatted")]
    pub display: DisplayMove,
}

/// Game-over classification of the ledger tip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameStatus {
    pub state: TerminalState,
    /// Replay had to skip corrupt entries to get here.
    pub degraded: bool,
}

impl GameStatus {
    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }
}

#[derive(Debug)]
pub struct Ledger {
    start: StartPosition,
    origin: Board,
    moves: Vec<UciMove>,
    board: Board,
    pending: Option<DisplayMove>,
    suggestion: Option<Suggestion>,
}

impl Ledger {
    /// An empty ledger at the standard initial position.
    pub fn new() -> Self {
        let origin = Board::new();
        Self::from_parts(StartPosition::Standard, origin)
    }

    pub fn with_start(start: StartPosition) -> Result<Self> {
        let origin = start.board()?;
        Ok(Self::from_parts(start, origin))
    }

    fn from_parts(start: StartPosition, origin: Board) -> Self {
        Self {
            start,
            board: origin.clone(),
            origin,
            moves: Vec::new(),
            pending: None,
            suggestion: None,
        }
    }

    pub fn start(&self) -> &StartPosition {
        &self.start
    }

    pub fn moves(&self) -> &[UciMove] {
        &self.moves
    }

    /// Ledger length; the cache key.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Board of the ledger tip, replaced on every append.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Validates and appends a move.
    ///
    /// Resubmitting the last accepted move is idempotent. An illegal move is
    /// rejected without touching the ledger, the cache or the pending slot.
    /// `claimed` is the caller's own display form; it is advisory only.
    pub fn submit(&mut self, mv: UciMove, claimed: Option<DisplayMove>) -> Result<SubmitOutcome> {
        if self.moves.last() == Some(&mv) {
            debug!("duplicate submission of {mv} ignored");
            return Ok(SubmitOutcome::Duplicate);
        }

        let mut next = self.board.clone();
        let shown = next.play(&mv).map_err(|_| BrokerError::IllegalMove {
            mv,
            ply: self.moves.len(),
        })?;
        if let Some(claimed) = claimed.filter(|c| *c != shown) {
            debug!("client display form {claimed} differs from {shown}; using {shown}");
        }

        self.moves.push(mv);
        self.board = next;
        self.pending = Some(shown);
        self.suggestion = None;
        info!("ply {}: accepted {shown}", self.moves.len());
        Ok(SubmitOutcome::Accepted(shown))
    }

    /// Destructive read of the pending notification.
    pub fn take_pending(&mut self) -> Option<DisplayMove> {
        self.pending.take()
    }

    /// The memoized suggestion if the ledger has not changed since.
    pub fn cached_suggestion(&self) -> Option<Suggestion> {
        self.suggestion.filter(|s| s.ply == self.moves.len())
    }

    /// Records an engine answer for the current tip. An answer that is not a
    /// legal move here is the engine's fault.
    pub fn store_suggestion(&mut self, mv: UciMove) -> Result<Suggestion> {
        if !self.board.is_legal(&mv) {
            return Err(BrokerError::EngineProtocol(format!(
                "engine suggested {mv}, which is illegal at ply {}",
                self.moves.len()
            )));
        }
        let suggestion = Suggestion {
            ply: self.moves.len(),
            mv,
            display: self.board.display(&mv),
        };
        self.suggestion = Some(suggestion);
        Ok(suggestion)
    }

    pub fn replay(&self) -> Replay {
        replay_from(&self.origin, &self.moves)
    }

    /// Replays the ledger and classifies the resulting position.
    pub fn status(&self) -> GameStatus {
        let replayed = self.replay();
        GameStatus {
            state: replayed.board.terminal_state(),
            degraded: !replayed.is_consistent(),
        }
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
