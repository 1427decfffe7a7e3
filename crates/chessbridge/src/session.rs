//! Session façade.
//!
//! One [`Session`] owns one game's [`Ledger`] behind a single mutex. Engine
//! queries run without the lock: the caller marks the query as in flight,
//! copies the move list, releases the lock, asks the engine, then re-locks
//! and stores the answer only if the ledger is still at the same length.
//! Callers arriving while a query is in flight wait on a condition variable
//! and pick up the stored answer instead of starting a second query. If that
//! query fails, its waiters get the failure too; only a later call retries.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::Serialize;

use crate::engine::BestMoveSource;
use crate::error::{BrokerError, Result};
use crate::ledger::{GameStatus, Ledger, SubmitOutcome, Suggestion};
use crate::position::{GameOverReason, StartPosition};
use crate::types::{DisplayMove, UciMove};

struct State {
    ledger: Ledger,
    /// Id of the engine query currently running.
    in_flight: Option<u64>,
    next_query: u64,
    last_failure: Option<Failure>,
}

/// A failed engine query, kept for the callers that were waiting on it.
struct Failure {
    query: u64,
    ply: usize,
    message: String,
}

pub struct Session<S> {
    source: S,
    state: Mutex<State>,
    settled: Condvar,
}

impl<S: BestMoveSource> Session<S> {
    /// A session at the standard initial position.
    pub fn new(source: S) -> Self {
        Self::from_ledger(source, Ledger::new())
    }

    pub fn with_start(source: S, start: StartPosition) -> Result<Self> {
        Ok(Self::from_ledger(source, Ledger::with_start(start)?))
    }

    fn from_ledger(source: S, ledger: Ledger) -> Self {
        Self {
            source,
            state: Mutex::new(State {
                ledger,
                in_flight: None,
                next_query: 0,
                last_failure: None,
            }),
            settled: Condvar::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the accepted moves.
    pub fn moves(&self) -> Vec<UciMove> {
        self.lock().ledger.moves().to_vec()
    }

    pub fn submit_move(&self, mv: UciMove, display: Option<DisplayMove>) -> Result<SubmitOutcome> {
        let mut state = self.lock();
        let outcome = state.ledger.submit(mv, display);
        if let Err(err) = &outcome {
            info!("rejected {mv}: {err}");
        }
        outcome
    }

    pub fn fetch_pending(&self) -> Option<DisplayMove> {
        self.lock().ledger.take_pending()
    }

    /// Best move for the current ledger tip.
    ///
    /// `client_moves` is the caller's view of the game; it is only checked
    /// against the ledger, never used as the source of truth.
    pub fn request_best_move(&self, client_moves: Option<&[UciMove]>) -> Result<Suggestion> {
        let mut state = self.lock();
        if let Some(client) = client_moves {
            if client != state.ledger.moves() {
                return Err(BrokerError::LedgerMismatch {
                    client: client.len(),
                    ledger: state.ledger.len(),
                });
            }
        }

        let mut awaited = None;
        loop {
            if let Some(hit) = state.ledger.cached_suggestion() {
                debug!("suggestion cache hit at ply {}", hit.ply);
                return Ok(hit);
            }
            if let Some(failure) = &state.last_failure {
                if Some(failure.query) == awaited && failure.ply == state.ledger.len() {
                    return Err(BrokerError::EngineProtocol(format!(
                        "shared engine query failed: {}",
                        failure.message
                    )));
                }
            }
            if let Some(query) = state.in_flight {
                awaited = Some(query);
                state = self
                    .settled
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }

            let ply = state.ledger.len();
            let start = state.ledger.start().clone();
            let moves = state.ledger.moves().to_vec();
            let query = state.next_query;
            state.next_query += 1;
            state.in_flight = Some(query);
            drop(state);

            let mut guard = InFlight {
                session: self,
                armed: true,
            };
            let answer = self.source.best_move(&start, &moves);

            state = self.lock();
            state.in_flight = None;
            guard.armed = false;
            self.settled.notify_all();

            if state.ledger.len() != ply {
                warn!(
                    "ledger moved from ply {ply} to {} during the engine query; discarding its answer",
                    state.ledger.len()
                );
                continue;
            }
            let stored = answer.and_then(|mv| state.ledger.store_suggestion(mv));
            state.last_failure = stored.as_ref().err().map(|err| Failure {
                query,
                ply,
                message: err.to_string(),
            });
            return stored;
        }
    }

    /// Replays the ledger and reports whether the game has ended.
    pub fn query_game_over(&self) -> GameStatus {
        let status = self.lock().ledger.status();
        debug!("game status: {}", status.state.label());
        if status.degraded {
            warn!("game-over status computed from a ledger with skipped moves");
        }
        status
    }
}

/// Clears the in-flight marker if the engine call unwinds, so waiters are not
/// stranded.
struct InFlight<'a, S: BestMoveSource> {
    session: &'a Session<S>,
    armed: bool,
}

impl<S: BestMoveSource> Drop for InFlight<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.session.lock().in_flight = None;
            self.session.settled.notify_all();
        }
    }
}

/// Wire payload of `submit_move`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmitReply {
    #[serde(rename = "ok")]
    Accepted {
        #[serde(rename = "move")]
        display: DisplayMove,
    },
    Duplicate,
    Rejected {
        reason: String,
    },
}

impl From<Result<SubmitOutcome>> for SubmitReply {
    fn from(result: Result<SubmitOutcome>) -> Self {
        match result {
            Ok(SubmitOutcome::Accepted(display)) => SubmitReply::Accepted { display },
            Ok(SubmitOutcome::Duplicate) => SubmitReply::Duplicate,
            Err(err) => SubmitReply::Rejected {
                reason: err.to_string(),
            },
        }
    }
}

/// Wire payload of `fetch_pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingReply {
    #[serde(rename = "move")]
    pub display: Option<DisplayMove>,
}

/// Wire payload of `query_game_over`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameOverReply {
    pub game_over: bool,
    pub result: &'static str,
}

impl From<GameStatus> for GameOverReply {
    fn from(status: GameStatus) -> Self {
        let reason: GameOverReason = status.state.reason();
        Self {
            game_over: status.is_over(),
            result: reason.as_str(),
        }
    }
}

/// Wire payload of a failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    pub error: String,
    pub kind: &'static str,
}

impl From<&BrokerError> for ErrorReply {
    fn from(err: &BrokerError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind(),
        }
    }
}
