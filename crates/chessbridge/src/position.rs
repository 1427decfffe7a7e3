//! Position tracker.
//!
//! Board state is never stored on its own: it is rebuilt by replaying the
//! ledger from its start position through the rules oracle (`shakmaty`).
//! [`Board`] additionally remembers the repetition keys of every position it
//! went through so threefold claims can be evaluated.

use log::error;
use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::error::{BrokerError, Result};
use crate::types::{DisplayMove, UciMove};

/// Halfmove clock value at which the fifty-move draw may be claimed.
pub const FIFTY_MOVE_HALFMOVES: u32 = 100;

/// Number of occurrences of a position that allows a threefold claim.
pub const THREEFOLD_COUNT: usize = 3;

/// Terminal-state classification, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalState {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    ThreefoldClaimable,
    FiftyMoveClaimable,
}

impl TerminalState {
    pub fn is_over(self) -> bool {
        self != TerminalState::Ongoing
    }

    /// Collapses the draw sub-reasons into a single `draw`.
    pub fn reason(self) -> GameOverReason {
        match self {
            TerminalState::Ongoing => GameOverReason::None,
            TerminalState::Checkmate { .. } => GameOverReason::Checkmate,
            TerminalState::Stalemate
            | TerminalState::InsufficientMaterial
            | TerminalState::ThreefoldClaimable
            | TerminalState::FiftyMoveClaimable => GameOverReason::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TerminalState::Ongoing => "ongoing",
            TerminalState::Checkmate { .. } => "checkmate",
            TerminalState::Stalemate => "stalemate",
            TerminalState::InsufficientMaterial => "insufficient_material",
            TerminalState::ThreefoldClaimable => "threefold_repetition",
            TerminalState::FiftyMoveClaimable => "fifty_moves",
        }
    }
}

/// Reason reported to callers of the game-over query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOverReason {
    None,
    Checkmate,
    Draw,
}

impl GameOverReason {
    /// Wire label; the empty string stands for "not over".
    pub fn as_str(self) -> &'static str {
        match self {
            GameOverReason::None => "",
            GameOverReason::Checkmate => "checkmate",
            GameOverReason::Draw => "draw",
        }
    }
}

/// Where a session starts: the standard array or a FEN setup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StartPosition {
    #[default]
    Standard,
    Fen(String),
}

impl StartPosition {
    pub fn from_fen_opt(fen: Option<&str>) -> Self {
        match fen.map(str::trim) {
            Some(text) if !text.is_empty() && text != "startpos" => {
                StartPosition::Fen(text.to_string())
            }
            _ => StartPosition::Standard,
        }
    }

    pub fn board(&self) -> Result<Board> {
        match self {
            StartPosition::Standard => Ok(Board::new()),
            StartPosition::Fen(fen) => Board::from_fen(fen),
        }
    }

    /// The UCI `position` command that sets up this start and applies `moves`.
    pub fn uci_command(&self, moves: &[UciMove]) -> String {
        let mut cmd = match self {
            StartPosition::Standard => "position startpos".to_string(),
            StartPosition::Fen(fen) => format!("position fen {fen}"),
        };
        if !moves.is_empty() {
            cmd.push_str(" moves");
            for mv in moves {
                cmd.push(' ');
                cmd.push_str(&mv.to_string());
            }
        }
        cmd
    }
}

/// Identity of a position for repetition purposes: placement, side to move,
/// castling rights and a legal en-passant square. Move counters are excluded.
fn repetition_key(pos: &Chess) -> String {
    let fen = Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string();
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// A position reached from a start position, with its repetition history.
#[derive(Clone, Debug)]
pub struct Board {
    pos: Chess,
    seen: Vec<String>,
}

impl Board {
    /// The standard initial position.
    pub fn new() -> Self {
        let pos = Chess::default();
        let seen = vec![repetition_key(&pos)];
        Self { pos, seen }
    }

    /// A position set up from FEN.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let setup: Fen = fen
            .trim()
            .parse()
            .map_err(|_| BrokerError::InvalidFen(fen.to_string()))?;
        let pos: Chess = setup
            .into_position(CastlingMode::Standard)
            .map_err(|_| BrokerError::InvalidFen(fen.to_string()))?;
        let seen = vec![repetition_key(&pos)];
        Ok(Self { pos, seen })
    }

    /// Number of plies applied since the start position.
    pub fn ply(&self) -> usize {
        self.seen.len() - 1
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    /// Resolves a pure move to the oracle's legal move, if it is legal here.
    fn legal(&self, mv: &UciMove) -> Option<Move> {
        let m = mv.to_oracle().to_move(&self.pos).ok()?;
        self.pos.is_legal(&m).then_some(m)
    }

    pub fn is_legal(&self, mv: &UciMove) -> bool {
        self.legal(mv).is_some()
    }

    /// `true` when the move is legal and takes a piece (en passant included).
    pub fn is_capture(&self, mv: &UciMove) -> bool {
        self.legal(mv).is_some_and(|m| m.is_capture())
    }

    /// Display form of a move in this position.
    pub fn display(&self, mv: &UciMove) -> DisplayMove {
        DisplayMove::new(*mv, self.is_capture(mv))
    }

    /// Applies a legal move and returns its display form. Illegal moves leave
    /// the board untouched.
    pub fn play(&mut self, mv: &UciMove) -> Result<DisplayMove> {
        let m = self.legal(mv).ok_or(BrokerError::IllegalMove {
            mv: *mv,
            ply: self.ply(),
        })?;
        let shown = DisplayMove::new(*mv, m.is_capture());
        self.pos.play_unchecked(&m);
        self.seen.push(repetition_key(&self.pos));
        Ok(shown)
    }

    fn occurrences(&self, key: &str) -> usize {
        self.seen.iter().filter(|k| k.as_str() == key).count()
    }

    /// The current position occurred three times, or some legal move would
    /// produce its third occurrence.
    pub fn can_claim_threefold(&self) -> bool {
        let current = &self.seen[self.seen.len() - 1];
        if self.occurrences(current) >= THREEFOLD_COUNT {
            return true;
        }
        self.pos.legal_moves().iter().any(|m| {
            let mut next = self.pos.clone();
            next.play_unchecked(m);
            self.occurrences(&repetition_key(&next)) + 1 >= THREEFOLD_COUNT
        })
    }

    /// Fifty moves without capture or pawn move have passed, or the next
    /// quiet non-pawn move would complete them.
    pub fn can_claim_fifty_moves(&self) -> bool {
        let halfmoves = self.pos.halfmoves();
        if halfmoves >= FIFTY_MOVE_HALFMOVES {
            return true;
        }
        halfmoves + 1 >= FIFTY_MOVE_HALFMOVES
            && self.pos.legal_moves().iter().any(|m| !m.is_zeroing())
    }

    /// First matching condition wins; conditions are never combined.
    pub fn terminal_state(&self) -> TerminalState {
        if self.pos.is_checkmate() {
            // The side to move is mated.
            TerminalState::Checkmate {
                winner: self.pos.turn().other(),
            }
        } else if self.pos.is_stalemate() {
            TerminalState::Stalemate
        } else if self.pos.is_insufficient_material() {
            TerminalState::InsufficientMaterial
        } else if self.can_claim_threefold() {
            TerminalState::ThreefoldClaimable
        } else if self.can_claim_fifty_moves() {
            TerminalState::FiftyMoveClaimable
        } else {
            TerminalState::Ongoing
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// A ledger move that could not be applied during replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkippedMove {
    pub ply: usize,
    pub mv: UciMove,
}

/// Outcome of a lenient replay.
#[derive(Clone, Debug)]
pub struct Replay {
    pub board: Board,
    pub skipped: Vec<SkippedMove>,
}

impl Replay {
    pub fn is_consistent(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Replays `moves` from the standard initial position.
pub fn replay(moves: &[UciMove]) -> Replay {
    replay_from(&Board::new(), moves)
}

/// Replays `moves` on top of `origin`. Illegal entries indicate a corrupted
/// ledger: each one is logged, skipped and reported in [`Replay::skipped`] so
/// the walk can continue.
pub fn replay_from(origin: &Board, moves: &[UciMove]) -> Replay {
    let mut board = origin.clone();
    let mut skipped = Vec::new();
    for (ply, mv) in moves.iter().enumerate() {
        if board.play(mv).is_err() {
            let err = BrokerError::Consistency { mv: *mv, ply };
            error!("{err}; skipping it");
            skipped.push(SkippedMove { ply, mv: *mv });
        }
    }
    Replay { board, skipped }
}

/// Replays `moves` on top of `origin`, failing on the first illegal entry.
pub fn replay_strict(origin: &Board, moves: &[UciMove]) -> Result<Board> {
    let mut board = origin.clone();
    for (ply, mv) in moves.iter().enumerate() {
        board
            .play(mv)
            .map_err(|_| BrokerError::Consistency { mv: *mv, ply })?;
    }
    Ok(board)
}
