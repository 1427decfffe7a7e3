//! UCI engine adapter.
//!
//! Every query spawns a fresh engine process, sends
//! `uci` / `position ...` / `go movetime N`, waits for the single `bestmove`
//! line and kills the process. Output is read by a helper thread that
//! forwards length-limited lines over a bounded channel, so a silent or
//! chatty engine can neither block the caller past the deadline nor grow
//! memory without bound.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::error::{BrokerError, Result};
use crate::position::StartPosition;
use crate::types::UciMove;

/// First token of the line carrying the engine's answer.
pub const BESTMOVE_TOKEN: &str = "bestmove";

/// Anything that can suggest a move for a position. The ledger only talks to
/// the engine through this seam.
pub trait BestMoveSource: Send + Sync {
    fn best_move(&self, start: &StartPosition, moves: &[UciMove]) -> Result<UciMove>;
}

/// Stateless translator between a move sequence and one engine suggestion.
#[derive(Clone, Debug)]
pub struct UciEngine {
    config: EngineConfig,
}

impl UciEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Runs one search of `think_time_ms` on a fresh process.
    pub fn query(
        &self,
        start: &StartPosition,
        moves: &[UciMove],
        think_time_ms: u64,
    ) -> Result<UciMove> {
        let started = Instant::now();
        let mut proc = EngineProcess::spawn(&self.config)?;
        proc.write_line("uci")?;
        for (name, value) in &self.config.options {
            proc.write_line(&format!("setoption name {name} value {value}"))?;
        }
        proc.write_line(&start.uci_command(moves))?;
        proc.write_line(&format!("go movetime {think_time_ms}"))?;

        let deadline = Instant::now() + self.config.read_timeout(think_time_ms);
        let result = proc.wait_bestmove(deadline);
        drop(proc);

        match &result {
            Ok(mv) => info!(
                "engine suggested {mv} after {} ms ({} plies)",
                started.elapsed().as_millis(),
                moves.len()
            ),
            Err(err) => warn!("engine query failed: {err}"),
        }
        result
    }
}

impl BestMoveSource for UciEngine {
    fn best_move(&self, start: &StartPosition, moves: &[UciMove]) -> Result<UciMove> {
        self.query(start, moves, self.config.think_time_ms)
    }
}

/// One framed unit of engine output.
enum Frame {
    Line(String),
    /// A line exceeded the configured limit; reading stopped.
    Oversized,
    ReadFailed(String),
}

/// A running engine process. Dropping it kills the process.
struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<Frame>,
    label: String,
}

impl EngineProcess {
    fn spawn(cfg: &EngineConfig) -> Result<Self> {
        let unavailable = |source| BrokerError::EngineUnavailable {
            path: cfg.path.clone(),
            source,
        };
        let mut child = Command::new(&cfg.path)
            .args(&cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(unavailable)?;
        let label = format!("{}[{}]", cfg.path.display(), child.id());

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(unavailable(std::io::Error::other("engine pipes not attached")));
            }
        };

        let (tx, rx) = mpsc::sync_channel::<Frame>(cfg.line_buffer.max(1));
        let max_line_bytes = cfg.max_line_bytes;
        std::thread::spawn(move || forward_lines(stdout, max_line_bytes, tx));
        debug!("{label}: spawned");

        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            label,
        })
    }

    fn write_line(&mut self, msg: &str) -> Result<()> {
        trace!("{} < {msg}", self.label);
        let written = self
            .stdin
            .write_all(msg.as_bytes())
            .and_then(|()| self.stdin.write_all(b"\n"))
            .and_then(|()| self.stdin.flush());
        written.map_err(|e| {
            BrokerError::EngineProtocol(format!("{}: failed to send '{msg}': {e}", self.label))
        })
    }

    /// Reads lines until `bestmove` or until `deadline` passes.
    fn wait_bestmove(&mut self, deadline: Instant) -> Result<UciMove> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.protocol("no bestmove before the read deadline"));
            }
            match self.rx.recv_timeout(remaining) {
                Ok(Frame::Line(line)) => {
                    trace!("{} > {line}", self.label);
                    if let Some(parsed) = parse_bestmove_line(&line) {
                        return parsed;
                    }
                }
                Ok(Frame::Oversized) => {
                    return Err(self.protocol("output line exceeds the frame limit"));
                }
                Ok(Frame::ReadFailed(e)) => {
                    return Err(self.protocol(&format!("read error: {e}")));
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(self.protocol("no bestmove before the read deadline"));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.protocol("engine closed its output before bestmove"));
                }
            }
        }
    }

    fn protocol(&self, what: &str) -> BrokerError {
        BrokerError::EngineProtocol(format!("{}: {what}", self.label))
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        debug!("{}: terminated", self.label);
    }
}

/// Reader-thread body: forwards lines of at most `max_line_bytes` until EOF,
/// an oversized line, a read error, or the receiver going away.
fn forward_lines(stdout: ChildStdout, max_line_bytes: usize, tx: SyncSender<Frame>) {
    let mut reader = BufReader::new(stdout);
    let limit = u64::try_from(max_line_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let frame = match reader.by_ref().take(limit).read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) if buf.last() != Some(&b'\n') && buf.len() > max_line_bytes => Frame::Oversized,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                Frame::Line(text.trim_end_matches(['\r', '\n']).to_string())
            }
            Err(e) => Frame::ReadFailed(e.to_string()),
        };
        let last = !matches!(frame, Frame::Line(_));
        if tx.send(frame).is_err() || last {
            break;
        }
    }
}

/// Recognises a `bestmove <move> [ponder <move>]` line.
///
/// Returns `None` for any other line, `Some(Err)` when the line is a
/// `bestmove` line without a usable move (`(none)`, `0000`, garbage).
pub fn parse_bestmove_line(line: &str) -> Option<Result<UciMove>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != BESTMOVE_TOKEN {
        return None;
    }
    let parsed = match tokens.next() {
        None => Err(BrokerError::EngineProtocol("bestmove line without a move".into())),
        Some(token @ ("(none)" | "0000")) => Err(BrokerError::EngineProtocol(format!(
            "engine has no move to offer ({token})"
        ))),
        Some(token) => token.parse().map_err(|_| {
            BrokerError::EngineProtocol(format!("unparseable bestmove token '{token}'"))
        }),
    };
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bestmove_line_yields_move() {
        let mv = parse_bestmove_line("bestmove b8c6 ponder g1f3").unwrap().unwrap();
        assert_eq!(mv.to_string(), "b8c6");
        let promo = parse_bestmove_line("bestmove e7e8q").unwrap().unwrap();
        assert_eq!(promo.to_string(), "e7e8q");
    }

    #[test]
    fn other_lines_are_ignored() {
        assert!(parse_bestmove_line("info depth 12 score cp 31 pv e2e4").is_none());
        assert!(parse_bestmove_line("uciok").is_none());
        assert!(parse_bestmove_line("").is_none());
        // The marker has to be the first token.
        assert!(parse_bestmove_line("info string bestmove e2e4").is_none());
    }

    #[test]
    fn bestmove_without_usable_move_is_protocol_error() {
        for line in ["bestmove", "bestmove (none)", "bestmove 0000", "bestmove zz"] {
            let parsed = parse_bestmove_line(line).unwrap();
            assert!(
                matches!(parsed, Err(BrokerError::EngineProtocol(_))),
                "{line} should be a protocol error"
            );
        }
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let engine = UciEngine::new(EngineConfig::with_path("/nonexistent/chessbridge-engine"));
        let err = engine.best_move(&StartPosition::Standard, &[]).unwrap_err();
        assert!(matches!(err, BrokerError::EngineUnavailable { .. }), "{err}");
    }
}
