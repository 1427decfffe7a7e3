//! Drives one session from a line-oriented command stream, answering every
//! command with one JSON object per line.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

use chessbridge::{
    BestMoveSource, ErrorReply, GameOverReply, PendingReply, Session, SubmitReply, Suggestion,
    UciMove,
};

use crate::command::{Command, parse_line};

#[derive(Serialize)]
struct MovesReply {
    moves: Vec<UciMove>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Reply {
    Submit(SubmitReply),
    Pending(PendingReply),
    Best(Suggestion),
    Over(GameOverReply),
    Moves(MovesReply),
    Error(ErrorReply),
}

/// Answers a single command; `None` ends the session.
fn dispatch<S: BestMoveSource>(session: &Session<S>, command: Command) -> Option<Reply> {
    let reply = match command {
        Command::Move { mv, display } => Reply::Submit(session.submit_move(mv, display).into()),
        Command::Pending => Reply::Pending(PendingReply {
            display: session.fetch_pending(),
        }),
        Command::Best(client) => match session.request_best_move(client.as_deref()) {
            Ok(hit) => Reply::Best(hit),
            Err(err) => Reply::Error(ErrorReply::from(&err)),
        },
        Command::Over => Reply::Over(session.query_game_over().into()),
        Command::Moves => Reply::Moves(MovesReply {
            moves: session.moves(),
        }),
        Command::Quit => return None,
    };
    Some(reply)
}

fn emit<W: Write>(output: &mut W, reply: &Reply) -> Result<()> {
    serde_json::to_writer(&mut *output, reply).context("failed to encode reply")?;
    output.write_all(b"\n").context("failed to write reply")?;
    output.flush().context("failed to flush reply")
}

/// Reads commands until `quit` or end of input.
pub fn run<S, R, W>(session: &Session<S>, input: R, mut output: W) -> Result<()>
where
    S: BestMoveSource,
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line.context("failed to read command")?;
        let reply = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                debug!("command: {command:?}");
                match dispatch(session, command) {
                    Some(reply) => reply,
                    None => {
                        info!("quit received");
                        return Ok(());
                    }
                }
            }
            Err(err) => Reply::Error(ErrorReply::from(&err)),
        };
        emit(&mut output, &reply)?;
    }
    info!("input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chessbridge::{Result as BrokerResult, StartPosition};
    use serde_json::{Value, json};

    use super::*;

    /// Always answers `g1f3`.
    struct Knight;

    impl BestMoveSource for Knight {
        fn best_move(&self, _: &StartPosition, _: &[UciMove]) -> BrokerResult<UciMove> {
            "g1f3".parse()
        }
    }

    fn transcript(script: &str) -> Vec<Value> {
        let session = Session::new(Knight);
        let mut out = Vec::new();
        run(&session, Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn scripted_game_produces_route_payloads() {
        let replies = transcript(
            "move e2e4\nmove e2e4\npending\npending\n\nmove e7e5\nbest e2e4 e7e5\nover\nmoves\nquit\nmove d2d4\n",
        );
        assert_eq!(
            replies,
            vec![
                json!({"status": "ok", "move": "e2e4"}),
                json!({"status": "duplicate"}),
                json!({"move": "e2e4"}),
                json!({"move": null}),
                json!({"status": "ok", "move": "e7e5"}),
                json!({"move": "g1f3", "formatted": "g1f3"}),
                json!({"game_over": false, "result": ""}),
                json!({"moves": ["e2e4", "e7e5"]}),
            ]
        );
    }

    #[test]
    fn errors_are_reported_inline() {
        let replies = transcript("jump\nmove e2e5\nbest e2e4\nmove e9e4\n");
        assert_eq!(replies[0]["kind"], "bad_request");
        assert_eq!(replies[1]["status"], "rejected");
        assert_eq!(replies[2]["kind"], "ledger_mismatch");
        assert_eq!(replies[3]["kind"], "invalid_move");
    }
}
