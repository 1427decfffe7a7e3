//! UCI adapter against scripted fake engines.
#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use chessbridge::types::parse_moves;
use chessbridge::{BestMoveSource, BrokerError, StartPosition, UciEngine};
use common::{FakeEngine, answering};

#[test]
fn handshake_position_and_go_are_sent_in_order() {
    let fake = FakeEngine::new(&answering("g1f3"));
    let mut cfg = fake.config(50);
    cfg.options.insert("Hash".into(), "16".into());
    let engine = UciEngine::new(cfg);

    let moves = parse_moves(["e2e4", "e7e5"]).unwrap();
    let mv = engine.best_move(&StartPosition::Standard, &moves).unwrap();
    assert_eq!(mv.to_string(), "g1f3");
    assert_eq!(
        fake.input(),
        vec![
            "spawn",
            "uci",
            "setoption name Hash value 16",
            "position startpos moves e2e4 e7e5",
            "go movetime 50",
        ]
    );
}

#[test]
fn empty_ledger_sends_bare_startpos() {
    let fake = FakeEngine::new(&answering("e2e4"));
    let engine = UciEngine::new(fake.config(10));
    engine.best_move(&StartPosition::Standard, &[]).unwrap();
    assert!(fake.input().contains(&"position startpos".to_string()));
}

#[test]
fn fen_start_is_forwarded() {
    let fen = "8/8/8/4k3/8/8/8/R3K3 w - - 0 1";
    let fake = FakeEngine::new(&answering("a1a8"));
    let engine = UciEngine::new(fake.config(10));
    let mv = engine
        .best_move(&StartPosition::Fen(fen.into()), &[])
        .unwrap();
    assert_eq!(mv.to_string(), "a1a8");
    assert!(fake.input().contains(&format!("position fen {fen}")));
}

#[test]
fn eof_before_bestmove_is_protocol_error() {
    let fake = FakeEngine::new("read -r line\necho \"id name quitter\"\nexit 0");
    let engine = UciEngine::new(fake.config(10));
    let err = engine.best_move(&StartPosition::Standard, &[]).unwrap_err();
    assert!(matches!(err, BrokerError::EngineProtocol(_)), "{err}");
}

#[test]
fn silent_engine_hits_the_read_deadline() {
    let fake = FakeEngine::new("while read -r line; do :; done");
    let mut cfg = fake.config(10);
    cfg.read_timeout_margin_ms = 200;
    let engine = UciEngine::new(cfg);

    let started = Instant::now();
    let err = engine.best_move(&StartPosition::Standard, &[]).unwrap_err();
    assert!(matches!(err, BrokerError::EngineProtocol(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn oversized_line_is_protocol_error() {
    let fake = FakeEngine::new("printf '%5000s\\n' x\nwhile read -r line; do :; done");
    let engine = UciEngine::new(fake.config(10));
    let err = engine.best_move(&StartPosition::Standard, &[]).unwrap_err();
    assert!(matches!(err, BrokerError::EngineProtocol(_)), "{err}");
    assert_eq!(err.kind(), "engine_protocol");
}

#[test]
fn bestmove_none_is_protocol_error() {
    let fake = FakeEngine::new(
        "while read -r line; do case \"$line\" in go*) echo \"bestmove (none)\" ;; esac; done",
    );
    let engine = UciEngine::new(fake.config(10));
    let err = engine.best_move(&StartPosition::Standard, &[]).unwrap_err();
    assert!(matches!(err, BrokerError::EngineProtocol(_)), "{err}");
}

#[test]
fn missing_binary_is_unavailable() {
    let fake = FakeEngine::new(&answering("e2e4"));
    let mut cfg = fake.config(10);
    cfg.path = fake.dir.path().join("no-such-engine");
    let err = UciEngine::new(cfg)
        .best_move(&StartPosition::Standard, &[])
        .unwrap_err();
    assert!(matches!(err, BrokerError::EngineUnavailable { .. }), "{err}");
    assert!(!err.is_client_error());
}
