//! Scripted fake engines for integration tests.

#![allow(dead_code)] // Not every test file uses every helper

use std::path::{Path, PathBuf};

use chessbridge::EngineConfig;
use tempfile::TempDir;

/// A fake engine script plus the file it appends its input to.
pub struct FakeEngine {
    pub dir: TempDir,
    pub script: PathBuf,
    pub log: PathBuf,
}

impl FakeEngine {
    /// Writes `body` as a shell script. `$LOG` inside the body expands to the
    /// input log path.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("engine.sh");
        let log = dir.path().join("input.log");
        let text = format!("#!/bin/sh\nLOG='{}'\n{body}\n", log.display());
        std::fs::write(&script, text).expect("write fake engine");
        Self { dir, script, log }
    }

    /// Config running the script through `/bin/sh`, so the freshly written
    /// file never has to be executed directly.
    pub fn config(&self, think_time_ms: u64) -> EngineConfig {
        let mut cfg = EngineConfig::with_path("/bin/sh");
        cfg.args = vec![self.script.display().to_string()];
        cfg.think_time_ms = think_time_ms;
        cfg.read_timeout_margin_ms = 2000;
        cfg
    }

    /// Lines the engine has received so far.
    pub fn input(&self) -> Vec<String> {
        read_lines(&self.log)
    }

    /// Number of processes started, counted from `spawn` markers in the log.
    pub fn spawns(&self) -> usize {
        self.input().iter().filter(|l| *l == "spawn").count()
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Logs every input line and answers `go` with a fixed move.
pub fn answering(mv: &str) -> String {
    format!(
        r#"echo spawn >> "$LOG"
while IFS= read -r line; do
  printf '%s\n' "$line" >> "$LOG"
  case "$line" in
    uci) echo "id name fake"; echo "uciok" ;;
    go*) echo "info depth 1 score cp 12 pv {mv}"; echo "bestmove {mv} ponder a7a6" ;;
  esac
done"#
    )
}
