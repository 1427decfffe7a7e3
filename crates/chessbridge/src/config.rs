//! Broker configuration, loadable from TOML.
//!
//! ```toml
//! [engine]
//! path = "/usr/local/bin/stockfish"
//! think_time_ms = 2000
//!
//! [engine.options]
//! Threads = "2"
//!
//! [session]
//! start_fen = "startpos"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::position::StartPosition;

pub const DEFAULT_THINK_TIME_MS: u64 = 2000;
pub const DEFAULT_READ_TIMEOUT_MARGIN_MS: u64 = 3000;
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;
/// Lines buffered between the engine reader thread and the query.
pub const DEFAULT_LINE_BUFFER: usize = 256;

/// How to launch and drive the external engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable. Empty means "not configured".
    pub path: PathBuf,
    pub args: Vec<String>,
    /// Fixed search time passed as `go movetime`.
    pub think_time_ms: u64,
    /// Extra time allowed for the `bestmove` line on top of the think time.
    pub read_timeout_margin_ms: u64,
    /// Longest accepted output line, newline excluded.
    pub max_line_bytes: usize,
    pub line_buffer: usize,
    /// Sent as `setoption name <key> value <value>` after the handshake.
    pub options: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            args: Vec::new(),
            think_time_ms: DEFAULT_THINK_TIME_MS,
            read_timeout_margin_ms: DEFAULT_READ_TIMEOUT_MARGIN_MS,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            line_buffer: DEFAULT_LINE_BUFFER,
            options: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }

    /// How long to wait for the `bestmove` line after `go movetime`.
    pub fn read_timeout(&self, think_time_ms: u64) -> Duration {
        Duration::from_millis(think_time_ms.saturating_add(self.read_timeout_margin_ms))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// FEN of the start position; absent or `startpos` for the standard one.
    pub start_fen: Option<String>,
}

impl SessionConfig {
    pub fn start_position(&self) -> StartPosition {
        StartPosition::from_fen_opt(self.start_fen.as_deref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub engine: EngineConfig,
    pub session: SessionConfig,
}

impl BrokerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
