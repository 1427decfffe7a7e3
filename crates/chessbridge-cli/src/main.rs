mod command;
mod frontend;

use std::io::{self as stdio, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use chessbridge::{BrokerConfig, Session, StartPosition, UciEngine};

/// Line-command frontend for a chessbridge session.
///
/// Reads one command per line from stdin and answers each with one JSON
/// object on stdout. Logs go to stderr; set `RUST_LOG` to change the level.
///
/// - Play against Stockfish with a 1 s think time:
///   `chessbridge --engine /usr/bin/stockfish --think-time-ms 1000`
///
/// - Use a config file and override the engine arguments:
///   `chessbridge --config broker.toml --engine-arg=--threads=2`
#[derive(Parser, Debug)]
#[command(author, version, about = "Move ledger and UCI engine broker")]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine executable (overrides the config file)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Search time per engine query in milliseconds
    #[arg(long)]
    think_time_ms: Option<u64>,

    /// Extra argument passed to the engine process (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Start position as FEN, or `startpos`
    #[arg(long)]
    start_fen: Option<String>,
}

impl Cli {
    /// Loads the config file if given and applies flag overrides on top.
    fn resolve_config(&self) -> Result<BrokerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                BrokerConfig::from_toml_str(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => BrokerConfig::default(),
        };
        if let Some(engine) = &self.engine {
            config.engine.path = engine.clone();
        }
        if let Some(ms) = self.think_time_ms {
            config.engine.think_time_ms = ms;
        }
        if !self.engine_args.is_empty() {
            config.engine.args = self.engine_args.clone();
        }
        if let Some(fen) = &self.start_fen {
            config.session.start_fen = Some(fen.clone());
        }
        if !config.engine.is_configured() {
            bail!("no engine configured; pass --engine or set [engine] path in the config file");
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    let start: StartPosition = config.session.start_position();
    info!(
        "engine {} ({} ms per query), start {:?}",
        config.engine.path.display(),
        config.engine.think_time_ms,
        start
    );
    let session = Session::with_start(UciEngine::new(config.engine), start)
        .context("invalid start position")?;

    let stdin = stdio::stdin();
    let stdout = stdio::stdout();
    frontend::run(&session, stdin.lock(), BufWriter::new(stdout.lock()))
}
