//! pester - annoy your coworkers from a terminal
//!
//! Serves a websocket endpoint that coworkers' clients connect to, and turns
//! the operator's keystrokes into behaviors that are broadcast to every
//! connected client once per tick.

use clap::{Parser as ClapParser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use pester::{
    config::{self, Config, ConfigError},
    display, operator,
    scheduler::TickScheduler,
    server, terminal,
};

/// pester - annoy your coworkers from a terminal
#[derive(ClapParser, Debug)]
#[command(name = "pester", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Address to bind the HTTP/WebSocket server [default: 0.0.0.0:3000]
    #[arg(long, env = "PESTER_BIND")]
    bind: Option<SocketAddr>,

    /// Config file [default: <config dir>/pester/config.toml]
    #[arg(long, env = "PESTER_CONFIG")]
    config: Option<PathBuf>,

    /// Milliseconds between ticks
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Maximum number of connected coworkers
    #[arg(long)]
    max_peers: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration as TOML and exit
    PrintConfig,
}

#[derive(Error, Debug)]
pub enum PesterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("terminal error: {0}")]
    Terminal(#[from] terminal::TerminalError),

    #[error("task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), PesterError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::PrintConfig) => {
            let config = resolve_config(&cli)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        None => {
            init_tracing(cli.log_file.as_deref())?;
            let config = resolve_config(&cli)?;
            run_server(config).await
        }
    }
}

/// Layer CLI flags over the config file over built-in defaults.
fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match cli.config.clone().or_else(config::default_path) {
        Some(path) => Config::load_or_default(&path)?,
        None => Config::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.schedule.tick_ms = tick_ms;
    }
    if let Some(max_peers) = cli.max_peers {
        config.server.max_peers = max_peers;
    }
    config.validate()?;
    Ok(config)
}

/// The status screen owns the terminal, so logs go to a file when one is
/// given and otherwise to stderr at a quieter level.
fn init_tracing(log_file: Option<&std::path::Path>) -> Result<(), PesterError> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new(
                    std::env::var("RUST_LOG").unwrap_or_else(|_| "pester=info,tower_http=info".into()),
                ))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::EnvFilter::new(
                    std::env::var("RUST_LOG").unwrap_or_else(|_| "pester=warn".into()),
                ))
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

async fn run_server(config: Config) -> Result<(), PesterError> {
    tracing::info!("pester starting");

    let interpreter = config.interpreter()?;
    let addr = config.server.bind;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| PesterError::Bind { addr, source })?;

    let shutdown = CancellationToken::new();
    let scheduler = TickScheduler::new(config.schedule.to_schedule());
    let server = server::start(listener, scheduler, config.server.max_peers, shutdown.clone())?;

    let raw_mode = terminal::RawModeGuard::new()?;
    let (key_tx, key_rx) = mpsc::channel(64);
    let reader = terminal::spawn_key_reader(key_tx);
    let renderer = display::spawn_renderer(server.console.clone(), config.keys.clone(), shutdown.clone());
    let operator = tokio::spawn(operator::run_operator(
        key_rx,
        server.console.clone(),
        interpreter,
        server.broker.clone(),
        shutdown.clone(),
    ));

    // Wait for Ctrl+C from the console or SIGINT from outside
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT");
        }
        _ = shutdown.cancelled() => {}
    }

    server.shutdown().await?;
    operator.await?;
    renderer.await?;
    // The reader notices the dropped receiver on its next poll timeout
    reader.await?;

    drop(raw_mode);
    println!();
    tracing::info!("pester exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pester").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_overrides_invalid_file_value() {
        let file = config_file("[server]\nmax_peers = 0\n");
        let path = file.path().to_str().unwrap();

        let config = resolve_config(&cli(&["--config", path, "--max-peers", "8"])).unwrap();
        assert_eq!(config.server.max_peers, 8);

        let err = resolve_config(&cli(&["--config", path])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn file_overrides_defaults_and_cli_overrides_file() {
        let file = config_file("[schedule]\ntick_ms = 250\n[server]\nbind = \"127.0.0.1:4000\"\n");
        let path = file.path().to_str().unwrap();

        let config = resolve_config(&cli(&["--config", path, "--tick-ms", "50"])).unwrap();
        assert_eq!(config.schedule.tick_ms, 50);
        assert_eq!(config.server.bind.port(), 4000);
        assert_eq!(config.server.max_peers, config::DEFAULT_MAX_PEERS);
    }
}
