// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod runner;
pub mod watch;

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{default_config_path, exists, load_with_defaults, Config};
use crate::engine::Engine;
use crate::errors::{Result, WatchrunError};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (explicit path, default path, or built-in defaults)
/// - logging
/// - the engine
/// - SIGINT/SIGTERM handling through one shared cancellation token
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };

    let cfg = if exists(&config_path) {
        load_with_defaults(&config_path)?
    } else if explicit {
        return Err(WatchrunError::Config(format!(
            "config file not found: {}",
            config_path.display()
        )));
    } else {
        Config::default()
    };

    logging::init_logging(args.log_level, &cfg.log)?;

    info!("watchrun {}", env!("CARGO_PKG_VERSION"));

    let engine = Engine::new(cfg)?;

    // SIGINT / SIGTERM cancel the shared token; the engine unwinds from it.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = wait_for_signal().await {
                eprintln!("watchrun: failed to listen for shutdown signals: {err}");
                return;
            }
            cancel.cancel();
        });
    }

    // Signal-initiated shutdown is a clean exit.
    match engine.run(&cancel).await {
        Err(WatchrunError::Cancelled) => Ok(()),
        other => other,
    }
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
