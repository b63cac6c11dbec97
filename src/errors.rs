// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchrunError {
    #[error("config error: {0}")]
    Config(String),

    #[error("engine already running")]
    EngineAlreadyRunning,

    #[error("process already running")]
    ProcessAlreadyRunning,

    #[error("binary not found: {0}")]
    BinaryNotFound(PathBuf),

    #[error("watcher already started")]
    WatcherAlreadyStarted,

    #[error("build failed")]
    BuildFailed,

    #[error("cancelled")]
    Cancelled,

    #[error("process did not exit after SIGKILL")]
    StopTimeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchrunError>;
