// src/config/validate.rs

use crate::config::model::Config;
use crate::errors::{Result, WatchrunError};

/// Run semantic validation against a merged configuration.
///
/// This checks:
/// - the build command and binary path are non-empty
/// - `delay` and `kill_delay` are positive
/// - the log level is one of debug, info, warn, error
/// - at least one extension and one watch directory are configured
pub fn validate_config(cfg: &Config) -> Result<()> {
    validate_build(cfg)?;
    validate_watch(cfg)?;
    validate_log(cfg)?;
    Ok(())
}

fn validate_build(cfg: &Config) -> Result<()> {
    if cfg.build.cmd.trim().is_empty() {
        return Err(WatchrunError::Config(
            "build command cannot be empty".to_string(),
        ));
    }
    if cfg.build.bin.trim().is_empty() {
        return Err(WatchrunError::Config(
            "binary path cannot be empty".to_string(),
        ));
    }
    if cfg.build.delay.is_zero() {
        return Err(WatchrunError::Config("delay must be positive".to_string()));
    }
    if cfg.build.kill_delay.is_zero() {
        return Err(WatchrunError::Config(
            "kill_delay must be positive".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &Config) -> Result<()> {
    if cfg.watch.extensions.is_empty() {
        return Err(WatchrunError::Config(
            "at least one file extension must be specified".to_string(),
        ));
    }
    if cfg.watch.dirs.is_empty() {
        return Err(WatchrunError::Config(
            "at least one watch directory must be specified".to_string(),
        ));
    }
    Ok(())
}

fn validate_log(cfg: &Config) -> Result<()> {
    match cfg.log.level.as_str() {
        "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(WatchrunError::Config(format!(
            "log level must be one of: debug, info, warn, error (got '{other}')"
        ))),
    }
}
