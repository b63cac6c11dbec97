// src/engine/runtime.rs

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::build::{Builder, BuilderConfig};
use crate::config::Config;
use crate::errors::{Result, WatchrunError};
use crate::runner::{Runner, RunnerConfig};
use crate::watch::{FileWatcher, FilterConfig, PathFilter, WatcherConfig};

/// The watch-build-run orchestrator.
///
/// Owns the watcher, builder, and runner for the duration of [`Engine::run`].
/// Per-cycle failures (build errors, start errors, stop timeouts) are logged
/// and swallowed so the developer loop survives; structural failures and
/// cancellation surface to the caller.
pub struct Engine {
    cfg: Config,
    root: PathBuf,
    builder: Builder,
    runner: Runner,
    watcher: FileWatcher,
    running: Mutex<bool>,
}

impl Engine {
    /// Build an engine from a validated configuration.
    ///
    /// Resolves root and tmp_dir to absolute paths and constructs every
    /// subsystem; a watcher or filter construction failure is fatal.
    pub fn new(cfg: Config) -> Result<Self> {
        let root = cfg.abs_root()?;
        let tmp_dir = cfg.abs_tmp_dir()?;

        let builder = Builder::new(BuilderConfig {
            cmd: cfg.build.cmd.clone(),
            bin: cfg.build.bin.clone(),
            tmp_dir,
            root: root.clone(),
        });

        let runner = Runner::new(RunnerConfig {
            bin: cfg.build.bin.clone(),
            args: cfg.build.args.clone(),
            root: root.clone(),
            kill_delay: cfg.build.kill_delay,
        });

        let filter = PathFilter::new(FilterConfig {
            extensions: cfg.watch.extensions.clone(),
            exclude_dirs: cfg.watch.exclude_dirs.clone(),
            exclude_files: cfg.watch.exclude_files.clone(),
            root: root.clone(),
        })?;

        let watcher = FileWatcher::new(
            WatcherConfig {
                dirs: cfg.watch.dirs.clone(),
                debounce: cfg.build.delay,
                root: root.clone(),
                exclude_dirs: cfg.watch.exclude_dirs.clone(),
            },
            filter,
        )?;

        Ok(Self {
            cfg,
            root,
            builder,
            runner,
            watcher,
            running: Mutex::new(false),
        })
    }

    /// Run the main loop until the cancel token fires or the watcher ends.
    ///
    /// A second concurrent `run` fails with `EngineAlreadyRunning`. An
    /// initial build failure is logged but not fatal; the loop keeps
    /// processing file changes so a fixed source tree recovers on its own.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        {
            let mut running = self.running.lock().unwrap();
            if *running {
                return Err(WatchrunError::EngineAlreadyRunning);
            }
            *running = true;
        }

        let result = self.run_loop(cancel).await;

        self.watcher.close();
        *self.running.lock().unwrap() = false;
        result
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> Result<()> {
        for dir in &self.cfg.watch.dirs {
            let abs = if PathBuf::from(dir).is_absolute() {
                PathBuf::from(dir)
            } else {
                self.root.join(dir)
            };
            info!("watching: {}", abs.display());
        }

        if !self.cfg.watch.exclude_dirs.is_empty() {
            info!("excluding: {:?}", self.cfg.watch.exclude_dirs);
        }

        let (mut events_rx, mut errors_rx) = self.watcher.start(cancel)?;

        if let Err(err) = self.build_and_run(cancel).await {
            error!("initial build failed: {err}");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutting down...");
                    let stop_token = deadline_token(Duration::from_secs(5));
                    let _ = self.runner.stop(&stop_token).await;
                    return Err(WatchrunError::Cancelled);
                }

                evt = events_rx.recv() => {
                    let Some(evt) = evt else { return Ok(()) };
                    let rel = evt.path.strip_prefix(&self.root).unwrap_or(evt.path.as_path());
                    info!("{} changed", rel.display());

                    if let Err(err) = self.build_and_run(cancel).await {
                        error!("rebuild failed: {err}");
                    }
                }

                err = errors_rx.recv() => {
                    let Some(err) = err else { return Ok(()) };
                    error!("watcher error: {err}");
                }
            }
        }
    }

    /// One rebuild cycle: stop the old process, build, start the new one.
    async fn build_and_run(&self, cancel: &CancellationToken) -> Result<()> {
        if self.runner.running() {
            let stop_token = deadline_token(self.cfg.build.kill_delay * 2);
            if let Err(err) = self.runner.stop(&stop_token).await {
                warn!("failed to stop process: {err}");
            }
        }

        info!("building...");
        let result = self.builder.build(cancel).await;

        if !result.success {
            if !result.output.is_empty() {
                error!("build output:\n{}", result.output);
            }
            error!("✗ build failed ({:.2}s)", result.duration.as_secs_f64());
            return Err(result.error.unwrap_or(WatchrunError::BuildFailed));
        }

        info!("✓ build completed ({:.2}s)", result.duration.as_secs_f64());

        if let Err(err) = self.runner.start(cancel) {
            error!("✗ failed to start: {err}");
            return Err(err);
        }

        info!("✓ running {}", self.cfg.build.bin);
        Ok(())
    }

    /// Programmatic shutdown: stop the child, then close the watcher.
    /// No-op when the engine is not running.
    pub async fn stop(&self, cancel: &CancellationToken) -> Result<()> {
        if !*self.running.lock().unwrap() {
            return Ok(());
        }

        self.runner.stop(cancel).await?;
        self.watcher.close();
        Ok(())
    }
}

/// A token that cancels itself after the given duration, used to put a
/// deadline on a stop attempt.
fn deadline_token(after: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        timer.cancel();
    });
    token
}
