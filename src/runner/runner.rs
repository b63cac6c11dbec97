// src/runner/runner.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, WatchrunError};
use crate::runner::signal;

/// Configuration for [`Runner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path of the executable, absolute or root-relative.
    pub bin: String,

    /// Arguments passed to the executable.
    pub args: Vec<String>,

    /// Working directory for the executable.
    pub root: PathBuf,

    /// Grace period between the interrupt signal and the forced kill.
    pub kill_delay: Duration,
}

#[derive(Debug, Default)]
struct ProcessState {
    running: bool,
    pid: Option<u32>,
    done: Option<watch::Receiver<bool>>,
}

/// Manages the lifecycle of the built executable.
///
/// At most one child is alive per runner. The state behind the mutex is
/// only held for field reads and writes, never across a blocking wait; the
/// child itself is owned by a background reaper task that flips `running`
/// back and fires the done signal when the process exits.
pub struct Runner {
    cfg: RunnerConfig,
    state: Arc<Mutex<ProcessState>>,
}

impl Runner {
    pub fn new(cfg: RunnerConfig) -> Self {
        Self {
            cfg,
            state: Arc::new(Mutex::new(ProcessState::default())),
        }
    }

    /// Launch the executable.
    ///
    /// Fails if a child is already running or the binary does not exist on
    /// disk. On POSIX the child is placed in its own process group so stop
    /// signals reach the whole subtree. The cancel token forces a kill of
    /// the child if it fires while the child is still alive.
    pub fn start(&self, cancel: &CancellationToken) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.running {
            return Err(WatchrunError::ProcessAlreadyRunning);
        }

        let bin = self.resolve_bin();
        if !bin.is_file() {
            return Err(WatchrunError::BinaryNotFound(bin));
        }

        let mut command = Command::new(&bin);
        command
            .args(&self.cfg.args)
            .current_dir(&self.cfg.root)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let pid = child.id();
        debug!(?pid, bin = %bin.display(), "child process started");

        let (done_tx, done_rx) = watch::channel(false);
        state.running = true;
        state.pid = pid;
        state.done = Some(done_rx);
        drop(state);

        // Reaper: waits for the child, then clears the state and fires the
        // done signal. Cancellation kills the child outright.
        let reaper_state = Arc::clone(&self.state);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let cancelled = tokio::select! {
                status = child.wait() => {
                    debug!(?status, "child process exited");
                    false
                }
                _ = cancel.cancelled() => true,
            };
            if cancelled {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }

            let mut state = reaper_state.lock().unwrap();
            state.running = false;
            state.pid = None;
            drop(state);
            let _ = done_tx.send(true);
        });

        Ok(())
    }

    /// Stop the child.
    ///
    /// No-op when nothing is running. Sends the graceful interrupt, waits
    /// for the earliest of a clean exit, the kill-delay elapsing, or the
    /// cancel token firing; the latter two escalate to SIGKILL. After an
    /// escalation the reaper gets one more second to observe the exit.
    pub async fn stop(&self, cancel: &CancellationToken) -> Result<()> {
        let (pid, mut done) = {
            let state = self.state.lock().unwrap();
            if !state.running {
                return Ok(());
            }
            match (state.pid, state.done.clone()) {
                (Some(pid), Some(done)) => (pid, done),
                _ => return Ok(()),
            }
        };

        signal::interrupt_process(pid);

        let kill_delay = if self.cfg.kill_delay.is_zero() {
            Duration::from_millis(500)
        } else {
            self.cfg.kill_delay
        };

        tokio::select! {
            res = done.wait_for(|exited| *exited) => {
                let _ = res;
                return Ok(());
            }
            _ = tokio::time::sleep(kill_delay) => {
                signal::kill_process(pid);
            }
            _ = cancel.cancelled() => {
                signal::kill_process(pid);
                return Err(WatchrunError::Cancelled);
            }
        }

        tokio::select! {
            res = done.wait_for(|exited| *exited) => {
                let _ = res;
                Ok(())
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => Err(WatchrunError::StopTimeout),
            _ = cancel.cancelled() => Err(WatchrunError::Cancelled),
        }
    }

    /// Stop then start; either failure short-circuits.
    pub async fn restart(&self, cancel: &CancellationToken) -> Result<()> {
        self.stop(cancel).await?;
        self.start(cancel)?;
        Ok(())
    }

    /// Snapshot of whether a child is currently alive.
    pub fn running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    fn resolve_bin(&self) -> PathBuf {
        let bin = PathBuf::from(&self.cfg.bin);
        if bin.is_absolute() {
            bin
        } else {
            self.cfg.root.join(bin)
        }
    }
}
