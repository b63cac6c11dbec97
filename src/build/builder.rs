// src/build/builder.rs

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, WatchrunError};
use crate::runner::signal;

/// Outcome of one build invocation.
///
/// `output` is stdout followed by stderr, separated by a newline when both
/// are non-empty.
#[derive(Debug)]
pub struct BuildResult {
    pub success: bool,
    pub output: String,
    pub duration: Duration,
    pub error: Option<WatchrunError>,
}

impl BuildResult {
    fn failure(output: String, duration: Duration, error: WatchrunError) -> Self {
        Self {
            success: false,
            output,
            duration,
            error: Some(error),
        }
    }
}

/// Configuration for [`Builder`].
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Build command line, e.g. `go build -o ./tmp/main .`.
    pub cmd: String,

    /// Path of the built executable, absolute or root-relative.
    pub bin: String,

    /// Directory ensured to exist before each build.
    pub tmp_dir: PathBuf,

    /// Working directory for the build command.
    pub root: PathBuf,
}

/// Executes the external build command and manages the built artifact.
#[derive(Debug, Clone)]
pub struct Builder {
    cfg: BuilderConfig,
}

impl Builder {
    pub fn new(cfg: BuilderConfig) -> Self {
        Self { cfg }
    }

    /// Run the build command once.
    ///
    /// Never returns `Err`: failures are reported inside the result so the
    /// engine can log output and keep its loop alive.
    pub async fn build(&self, cancel: &CancellationToken) -> BuildResult {
        let start = Instant::now();

        if let Err(err) = tokio::fs::create_dir_all(&self.cfg.tmp_dir).await {
            return BuildResult::failure(
                String::new(),
                start.elapsed(),
                WatchrunError::Other(
                    anyhow::Error::new(err)
                        .context(format!("create tmp dir {:?}", self.cfg.tmp_dir)),
                ),
            );
        }

        let args = parse_command(&self.cfg.cmd);
        if args.is_empty() {
            return BuildResult::failure(
                String::new(),
                start.elapsed(),
                WatchrunError::Config("empty build command".to_string()),
            );
        }

        debug!(cmd = %self.cfg.cmd, "spawning build command");

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .current_dir(&self.cfg.root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                return BuildResult::failure(String::new(), start.elapsed(), err.into());
            }
        };
        let pid = child.id();

        // Even a cancelled build is waited out: the child is killed, then
        // its exit status and whatever output it already produced are
        // collected before the result is classified.
        let output_fut = child.wait_with_output();
        tokio::pin!(output_fut);

        let output = tokio::select! {
            out = &mut output_fut => out,
            _ = cancel.cancelled() => {
                if let Some(pid) = pid {
                    signal::kill_process(pid);
                }
                (&mut output_fut).await
            }
        };

        let duration = start.elapsed();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                return BuildResult::failure(String::new(), duration, err.into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = stdout.to_string();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        if !output.status.success() {
            let error = if cancel.is_cancelled() {
                WatchrunError::Cancelled
            } else {
                WatchrunError::BuildFailed
            };
            return BuildResult::failure(combined, duration, error);
        }

        BuildResult {
            success: true,
            output: combined,
            duration,
            error: None,
        }
    }

    /// Remove the built binary. A missing file is not an error.
    pub fn clean(&self) -> Result<()> {
        let bin = PathBuf::from(&self.cfg.bin);
        let bin = if bin.is_absolute() {
            bin
        } else {
            self.cfg.root.join(bin)
        };

        match std::fs::remove_file(&bin) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Split a command string into arguments.
///
/// Tokens split on unquoted whitespace; `"` and `'` delimit literal spans
/// and a quote inside a different-quote span is literal. This is not a full
/// shell parser.
pub fn parse_command(cmd: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in cmd.chars() {
        match c {
            '"' | '\'' => match quote {
                Some(q) if q == c => quote = None,
                Some(_) => current.push(c),
                None => quote = Some(c),
            },
            c if c.is_whitespace() && quote.is_none() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}
