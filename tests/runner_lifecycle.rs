#![cfg(unix)]

mod common;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use common::init_tracing;
use watchrun::errors::WatchrunError;
use watchrun::runner::{Runner, RunnerConfig};

type TestResult = Result<(), Box<dyn Error>>;

fn write_script(root: &Path, name: &str, body: &str) -> TestResult {
    use std::os::unix::fs::PermissionsExt;
    let path = root.join(name);
    fs::write(&path, body)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

fn runner_for(root: &Path, bin: &str, kill_delay: Duration) -> Runner {
    Runner::new(RunnerConfig {
        bin: bin.to_string(),
        args: Vec::new(),
        root: root.to_path_buf(),
        kill_delay,
    })
}

/// Poll until the condition holds or the deadline passes.
async fn wait_until<F: Fn() -> bool>(cond: F, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    cond()
}

#[tokio::test]
async fn start_stop_lifecycle() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_script(
        dir.path(),
        "app.sh",
        "#!/bin/sh\nwhile true; do sleep 0.1; done\n",
    )?;

    let runner = runner_for(dir.path(), "./app.sh", Duration::from_millis(100));
    let cancel = CancellationToken::new();

    runner.start(&cancel)?;
    assert!(runner.running());

    // At most one child per runner.
    let err = runner.start(&cancel).unwrap_err();
    assert!(matches!(err, WatchrunError::ProcessAlreadyRunning));
    assert!(runner.running());

    runner.stop(&cancel).await?;
    assert!(
        wait_until(|| !runner.running(), Duration::from_secs(2)).await,
        "runner must report not running after stop"
    );

    Ok(())
}

#[tokio::test]
async fn stop_when_not_running_is_a_noop() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let runner = runner_for(dir.path(), "./missing.sh", Duration::from_millis(100));
    let cancel = CancellationToken::new();

    runner.stop(&cancel).await?;
    runner.stop(&cancel).await?;
    assert!(!runner.running());

    Ok(())
}

#[tokio::test]
async fn start_fails_for_missing_binary() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    let runner = runner_for(dir.path(), "./does-not-exist", Duration::from_millis(100));
    let err = runner.start(&CancellationToken::new()).unwrap_err();
    assert!(matches!(err, WatchrunError::BinaryNotFound(_)), "got {err:?}");
    assert!(!runner.running());

    Ok(())
}

#[tokio::test]
async fn natural_exit_clears_running() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_script(dir.path(), "oneshot.sh", "#!/bin/sh\nexit 0\n")?;

    let runner = runner_for(dir.path(), "./oneshot.sh", Duration::from_millis(100));
    runner.start(&CancellationToken::new())?;

    assert!(
        wait_until(|| !runner.running(), Duration::from_secs(2)).await,
        "reaper must observe the natural exit"
    );

    Ok(())
}

#[tokio::test]
async fn restart_replaces_the_process() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let log: PathBuf = dir.path().join("runs.log");
    write_script(
        dir.path(),
        "app.sh",
        "#!/bin/sh\necho started >> runs.log\nwhile true; do sleep 0.1; done\n",
    )?;

    let count_runs = {
        let log = log.clone();
        move || {
            fs::read_to_string(&log)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }
    };

    let runner = runner_for(dir.path(), "./app.sh", Duration::from_millis(100));
    let cancel = CancellationToken::new();

    runner.start(&cancel)?;
    assert!(wait_until(|| count_runs() == 1, Duration::from_secs(2)).await);

    runner.restart(&cancel).await?;
    assert!(
        wait_until(|| count_runs() == 2, Duration::from_secs(2)).await,
        "restart must launch a fresh process"
    );
    assert!(runner.running());

    runner.stop(&cancel).await?;
    Ok(())
}

#[tokio::test]
async fn stubborn_child_is_killed_within_bounds() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_script(
        dir.path(),
        "stubborn.sh",
        "#!/bin/sh\ntrap '' INT TERM\nwhile true; do sleep 0.05; done\n",
    )?;

    let kill_delay = Duration::from_millis(200);
    let runner = runner_for(dir.path(), "./stubborn.sh", kill_delay);
    let cancel = CancellationToken::new();

    runner.start(&cancel)?;
    assert!(wait_until(|| runner.running(), Duration::from_secs(1)).await);

    let started = Instant::now();
    runner.stop(&cancel).await?;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= kill_delay,
        "graceful window must elapse before the kill, took {elapsed:?}"
    );
    assert!(
        elapsed < kill_delay + Duration::from_secs(2),
        "stop must be bounded by kill_delay plus the post-kill wait, took {elapsed:?}"
    );
    assert!(wait_until(|| !runner.running(), Duration::from_secs(1)).await);

    Ok(())
}

#[tokio::test]
async fn cancelled_token_escalates_immediately() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    write_script(
        dir.path(),
        "app.sh",
        "#!/bin/sh\ntrap '' INT\nwhile true; do sleep 0.05; done\n",
    )?;

    let runner = runner_for(dir.path(), "./app.sh", Duration::from_secs(10));
    let start_cancel = CancellationToken::new();
    runner.start(&start_cancel)?;

    let stop_cancel = CancellationToken::new();
    stop_cancel.cancel();

    let started = Instant::now();
    let err = runner.stop(&stop_cancel).await.unwrap_err();
    assert!(matches!(err, WatchrunError::Cancelled), "got {err:?}");
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "a cancelled stop must not wait out the kill delay"
    );

    assert!(
        wait_until(|| !runner.running(), Duration::from_secs(2)).await,
        "escalation must still take the child down"
    );

    Ok(())
}
