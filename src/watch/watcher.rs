// src/watch/watcher.rs

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{Result, WatchrunError};
use crate::watch::filter::PathFilter;

/// Kind of file operation carried by a [`FileEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileOp::Create => "CREATE",
            FileOp::Write => "WRITE",
            FileOp::Remove => "REMOVE",
            FileOp::Rename => "RENAME",
            FileOp::Chmod => "CHMOD",
        };
        f.write_str(s)
    }
}

/// A debounced, filtered filesystem event.
///
/// Events are keyed by path while pending, so a burst of changes to one file
/// collapses into a single event carrying the latest op and time.
#[derive(Debug, Clone)]
pub struct FileEvent {
    pub path: PathBuf,
    pub op: FileOp,
    pub time: std::time::Instant,
}

/// Configuration for [`FileWatcher`].
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Root-relative directories to watch recursively.
    pub dirs: Vec<String>,

    /// Quiet interval after the last raw event before pending events flush.
    pub debounce: Duration,

    /// Absolute project root.
    pub root: PathBuf,

    /// Directory basenames pruned from registration at any depth.
    pub exclude_dirs: Vec<String>,
}

/// Recursive filesystem watcher with debouncing and path filtering.
///
/// `start` registers the configured directory trees (pruning excluded
/// subtrees), spawns the event loop, and hands back the outbound channels.
/// The event channel is bounded at 100 and the error channel at 10; when
/// either is full, entries are dropped (the next build reads the on-disk
/// state anyway).
pub struct FileWatcher {
    cfg: WatcherConfig,
    filter: PathFilter,
    exclude_dirs: HashSet<String>,
    inner: Arc<Mutex<Option<RecommendedWatcher>>>,
    raw_rx: Mutex<Option<mpsc::UnboundedReceiver<notify::Result<Event>>>>,
    closed: CancellationToken,
    started: Mutex<bool>,
}

impl FileWatcher {
    pub fn new(cfg: WatcherConfig, filter: PathFilter) -> Result<Self> {
        // Channel from the synchronous notify callback into the async world.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = raw_tx.send(res);
            },
            NotifyConfig::default(),
        )?;

        let exclude_dirs = cfg.exclude_dirs.iter().cloned().collect();

        Ok(Self {
            cfg,
            filter,
            exclude_dirs,
            inner: Arc::new(Mutex::new(Some(watcher))),
            raw_rx: Mutex::new(Some(raw_rx)),
            closed: CancellationToken::new(),
            started: Mutex::new(false),
        })
    }

    /// Register the watched trees and spawn the event loop.
    ///
    /// Returns the event and error receivers. Registration failure on a
    /// configured directory itself is fatal; failures deeper in a tree are
    /// reported through the error channel.
    ///
    /// Calling `start` twice is an error.
    pub fn start(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(mpsc::Receiver<FileEvent>, mpsc::Receiver<notify::Error>)> {
        {
            let mut started = self.started.lock().unwrap();
            if *started {
                return Err(WatchrunError::WatcherAlreadyStarted);
            }
            *started = true;
        }

        let raw_rx = self
            .raw_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(WatchrunError::WatcherAlreadyStarted)?;

        let (events_tx, events_rx) = mpsc::channel::<FileEvent>(100);
        let (errors_tx, errors_rx) = mpsc::channel::<notify::Error>(10);

        for dir in &self.cfg.dirs {
            let dir = self.resolve_dir(dir);
            if is_excluded(&dir, &self.exclude_dirs) {
                continue;
            }
            watch_dir(&self.inner, &dir)?;
            register_tree(&self.inner, &dir, &self.exclude_dirs, &errors_tx);
        }

        self.spawn_loop(raw_rx, events_tx, errors_tx, cancel.clone());

        Ok((events_rx, errors_rx))
    }

    /// Stop watching. Pending events are flushed once and the OS
    /// subscription is released. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    fn resolve_dir(&self, dir: &str) -> PathBuf {
        let path = PathBuf::from(dir);
        if dir == "." {
            self.cfg.root.clone()
        } else if path.is_absolute() {
            path
        } else {
            self.cfg.root.join(path)
        }
    }

    fn spawn_loop(
        &self,
        mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        events_tx: mpsc::Sender<FileEvent>,
        errors_tx: mpsc::Sender<notify::Error>,
        cancel: CancellationToken,
    ) {
        let inner = Arc::clone(&self.inner);
        let filter = self.filter.clone();
        let exclude_dirs = self.exclude_dirs.clone();
        let closed = self.closed.clone();
        let debounce = if self.cfg.debounce.is_zero() {
            Duration::from_millis(100)
        } else {
            self.cfg.debounce
        };

        tokio::spawn(async move {
            let mut pending: HashMap<PathBuf, FileEvent> = HashMap::new();
            let mut deadline: Option<Instant> = None;

            loop {
                let timer = async move {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        flush(&mut pending, &events_tx);
                        break;
                    }
                    _ = closed.cancelled() => {
                        flush(&mut pending, &events_tx);
                        break;
                    }
                    _ = timer => {
                        flush(&mut pending, &events_tx);
                        deadline = None;
                    }
                    raw = raw_rx.recv() => {
                        let Some(raw) = raw else { break };
                        match raw {
                            Err(err) => {
                                let _ = errors_tx.try_send(err);
                            }
                            Ok(event) => {
                                debug!(?event, "raw filesystem event");
                                let inserted = handle_raw_event(
                                    &event,
                                    &inner,
                                    &exclude_dirs,
                                    &filter,
                                    &errors_tx,
                                    &mut pending,
                                );
                                if inserted {
                                    deadline = Some(Instant::now() + debounce);
                                }
                            }
                        }
                    }
                }
            }

            // Release the OS subscription.
            inner.lock().unwrap().take();
            debug!("watcher loop finished");
        });
    }
}

/// Process one raw notify event: grow the watch set on directory creation,
/// filter, and record pending events keyed by path. Returns true if any
/// pending entry was added or refreshed.
fn handle_raw_event(
    event: &Event,
    inner: &Arc<Mutex<Option<RecommendedWatcher>>>,
    exclude_dirs: &HashSet<String>,
    filter: &PathFilter,
    errors_tx: &mpsc::Sender<notify::Error>,
    pending: &mut HashMap<PathBuf, FileEvent>,
) -> bool {
    let mut inserted = false;

    for path in &event.paths {
        // A freshly created directory must be registered before filtering;
        // directories carry no watched extension.
        if matches!(event.kind, EventKind::Create(_))
            && path.is_dir()
            && !is_excluded(path, exclude_dirs)
        {
            match watch_dir(inner, path) {
                Ok(()) => register_tree(inner, path, exclude_dirs, errors_tx),
                Err(err) => {
                    let _ = errors_tx.try_send(err);
                }
            }
        }

        if !filter.matches(path) {
            continue;
        }

        let op = map_op(&event.kind);
        pending.insert(
            path.clone(),
            FileEvent {
                path: path.clone(),
                op,
                time: std::time::Instant::now(),
            },
        );
        inserted = true;
    }

    inserted
}

fn flush(pending: &mut HashMap<PathBuf, FileEvent>, events_tx: &mpsc::Sender<FileEvent>) {
    for (_, evt) in pending.drain() {
        // Channel full means we drop; at least one survivor triggers the
        // rebuild and the build reads current on-disk state.
        let _ = events_tx.try_send(evt);
    }
}

fn watch_dir(
    inner: &Arc<Mutex<Option<RecommendedWatcher>>>,
    dir: &Path,
) -> std::result::Result<(), notify::Error> {
    let mut guard = inner.lock().unwrap();
    match guard.as_mut() {
        Some(watcher) => watcher.watch(dir, RecursiveMode::NonRecursive),
        None => Ok(()),
    }
}

/// Register every subdirectory of `dir`, pruning excluded basenames.
/// Failures below the top level go to the error channel.
fn register_tree(
    inner: &Arc<Mutex<Option<RecommendedWatcher>>>,
    dir: &Path,
    exclude_dirs: &HashSet<String>,
    errors_tx: &mpsc::Sender<notify::Error>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            let _ = errors_tx.try_send(notify::Error::io(err));
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || is_excluded(&path, exclude_dirs) {
            continue;
        }
        if let Err(err) = watch_dir(inner, &path) {
            let _ = errors_tx.try_send(err);
            continue;
        }
        register_tree(inner, &path, exclude_dirs, errors_tx);
    }
}

fn is_excluded(path: &Path, exclude_dirs: &HashSet<String>) -> bool {
    path.file_name()
        .map(|base| exclude_dirs.contains(&base.to_string_lossy().to_string()))
        .unwrap_or(false)
}

/// Map a raw notify kind onto our op set. Creation wins over modification,
/// unknown kinds default to `Write`.
fn map_op(kind: &EventKind) -> FileOp {
    match kind {
        EventKind::Create(_) => FileOp::Create,
        EventKind::Modify(ModifyKind::Name(_)) => FileOp::Rename,
        EventKind::Modify(ModifyKind::Metadata(_)) => FileOp::Chmod,
        EventKind::Modify(_) => FileOp::Write,
        EventKind::Remove(_) => FileOp::Remove,
        _ => FileOp::Write,
    }
}
