// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which paths are interesting (`filter.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) over the
//!   configured directory trees, pruning excluded subtrees (`watcher.rs`).
//! - Debouncing bursts of raw events into a single flush per quiet window.
//!
//! It does **not** know about builds or processes; it only turns filesystem
//! changes into a stream of [`FileEvent`]s for the engine.

pub mod filter;
pub mod watcher;

pub use filter::{FilterConfig, PathFilter};
pub use watcher::{FileEvent, FileOp, FileWatcher, WatcherConfig};
