// src/engine/mod.rs

//! Orchestration engine for watchrun.
//!
//! This module ties together:
//! - the filesystem watcher and its debounced event stream
//! - the builder that runs the external build command
//! - the runner that supervises the built executable
//! - the main loop that reacts to file changes, watcher errors, and the
//!   shutdown token
//!
//! The ordering contract inside one rebuild cycle is sequential: the old
//! process is stopped before the build starts, and the build finishes
//! before the new process starts.

pub mod runtime;

pub use runtime::Engine;
