// src/build/mod.rs

//! Build command execution.
//!
//! Runs the configured external build command with `tokio::process`,
//! captures its output, and reports a [`BuildResult`]. Cancellation kills
//! the in-flight compiler process.

pub mod builder;

pub use builder::{parse_command, BuildResult, Builder, BuilderConfig};
