// src/config/mod.rs

//! Configuration loading and validation for watchrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and merge it over the defaults
//!   (`loader.rs`).
//! - Validate basic invariants like a non-empty build command
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, exists, load_from_path, load_with_defaults, parse_duration,
    write_default,
};
pub use model::{BuildConfig, Config, LogConfig, WatchConfig};
pub use validate::validate_config;
