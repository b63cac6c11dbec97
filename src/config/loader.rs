// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{Config, ConfigFile, DEFAULT_CONFIG_FILE};
use crate::config::validate::validate_config;
use crate::errors::{Result, WatchrunError};

/// Load a configuration file from a given path and return the raw
/// [`ConfigFile`].
///
/// This only performs TOML deserialization; use [`load_with_defaults`] to
/// get a merged, validated [`Config`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| WatchrunError::Config(format!("reading config file {path:?}: {e}")))?;

    let file: ConfigFile = toml::from_str(&contents)?;
    Ok(file)
}

/// Load a configuration file, merge it over the built-in defaults, and
/// validate the result.
///
/// This is the entry point the CLI uses: a partial file only overrides the
/// keys it sets, everything else keeps its default.
pub fn load_with_defaults(path: impl AsRef<Path>) -> Result<Config> {
    let raw = load_from_path(&path)?;
    let cfg = merge(Config::default(), raw)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge(mut cfg: Config, raw: ConfigFile) -> Result<Config> {
    if let Some(root) = raw.root {
        if !root.is_empty() {
            cfg.root = root;
        }
    }
    if let Some(tmp_dir) = raw.tmp_dir {
        if !tmp_dir.is_empty() {
            cfg.tmp_dir = tmp_dir;
        }
    }

    if let Some(cmd) = raw.build.cmd {
        cfg.build.cmd = cmd;
    }
    if let Some(bin) = raw.build.bin {
        cfg.build.bin = bin;
    }
    if let Some(args) = raw.build.args {
        cfg.build.args = args;
    }
    if let Some(delay) = raw.build.delay {
        cfg.build.delay = parse_duration(&delay)
            .map_err(|e| WatchrunError::Config(format!("parse build.delay: {e}")))?;
    }
    if let Some(kill_delay) = raw.build.kill_delay {
        cfg.build.kill_delay = parse_duration(&kill_delay)
            .map_err(|e| WatchrunError::Config(format!("parse build.kill_delay: {e}")))?;
    }

    if let Some(extensions) = raw.watch.extensions {
        cfg.watch.extensions = extensions;
    }
    if let Some(dirs) = raw.watch.dirs {
        cfg.watch.dirs = dirs;
    }
    if let Some(exclude_dirs) = raw.watch.exclude_dirs {
        cfg.watch.exclude_dirs = exclude_dirs;
    }
    if let Some(exclude_files) = raw.watch.exclude_files {
        cfg.watch.exclude_files = exclude_files;
    }

    if let Some(color) = raw.log.color {
        cfg.log.color = color;
    }
    if let Some(time) = raw.log.time {
        cfg.log.time = time;
    }
    if let Some(level) = raw.log.level {
        if !level.is_empty() {
            cfg.log.level = level;
        }
    }

    Ok(cfg)
}

/// Parse a duration string like `"200ms"`, `"1s"`, `"2m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}

/// Default config path: `Watchrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Whether a config file exists at the given path.
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Write a commented default configuration file, used by `watchrun init`.
pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
    let content = r#"# watchrun configuration file

# Project root directory
root = "."

# Temporary directory for build artifacts
tmp_dir = "tmp"

[build]
# Build command
cmd = "go build -o ./tmp/main ."
# Binary to execute
bin = "./tmp/main"
# Arguments to pass to the binary
args = []
# Delay before building after a file change (debounce)
delay = "200ms"
# Grace period for process termination
kill_delay = "500ms"

[watch]
# File extensions to watch
extensions = [".go"]
# Directories to watch
dirs = ["."]
# Directories to exclude
exclude_dirs = ["tmp", "vendor", ".git", "node_modules"]
# Files to exclude (glob patterns)
exclude_files = ["*_test.go"]

[log]
# Enable colored output
color = true
# Show timestamps
time = true
# Log level: debug, info, warn, error
level = "info"
"#;
    fs::write(path.as_ref(), content)?;
    Ok(())
}
