// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::Result;

/// Default config file name looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Watchrun.toml";

/// Fully resolved configuration handed to the engine.
///
/// All durations are parsed and all defaults applied; this is what the rest
/// of the crate works with. The raw TOML shape lives in [`ConfigFile`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root directory. `""` or `"."` means the current directory.
    pub root: String,

    /// Directory for build artifacts, absolute or root-relative.
    pub tmp_dir: String,

    pub build: BuildConfig,
    pub watch: WatchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Build command line, parsed with a minimal quoting rule per build.
    pub cmd: String,

    /// Path of the built executable, absolute or root-relative.
    pub bin: String,

    /// Arguments passed to the executable on launch.
    pub args: Vec<String>,

    /// Debounce window between a file change and the rebuild.
    pub delay: Duration,

    /// Grace period between the interrupt signal and the forced kill.
    pub kill_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// File suffixes to watch, normalised to start with `.` by the filter.
    pub extensions: Vec<String>,

    /// Root-relative directories to watch recursively.
    pub dirs: Vec<String>,

    /// Directory basenames pruned from watching at any depth.
    pub exclude_dirs: Vec<String>,

    /// Glob patterns matched against the filename and the relative path.
    pub exclude_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub color: bool,
    pub time: bool,
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            tmp_dir: "tmp".to_string(),
            build: BuildConfig {
                cmd: "go build -o ./tmp/main .".to_string(),
                bin: "./tmp/main".to_string(),
                args: Vec::new(),
                delay: Duration::from_millis(200),
                kill_delay: Duration::from_millis(500),
            },
            watch: WatchConfig {
                extensions: vec![".go".to_string()],
                dirs: vec![".".to_string()],
                exclude_dirs: vec![
                    "tmp".to_string(),
                    "vendor".to_string(),
                    ".git".to_string(),
                    "node_modules".to_string(),
                ],
                exclude_files: Vec::new(),
            },
            log: LogConfig {
                color: true,
                time: true,
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Absolute path of the project root.
    pub fn abs_root(&self) -> Result<PathBuf> {
        if self.root.is_empty() || self.root == "." {
            return Ok(std::env::current_dir()?);
        }
        Ok(std::path::absolute(&self.root)?)
    }

    /// Absolute path of the tmp directory, resolved against the root when
    /// relative.
    pub fn abs_tmp_dir(&self) -> Result<PathBuf> {
        let tmp = PathBuf::from(&self.tmp_dir);
        if tmp.is_absolute() {
            return Ok(tmp);
        }
        Ok(self.abs_root()?.join(tmp))
    }
}

/// Top-level configuration as read from a TOML file.
///
/// Every field is optional so a partial file can be merged over
/// [`Config::default`]. Durations are human-readable strings (`"200ms"`,
/// `"1s"`) and booleans are `Option<bool>` so an explicit `false` is
/// distinguishable from an absent key.
///
/// ```toml
/// tmp_dir = "tmp"
///
/// [build]
/// cmd = "go build -o ./tmp/main ."
/// delay = "200ms"
///
/// [watch]
/// extensions = [".go"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub root: Option<String>,

    #[serde(default)]
    pub tmp_dir: Option<String>,

    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub log: LogSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    #[serde(default)]
    pub cmd: Option<String>,

    #[serde(default)]
    pub bin: Option<String>,

    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Duration string, e.g. `"200ms"`.
    #[serde(default)]
    pub delay: Option<String>,

    /// Duration string, e.g. `"500ms"`.
    #[serde(default)]
    pub kill_delay: Option<String>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    #[serde(default)]
    pub dirs: Option<Vec<String>>,

    #[serde(default)]
    pub exclude_dirs: Option<Vec<String>>,

    #[serde(default)]
    pub exclude_files: Option<Vec<String>>,
}

/// `[log]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    #[serde(default)]
    pub color: Option<bool>,

    #[serde(default)]
    pub time: Option<bool>,

    #[serde(default)]
    pub level: Option<String>,
}
