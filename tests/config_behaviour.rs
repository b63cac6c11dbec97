use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use watchrun::config::{
    exists, load_with_defaults, parse_duration, validate_config, write_default, Config,
};
use watchrun::errors::WatchrunError;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn default_values() {
    let cfg = Config::default();

    assert_eq!(cfg.root, ".");
    assert_eq!(cfg.tmp_dir, "tmp");
    assert_eq!(cfg.build.cmd, "go build -o ./tmp/main .");
    assert_eq!(cfg.build.bin, "./tmp/main");
    assert!(cfg.build.args.is_empty());
    assert_eq!(cfg.build.delay, Duration::from_millis(200));
    assert_eq!(cfg.build.kill_delay, Duration::from_millis(500));
    assert_eq!(cfg.watch.extensions, vec![".go"]);
    assert_eq!(cfg.watch.dirs, vec!["."]);
    assert_eq!(
        cfg.watch.exclude_dirs,
        vec!["tmp", "vendor", ".git", "node_modules"]
    );
    assert!(cfg.watch.exclude_files.is_empty());
    assert!(cfg.log.color);
    assert!(cfg.log.time);
    assert_eq!(cfg.log.level, "info");
}

#[test]
fn partial_file_merges_over_defaults() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");
    fs::write(
        &path,
        r#"
[build]
cmd = "cargo build"
delay = "50ms"
"#,
    )?;

    let cfg = load_with_defaults(&path)?;

    assert_eq!(cfg.build.cmd, "cargo build");
    assert_eq!(cfg.build.delay, Duration::from_millis(50));
    // Untouched keys keep their defaults.
    assert_eq!(cfg.build.bin, "./tmp/main");
    assert_eq!(cfg.build.kill_delay, Duration::from_millis(500));
    assert_eq!(cfg.watch.extensions, vec![".go"]);

    Ok(())
}

#[test]
fn full_file_overrides_everything() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");
    fs::write(
        &path,
        r#"
root = "/srv/app"
tmp_dir = "build-out"

[build]
cmd = "make app"
bin = "./build-out/app"
args = ["--port", "8080"]
delay = "1s"
kill_delay = "2s"

[watch]
extensions = [".rs", ".toml"]
dirs = ["src", "config"]
exclude_dirs = ["target"]
exclude_files = ["*.tmp"]

[log]
color = false
time = false
level = "debug"
"#,
    )?;

    let cfg = load_with_defaults(&path)?;

    assert_eq!(cfg.root, "/srv/app");
    assert_eq!(cfg.tmp_dir, "build-out");
    assert_eq!(cfg.build.cmd, "make app");
    assert_eq!(cfg.build.bin, "./build-out/app");
    assert_eq!(cfg.build.args, vec!["--port", "8080"]);
    assert_eq!(cfg.build.delay, Duration::from_secs(1));
    assert_eq!(cfg.build.kill_delay, Duration::from_secs(2));
    assert_eq!(cfg.watch.extensions, vec![".rs", ".toml"]);
    assert_eq!(cfg.watch.dirs, vec!["src", "config"]);
    assert_eq!(cfg.watch.exclude_dirs, vec!["target"]);
    assert_eq!(cfg.watch.exclude_files, vec!["*.tmp"]);
    assert!(!cfg.log.color);
    assert!(!cfg.log.time);
    assert_eq!(cfg.log.level, "debug");

    Ok(())
}

#[test]
fn explicit_false_boolean_overrides_default() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");
    fs::write(&path, "[log]\ncolor = false\n")?;

    let cfg = load_with_defaults(&path)?;
    assert!(!cfg.log.color);
    // Absent key keeps the default.
    assert!(cfg.log.time);

    Ok(())
}

#[test]
fn unknown_keys_are_ignored() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");
    fs::write(
        &path,
        r#"
future_option = true

[build]
cmd = "cargo build"
shiny = "yes"
"#,
    )?;

    let cfg = load_with_defaults(&path)?;
    assert_eq!(cfg.build.cmd, "cargo build");

    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let err = load_with_defaults(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, WatchrunError::Config(_)), "got {err:?}");
}

#[test]
fn validation_rejects_bad_configs() {
    let cases: Vec<(&str, Box<dyn Fn(&mut Config)>)> = vec![
        ("empty cmd", Box::new(|c| c.build.cmd = String::new())),
        ("empty bin", Box::new(|c| c.build.bin = String::new())),
        ("zero delay", Box::new(|c| c.build.delay = Duration::ZERO)),
        (
            "zero kill_delay",
            Box::new(|c| c.build.kill_delay = Duration::ZERO),
        ),
        (
            "bad log level",
            Box::new(|c| c.log.level = "verbose".to_string()),
        ),
        (
            "no extensions",
            Box::new(|c| c.watch.extensions = Vec::new()),
        ),
        ("no dirs", Box::new(|c| c.watch.dirs = Vec::new())),
    ];

    for (name, mutate) in cases {
        let mut cfg = Config::default();
        mutate(&mut cfg);
        assert!(validate_config(&cfg).is_err(), "{name} should be rejected");
    }

    assert!(validate_config(&Config::default()).is_ok());
}

#[test]
fn duration_parsing() {
    assert_eq!(parse_duration("200ms"), Ok(Duration::from_millis(200)));
    assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert_eq!(parse_duration(" 500ms "), Ok(Duration::from_millis(500)));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("200").is_err());
    assert!(parse_duration("ms").is_err());
    assert!(parse_duration("5d").is_err());
}

#[test]
fn invalid_duration_in_file_is_an_error() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");
    fs::write(&path, "[build]\ndelay = \"fast\"\n")?;

    let err = load_with_defaults(&path).unwrap_err();
    assert!(matches!(err, WatchrunError::Config(_)), "got {err:?}");

    Ok(())
}

#[test]
fn write_default_roundtrip() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Watchrun.toml");

    assert!(!exists(&path));
    write_default(&path)?;
    assert!(exists(&path));

    let cfg = load_with_defaults(&path)?;
    assert_eq!(cfg.build.cmd, "go build -o ./tmp/main .");
    assert_eq!(cfg.build.delay, Duration::from_millis(200));
    assert_eq!(cfg.watch.exclude_files, vec!["*_test.go"]);

    Ok(())
}

#[test]
fn abs_path_resolution() -> TestResult {
    let mut cfg = Config::default();
    cfg.root = ".".to_string();
    assert_eq!(cfg.abs_root()?, std::env::current_dir()?);
    assert_eq!(cfg.abs_tmp_dir()?, std::env::current_dir()?.join("tmp"));

    cfg.root = "/srv/app".to_string();
    cfg.tmp_dir = "/var/cache/build".to_string();
    assert_eq!(cfg.abs_root()?.to_string_lossy(), "/srv/app");
    assert_eq!(cfg.abs_tmp_dir()?.to_string_lossy(), "/var/cache/build");

    Ok(())
}
