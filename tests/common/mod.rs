use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Install the tracing subscriber once per test binary.
///
/// Goes through the test writer, so output only surfaces for failing tests
/// (or under `--nocapture`). Set `RUST_LOG` to raise the level, e.g.
/// `RUST_LOG=debug cargo test`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .init();
    });
}
