//! Test logging configuration

use std::sync::Once;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Install a test-writer subscriber at `level` (`RUST_LOG` wins).
/// Only the first call in a test process has an effect.
pub fn init_test_logging(level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Equivalent to `init_test_logging("error")`
pub fn suppress_logs() {
    init_test_logging("error");
}
