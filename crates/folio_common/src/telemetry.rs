//! Telemetry and logging initialization
//!
//! Structured logging with `tracing` and `tracing-subscriber`.
//! stdout carries JSON-RPC traffic only, so every log line goes to stderr.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing subscriber with appropriate configuration
///
/// # Arguments
/// * `verbose` - If true, sets log level to DEBUG, otherwise INFO
/// * `json_format` - If true, outputs logs in JSON format for machine parsing
///
/// `RUST_LOG` takes precedence over both when set. Calling this twice is a
/// no-op for the second call.
///
/// # Example
/// ```
/// folio_common::telemetry::init_tracing(false, false);
/// tracing::info!("Application started");
/// ```
pub fn init_tracing(verbose: bool, json_format: bool) {
    let filter_level = if verbose {
        "debug,hyper=info,reqwest=info,tokio=info"
    } else {
        "info"
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_level));

    let result = if json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .with(env_filter)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!("Tracing already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(false, false);
        // Second call must not panic
        init_tracing(true, true);
    }
}
