//! Logging configuration using tracing
//!
//! Structured logging to stderr with support for the RUST_LOG environment variable.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when RUST_LOG is unset
const DEFAULT_FILTER: &str = "airscope=info,warn";

/// Initialize the tracing subscriber
///
/// Sets up structured logging with:
/// - Filtering via RUST_LOG (defaults to info for this crate, warn elsewhere)
/// - Compact formatted output to stderr
/// - Target (module path) in output
///
/// # Example RUST_LOG values
/// - `RUST_LOG=debug` - Show debug and above
/// - `RUST_LOG=airscope::search=trace` - Trace the expansion loop only
///
/// # Errors
/// Returns an error if the subscriber has already been initialized
pub fn init() -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| crate::AirScopeError::Other(format!("Failed to initialize tracing: {}", e)))?;

    Ok(())
}

/// Initialize logging for tests (no-op if already initialized)
pub fn init_test() {
    let _ = init();
}
