//! Tracing setup.
//!
//! Configures structured logging with:
//! - Environment-based filter (via RUST_LOG)
//! - Human-readable or JSON output on stderr

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize tracing.
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used, with debug
/// output for this crate.
///
/// # Arguments
///
/// * `log_level` - Fallback filter directive
/// * `json` - Emit JSON lines instead of the human-readable format
///
/// # Panics
///
/// Panics if tracing has already been initialized.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info,sqlrelay=debug"));

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();

    tracing::info!(log_level, json, "Tracing initialized");
}

/// Initialize tracing for tests.
///
/// Output goes through the test harness capture. `RUST_LOG` can raise the
/// level for a failing test; otherwise only errors are shown. Safe to call
/// from every test, only the first call installs a subscriber.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));

    // Router work happens on its own thread, so keep thread names
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_thread_names(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
