//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "OPENRISK_LOG";

/// Initialize the OpenRisk tracing/logging system.
///
/// Reads `OPENRISK_LOG` for per-module log levels.
/// Format: `OPENRISK_LOG=openrisk_signals=debug,openrisk_storage=warn`
///
/// Falls back to `openrisk=info` (or `openrisk=debug` when `verbose`) if
/// `OPENRISK_LOG` is not set or is invalid. Output goes to stderr so stdout
/// carries only run summaries.
///
/// This function is idempotent: only the first call installs a subscriber.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose { "openrisk=debug" } else { "openrisk=info" };
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    });
}
