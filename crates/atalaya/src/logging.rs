//! Tracing subscriber setup.
//!
//! Atalaya only emits `tracing` events; nothing is printed unless the host
//! installs a subscriber. These helpers install one filtered by the
//! `ATALAYA_LOG` environment variable (same syntax as `RUST_LOG`).
//!
//! ```ignore
//! atalaya::logging::init_tracing("atalaya=debug");
//! ```

use std::sync::Once;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const ENV_LOG: &str = "ATALAYA_LOG";

/// Filter used when neither `ATALAYA_LOG` nor the caller name one
pub const DEFAULT_FILTER: &str = "warn";

static INIT: Once = Once::new();

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines on stderr
    #[default]
    Compact,
    /// One JSON object per event on stderr
    Json,
}

/// Resolve the filter: `ATALAYA_LOG` first, then `default_filter`, then
/// [`DEFAULT_FILTER`] if `default_filter` does not parse.
#[must_use]
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a compact subscriber. Later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    init_tracing_with(LogFormat::Compact, default_filter);
}

/// Install a subscriber in `format`. Later calls are no-ops, as is a call
/// made after the host installed its own global subscriber.
pub fn init_tracing_with(format: LogFormat, default_filter: &str) {
    INIT.call_once(|| {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter(default_filter))
            .with_writer(std::io::stderr)
            .with_target(true);
        let installed = match format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("global subscriber already set, keeping it");
        }
    });
}

/// Subscriber for tests: output goes through the test harness capture.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter("atalaya=debug"))
            .with_test_writer()
            .compact()
            .try_init();
    });
}
