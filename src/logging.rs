//! Diagnostic logging.
//!
//! User-facing output goes through [`crate::ui::Ui`]; this module only wires
//! `tracing` to stderr for debugging. The filter comes from `DOTPROF_LOG`
//! (for example `DOTPROF_LOG=dotprof=trace`) and defaults to `warn`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "DOTPROF_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `DOTPROF_LOG`, falling back to `warn`
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init();
}
