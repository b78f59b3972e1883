//! Logging setup. Everything goes to stderr; stdout carries the hook payload.

use chrono::Local;
use std::fmt;
use std::io::IsTerminal;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// Level used when neither the debug toggle nor `RUST_LOG` says otherwise
const DEFAULT_LEVEL: &str = "warn";

/// Local wall-clock timestamps, e.g. `2026-01-18 09:30:00`
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Filter directive: the debug toggle wins, then `RUST_LOG`, then warnings
fn filter_directive(debug: bool, rust_log: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Initialize tracing.
///
/// With `debug` everything down to DEBUG is shown; otherwise `RUST_LOG`
/// decides, defaulting to warnings and errors.
pub fn init_logging(debug: bool) {
    let directive = filter_directive(debug, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    if !std::io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(LocalTimestamp)
        .with_target(false)
        .try_init();
}
