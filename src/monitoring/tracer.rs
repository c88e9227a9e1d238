/*!
 * Structured Tracing
 * Logging setup and per-process spans built on the tracing crate
 *
 * Features:
 * - Trace ID generation for correlating one runner invocation
 * - JSON-formatted logs for structured parsing
 * - Spans that time each logical process from bind to termination
 */

use crate::core::types::{ExitStatus, Pid};
use std::time::Instant;
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Environment variable that switches log output to JSON
pub const TRACE_JSON_ENV: &str = "THREADPROC_TRACE_JSON";

/// Processes running longer than this are logged at warn level
const SLOW_PROCESS_MS: u64 = 10_000;

/// Initialize structured tracing on stderr
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: `default_level`)
/// - THREADPROC_TRACE_JSON: Enable JSON output (default: false)
///
/// Logs go to stderr so command output on stdout stays clean. Calling this
/// twice keeps the first subscriber.
pub fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one logical process, from bind to recorded status
pub struct ProcessSpan {
    span: tracing::Span,
    start: Instant,
    pid: Pid,
}

impl ProcessSpan {
    pub fn new(pid: Pid, utility: &str) -> Self {
        let span = span!(
            Level::DEBUG,
            "process",
            pid = pid,
            utility = utility,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            pid,
        }
    }

    /// Enter the span on the current thread
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record the termination status and elapsed time
    pub fn record_status(&self, status: ExitStatus) {
        let elapsed = self.start.elapsed().as_millis() as u64;
        self.span.record("status", tracing::field::display(status));
        self.span.record("duration_ms", elapsed);

        if elapsed > SLOW_PROCESS_MS {
            warn!(pid = self.pid, duration_ms = elapsed, %status, "slow process");
        } else {
            debug!(pid = self.pid, duration_ms = elapsed, %status, "process finished");
        }
    }
}
