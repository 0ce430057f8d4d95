//! Telemetry metric name constants.
//!
//! Centralised metric names for modelmux operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `modelmux_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — provider name (e.g. "openrouter", "ollama")
//! - `operation` — call type ("query" | "chat")
//! - `status` — outcome: "ok" or "error"

use std::time::Duration;

/// Total provider calls dispatched through a registered handle.
///
/// Labels: `provider`, `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "modelmux_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `provider`, `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "modelmux_request_duration_seconds";

/// Total retry attempts on transient errors (not counting the initial
/// request).
///
/// Labels: `provider`, `operation`.
pub const RETRIES_TOTAL: &str = "modelmux_retries_total";

/// Record one provider call outcome (counter + duration histogram).
pub(crate) fn record_request(operation: &'static str, provider: &str, elapsed: Duration, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(REQUESTS_TOTAL,
        "provider" => provider.to_owned(),
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS,
        "provider" => provider.to_owned(),
        "operation" => operation,
    )
    .record(elapsed.as_secs_f64());
}

/// Record one retry of a transient provider error.
pub(crate) fn record_retry(operation: &'static str, provider: &str) {
    metrics::counter!(RETRIES_TOTAL,
        "provider" => provider.to_owned(),
        "operation" => operation,
    )
    .increment(1);
}
