//! Per-provider usage accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Lock-free usage counters owned by a registered provider.
///
/// `record_attempt` runs before the call and exactly one outcome path
/// afterwards, so `request_count == success_count + failure_count` once a
/// call finishes. Relaxed ordering is enough: the counters feed stats and
/// load decisions, not correctness, so a reader racing a writer may see a
/// snapshot that is one in-flight call behind.
#[derive(Debug, Default)]
pub struct ProviderUsage {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    latency_micros: AtomicU64,
}

impl ProviderUsage {
    pub(crate) fn record_attempt(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, ok: bool, elapsed: Duration) {
        if ok {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.successes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.latency_micros.store(0, Ordering::Relaxed);
    }

    /// Current counter values.
    pub fn snapshot(&self) -> UsageStats {
        UsageStats {
            request_count: self.requests.load(Ordering::Relaxed),
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            total_latency: Duration::from_micros(self.latency_micros.load(Ordering::Relaxed)),
        }
    }
}

/// Read-only view over one provider's usage counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    /// Calls attempted through this provider.
    pub request_count: u64,
    /// Calls that returned text.
    pub success_count: u64,
    /// Calls that failed.
    pub failure_count: u64,
    /// Wall-clock time spent across all calls.
    pub total_latency: Duration,
}

impl UsageStats {
    /// Mean latency per call, `None` before the first call.
    pub fn average_latency(&self) -> Option<Duration> {
        (self.request_count > 0).then(|| self.total_latency.div_f64(self.request_count as f64))
    }
}
