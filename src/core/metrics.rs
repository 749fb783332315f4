//! Prometheus metrics for monitoring the gateway.

use prometheus::{register_int_counter_vec, IntCounterVec};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint and status
    pub request_count: IntCounterVec,

    /// Client restriction decisions by reason and outcome
    pub restriction_decisions: IntCounterVec,

    /// Errors injected into already-open streams, by error type
    pub stream_errors: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call repeatedly; later calls return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "codex_gateway_requests_total",
            "Total number of requests",
            &["method", "endpoint", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let restriction_decisions = register_int_counter_vec!(
            "codex_gateway_restriction_decisions_total",
            "Client restriction decisions for restricted accounts",
            &["reason", "outcome"]
        )
        .expect("Failed to register restriction_decisions metric");

        let stream_errors = register_int_counter_vec!(
            "codex_gateway_stream_errors_total",
            "Errors emitted as SSE events into open streams",
            &["error_type"]
        )
        .expect("Failed to register stream_errors metric");

        Metrics {
            request_count,
            restriction_decisions,
            stream_errors,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
