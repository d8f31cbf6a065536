//! Prometheus metrics for appeal-service.
//!
//! HTTP request metrics come from `service_core::middleware::metrics_middleware`;
//! the helpers here add run and conversation counters.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus metrics initialized");
            handle
        }
        Err(e) => {
            // Another recorder is already global (tests build several apps)
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            PrometheusBuilder::new().build_recorder().handle()
        }
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record the outcome and duration of a Maestro run wait.
pub fn record_run_wait(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("maestro_runs_total", "outcome" => outcome).increment(1);
    metrics::histogram!("maestro_run_wait_seconds", "outcome" => outcome).record(duration_secs);
}

/// Record a retried upstream call.
pub fn record_upstream_retry(operation: &'static str, error_kind: &'static str) {
    metrics::counter!(
        "ai21_upstream_retries_total",
        "operation" => operation,
        "error_kind" => error_kind
    )
    .increment(1);
}

/// Record a validated appeal decision.
pub fn record_appeal_decision(decision: &'static str) {
    metrics::counter!("appeal_decisions_total", "decision" => decision).increment(1);
}

/// Record a conversational question.
pub fn record_ask(outcome: &'static str) {
    metrics::counter!("conversation_asks_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_metrics();
        init_metrics();
        assert!(METRICS_HANDLE.get().is_some());
        assert!(!get_metrics().starts_with("# Metrics recorder not initialized"));
    }
}
