//! # Prometheus Metrics
//!
//! Ledger call counters and latency, scraped at `/metrics` on the metrics
//! port. Everything lives in a dedicated [`prometheus::Registry`] with the
//! `caution` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metric handles for the node. Clones share the underlying series.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Deposits committed by `create_transaction`.
    pub deposits_created_total: IntCounter,
    /// Deposits committed by `release_amount`.
    pub deposits_released_total: IntCounter,
    pub payments_recorded_total: IntCounter,
    /// Rejected ledger calls, labelled by error kind.
    pub ledger_calls_rejected_total: IntCounterVec,
    /// Wall time of mutating ledger calls, in seconds.
    pub ledger_call_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("caution".into()), None)
            .expect("failed to create prometheus registry");

        let deposits_created_total = register(
            &registry,
            IntCounter::new(
                "deposits_created_total",
                "Total number of deposits locked in escrow",
            )
            .expect("metric creation"),
        );
        let deposits_released_total = register(
            &registry,
            IntCounter::new(
                "deposits_released_total",
                "Total number of deposits released from escrow",
            )
            .expect("metric creation"),
        );
        let payments_recorded_total = register(
            &registry,
            IntCounter::new("payments_recorded_total", "Total number of payments recorded")
                .expect("metric creation"),
        );
        let ledger_calls_rejected_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "ledger_calls_rejected_total",
                    "Ledger calls that returned an error, by error kind",
                ),
                &["kind"],
            )
            .expect("metric creation"),
        );
        let ledger_call_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "ledger_call_latency_seconds",
                    "Latency of mutating ledger calls in seconds",
                )
                .buckets(vec![
                    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0,
                ]),
            )
            .expect("metric creation"),
        );

        Self {
            registry,
            deposits_created_total,
            deposits_released_total,
            payments_recorded_total,
            ledger_calls_rejected_total,
            ledger_call_latency_seconds,
        }
    }

    /// Count one rejected call of the given kind.
    pub fn reject(&self, kind: &str) {
        self.ledger_calls_rejected_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registration");
    collector
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// `GET /metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_with_prefix() {
        let metrics = LedgerMetrics::new();
        metrics.deposits_created_total.inc();
        metrics.reject("AlreadyRefunded");
        metrics.ledger_call_latency_seconds.observe(0.002);

        let text = metrics.encode().unwrap();
        assert!(text.contains("caution_deposits_created_total 1"));
        assert!(text.contains("caution_ledger_calls_rejected_total{kind=\"AlreadyRefunded\"} 1"));
        assert!(text.contains("caution_ledger_call_latency_seconds_count 1"));
    }

    #[test]
    fn separate_instances_do_not_share_series() {
        let a = LedgerMetrics::new();
        let b = LedgerMetrics::new();
        a.deposits_released_total.inc();
        assert_eq!(a.deposits_released_total.get(), 1);
        assert_eq!(b.deposits_released_total.get(), 0);
    }
}
