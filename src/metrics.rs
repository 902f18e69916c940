//! Prometheus metrics and tracing spans.
//!
//! Everything is registered on a private `Registry` so the `/metrics` endpoint only
//! reports what this crate records.

#[cfg(feature = "metrics")]
pub use prometheus_metrics::{InventoryMetrics, METRICS};

/// Count a lifecycle transition. No-op without the `metrics` feature.
pub(crate) fn record_event(_event: &str) {
    #[cfg(feature = "metrics")]
    METRICS.record_event(_event);
}

pub(crate) fn record_response(_status: u16) {
    #[cfg(feature = "metrics")]
    METRICS.record_response(_status);
}

#[cfg(feature = "metrics")]
mod prometheus_metrics {
    use once_cell::sync::Lazy;
    use prometheus::{
        Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<InventoryMetrics> = Lazy::new(InventoryMetrics::init);

    pub struct InventoryMetrics {
        registry: Registry,
        pub queries_total: IntCounter,
        pub query_errors_total: IntCounter,
        pub query_duration: Histogram,
        pub pool_wait_duration: Histogram,
        pub lifecycle_events: IntCounterVec,
        pub http_responses: IntCounterVec,
    }

    impl InventoryMetrics {
        fn init() -> Self {
            let registry = Registry::new_custom(Some("stockguard".to_string()), None)
                .unwrap_or_default();

            let queries_total = IntCounter::new("queries_total", "Total queries executed")
                .expect("valid counter definition");
            let query_errors_total =
                IntCounter::new("query_errors_total", "Queries that returned an error")
                    .expect("valid counter definition");
            let query_duration = Histogram::with_opts(HistogramOpts::new(
                "query_duration_seconds",
                "Duration of queries",
            ))
            .expect("valid histogram definition");
            let pool_wait_duration = Histogram::with_opts(HistogramOpts::new(
                "pool_wait_seconds",
                "Time spent waiting for an idle pooled connection",
            ))
            .expect("valid histogram definition");
            let lifecycle_events = IntCounterVec::new(
                Opts::new("lifecycle_events_total", "Tag and item lifecycle transitions"),
                &["event"],
            )
            .expect("valid counter definition");
            let http_responses = IntCounterVec::new(
                Opts::new("http_responses_total", "HTTP responses by status class"),
                &["class"],
            )
            .expect("valid counter definition");

            for collector in [
                Box::new(queries_total.clone()) as Box<dyn prometheus::core::Collector>,
                Box::new(query_errors_total.clone()),
                Box::new(query_duration.clone()),
                Box::new(pool_wait_duration.clone()),
                Box::new(lifecycle_events.clone()),
                Box::new(http_responses.clone()),
            ] {
                if let Err(e) = registry.register(collector) {
                    log::warn!("Failed to register metric: {}", e);
                }
            }

            Self {
                registry,
                queries_total,
                query_errors_total,
                query_duration,
                pool_wait_duration,
                lifecycle_events,
                http_responses,
            }
        }

        pub fn record_query(&self, elapsed: Duration) {
            self.queries_total.inc();
            self.query_duration.observe(elapsed.as_secs_f64());
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.inc();
        }

        pub fn observe_pool_wait(&self, elapsed: Duration) {
            self.pool_wait_duration.observe(elapsed.as_secs_f64());
        }

        /// Count one lifecycle transition, e.g. `tag_claimed` or `item_checked_out`.
        pub fn record_event(&self, event: &str) {
            self.lifecycle_events.with_label_values(&[event]).inc();
        }

        pub fn record_response(&self, status: u16) {
            let class = match status {
                200..=299 => "2xx",
                400..=499 => "4xx",
                500..=599 => "5xx",
                _ => "other",
            };
            self.http_responses.with_label_values(&[class]).inc();
        }

        /// Prometheus text exposition of everything recorded so far.
        pub fn render(&self) -> Vec<u8> {
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::error!("Failed to encode metrics: {}", e);
            }
            buffer
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{debug_span, info_span, Span};

    pub fn execute_query_span(query: &str) -> Span {
        debug_span!("db.query", db.statement = query)
    }

    pub fn acquire_connection_span() -> Span {
        debug_span!("db.acquire_connection")
    }

    pub fn begin_transaction_span() -> Span {
        debug_span!("db.begin")
    }

    pub fn commit_transaction_span() -> Span {
        debug_span!("db.commit")
    }

    pub fn rollback_transaction_span() -> Span {
        debug_span!("db.rollback")
    }

    pub fn http_request_span(method: &str, path: &str) -> Span {
        info_span!("http.request", http.method = method, http.path = path)
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_render_includes_recorded_series() {
        METRICS.record_query(Duration::from_millis(3));
        METRICS.record_event("tag_registered");
        METRICS.record_response(201);

        let text = String::from_utf8(METRICS.render()).expect("utf-8 exposition");
        assert!(text.contains("stockguard_queries_total"));
        assert!(text.contains("stockguard_lifecycle_events_total{event=\"tag_registered\"}"));
        assert!(text.contains("stockguard_http_responses_total{class=\"2xx\"}"));
    }
}
