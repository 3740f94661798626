//! Metrics tracking middleware
//!
//! Tracks request latency, counts, and status codes for Prometheus metrics,
//! plus the assistant-level counters recorded by the `/ask` handler.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

/// Prometheus collectors owned by the application state
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
    intents: IntCounterVec,
    tickets_created: IntCounter,
    ask_failures: IntCounter,
    uptime: IntGauge,
}

impl Metrics {
    /// Create the collectors in a private registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let http_requests = IntCounterVec::new(
            Opts::new("epis_http_requests_total", "HTTP requests by endpoint and status"),
            &["endpoint", "status"],
        )?;
        let http_duration = HistogramVec::new(
            HistogramOpts::new("epis_http_request_duration_seconds", "HTTP request latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0]),
            &["endpoint"],
        )?;
        let intents = IntCounterVec::new(
            Opts::new("epis_intents_total", "Questions routed per intent"),
            &["intent"],
        )?;
        let tickets_created =
            IntCounter::new("epis_tickets_created_total", "Support tickets created")?;
        let ask_failures = IntCounter::new(
            "epis_ask_failures_total",
            "Questions answered with the internal error apology",
        )?;
        let uptime = IntGauge::new("epis_uptime_seconds", "Time since server start")?;

        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_duration.clone()))?;
        registry.register(Box::new(intents.clone()))?;
        registry.register(Box::new(tickets_created.clone()))?;
        registry.register(Box::new(ask_failures.clone()))?;
        registry.register(Box::new(uptime.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_duration,
            intents,
            tickets_created,
            ask_failures,
            uptime,
        })
    }

    /// Record one finished HTTP request
    pub fn record_request(&self, endpoint: &str, status: u16, seconds: f64) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
        self.http_duration
            .with_label_values(&[endpoint])
            .observe(seconds);
    }

    /// Record the route a question took
    pub fn record_intent(&self, label: &str) {
        self.intents.with_label_values(&[label]).inc();
    }

    pub fn record_ticket_created(&self) {
        self.tickets_created.inc();
    }

    pub fn record_ask_failure(&self) {
        self.ask_failures.inc();
    }

    /// Render all metrics in the text exposition format
    pub fn render(&self, uptime_secs: u64) -> prometheus::Result<String> {
        self.uptime.set(i64::try_from(uptime_secs).unwrap_or(i64::MAX));

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Metrics tracking middleware
///
/// Records:
/// - Request count per endpoint and status
/// - Request latency distribution
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    state.metrics.record_request(
        endpoint,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

/// Normalize endpoint paths for consistent metrics
///
/// Unknown paths share one label to keep cardinality bounded
fn normalize_endpoint(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/ask" => "/ask",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        p if p.starts_with("/swagger-ui") || p.starts_with("/api-docs") => "/swagger-ui",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/ask"), "/ask");
        assert_eq!(normalize_endpoint("/health/"), "/health");
        assert_eq!(normalize_endpoint("/swagger-ui/index.html"), "/swagger-ui");
        assert_eq!(normalize_endpoint("/api-docs/openapi.json"), "/swagger-ui");
        assert_eq!(normalize_endpoint("/documents/123"), "other");
    }

    #[test]
    fn test_render_contains_recorded_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("/ask", 200, 0.02);
        metrics.record_intent("problem_report");
        metrics.record_ticket_created();
        metrics.record_ask_failure();

        let text = metrics.render(42).unwrap();
        assert!(text.contains("epis_http_requests_total{endpoint=\"/ask\",status=\"200\"} 1"));
        assert!(text.contains("epis_http_request_duration_seconds_count{endpoint=\"/ask\"} 1"));
        assert!(text.contains("epis_intents_total{intent=\"problem_report\"} 1"));
        assert!(text.contains("epis_tickets_created_total 1"));
        assert!(text.contains("epis_ask_failures_total 1"));
        assert!(text.contains("epis_uptime_seconds 42"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_ticket_created();

        assert!(second.render(0).unwrap().contains("epis_tickets_created_total 0"));
    }
}
