//! Prometheus metrics registry
//!
//! Counters are recorded where things happen; limiter admission totals and
//! the pipeline-running flag are snapshotted into gauges at scrape time by
//! the metrics handler, since their source of truth lives elsewhere.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Central metrics registry for the service.
pub struct MetricsRegistry {
    registry: Registry,
    /// Counter: API requests by (route, status)
    pub http_requests_total: IntCounterVec,
    /// Gauge: limiter admissions since start (scrape-time snapshot)
    pub limiter_allowed: IntGauge,
    /// Gauge: limiter denials since start (scrape-time snapshot)
    pub limiter_denied: IntGauge,
    /// Gauge: limiter fail-open admissions since start (scrape-time snapshot)
    pub limiter_fail_open: IntGauge,
    /// Gauge: 1 while a pipeline run holds the slot
    pub pipeline_running: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all metrics registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("fundsight".to_string()), None)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "API requests by route and status"),
            &["route", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let limiter_allowed = IntGauge::new(
            "limiter_allowed_total",
            "Rate-limiter admissions since process start",
        )?;
        registry.register(Box::new(limiter_allowed.clone()))?;

        let limiter_denied = IntGauge::new(
            "limiter_denied_total",
            "Rate-limiter denials since process start",
        )?;
        registry.register(Box::new(limiter_denied.clone()))?;

        let limiter_fail_open = IntGauge::new(
            "limiter_fail_open_total",
            "Admissions granted because the bucket store was unreachable",
        )?;
        registry.register(Box::new(limiter_fail_open.clone()))?;

        let pipeline_running = IntGauge::new(
            "pipeline_running",
            "1 while a pipeline run is in progress",
        )?;
        registry.register(Box::new(pipeline_running.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            limiter_allowed,
            limiter_denied,
            limiter_fail_open,
            pipeline_running,
        })
    }

    /// Record one handled API request.
    pub fn record_request(&self, route: &str, status: u16) {
        self.http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Encode the registry in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
