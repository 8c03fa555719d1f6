//! Metrics registry and baseline service metrics.
//!
//! # Metrics
//! - `<svc>_http_requests_total` (counter): requests by method, path, status
//! - `<svc>_http_request_errors_total` (counter): 4xx/5xx responses
//! - `<svc>_http_request_duration_seconds` (histogram): latency distribution
//! - `<svc>_active_connections` (gauge): requests currently in flight
//! - `<svc>_db_query_duration_seconds` (histogram): by operation, table
//! - `<svc>_cache_hits_total` / `<svc>_cache_misses_total` (counters)
//! - `<svc>_queue_jobs_total` (counter) / `<svc>_queue_job_duration_seconds`
//!
//! # Design Decisions
//! - Histogram buckets tuned for typical web latencies
//! - Registering the same name twice returns an error from the registry;
//!   callers own name uniqueness

use std::time::Instant;

use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::config::ServiceIdentity;
use crate::error::TelemetryError;

/// Latency buckets for HTTP and queue work (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Finer buckets for database queries, which should sit well under web latency.
const DB_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Process-wide metrics registry scoped by service identity.
///
/// Constructed once per process; the baseline service metrics are registered
/// at construction time and additional series can be added through the
/// factory methods at any point, including after the first scrape.
pub struct ServiceMetrics {
    registry: Registry,
    namespace: String,

    pub http_requests_total: IntCounterVec,
    pub http_request_errors_total: IntCounterVec,
    pub http_request_duration: HistogramVec,
    pub active_connections: IntGauge,
    pub db_query_duration: HistogramVec,
    pub cache_hits_total: IntCounterVec,
    pub cache_misses_total: IntCounterVec,
    pub queue_jobs_total: IntCounterVec,
    pub queue_job_duration: HistogramVec,
}

impl ServiceMetrics {
    pub fn new(identity: &ServiceIdentity) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let namespace = identity.metric_namespace();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests served")
                .namespace(namespace.clone()),
            &["method", "path", "status"],
        )?;
        let http_request_errors_total = IntCounterVec::new(
            Opts::new(
                "http_request_errors_total",
                "HTTP requests answered with a 4xx or 5xx status",
            )
            .namespace(namespace.clone()),
            &["method", "path", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency distribution",
            )
            .namespace(namespace.clone())
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["method", "path"],
        )?;
        let active_connections = IntGauge::with_opts(
            Opts::new("active_connections", "Requests currently in flight")
                .namespace(namespace.clone()),
        )?;
        let db_query_duration = HistogramVec::new(
            HistogramOpts::new(
                "db_query_duration_seconds",
                "Database query latency distribution",
            )
            .namespace(namespace.clone())
            .buckets(DB_LATENCY_BUCKETS.to_vec()),
            &["operation", "table"],
        )?;
        let cache_hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Cache lookups that found a value")
                .namespace(namespace.clone()),
            &["cache"],
        )?;
        let cache_misses_total = IntCounterVec::new(
            Opts::new("cache_misses_total", "Cache lookups that found nothing")
                .namespace(namespace.clone()),
            &["cache"],
        )?;
        let queue_jobs_total = IntCounterVec::new(
            Opts::new("queue_jobs_total", "Queue jobs processed by outcome")
                .namespace(namespace.clone()),
            &["queue", "status"],
        )?;
        let queue_job_duration = HistogramVec::new(
            HistogramOpts::new(
                "queue_job_duration_seconds",
                "Queue job processing latency",
            )
            .namespace(namespace.clone())
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["queue"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_errors_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;
        registry.register(Box::new(db_query_duration.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(queue_jobs_total.clone()))?;
        registry.register(Box::new(queue_job_duration.clone()))?;

        Ok(Self {
            registry,
            namespace,
            http_requests_total,
            http_request_errors_total,
            http_request_duration,
            active_connections,
            db_query_duration,
            cache_hits_total,
            cache_misses_total,
            queue_jobs_total,
            queue_job_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register an additional counter. A duplicate name returns an error.
    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntCounterVec, TelemetryError> {
        let counter = IntCounterVec::new(
            Opts::new(name, help).namespace(self.namespace.clone()),
            labels,
        )?;
        self.registry.register(Box::new(counter.clone()))?;
        Ok(counter)
    }

    /// Register an additional gauge. A duplicate name returns an error.
    pub fn register_gauge(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<GaugeVec, TelemetryError> {
        let gauge = GaugeVec::new(
            Opts::new(name, help).namespace(self.namespace.clone()),
            labels,
        )?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    /// Register an additional histogram, optionally with custom buckets.
    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
        buckets: Option<Vec<f64>>,
    ) -> Result<HistogramVec, TelemetryError> {
        let mut opts = HistogramOpts::new(name, help).namespace(self.namespace.clone());
        if let Some(buckets) = buckets {
            opts = opts.buckets(buckets);
        }
        let histogram = HistogramVec::new(opts, labels)?;
        self.registry.register(Box::new(histogram.clone()))?;
        Ok(histogram)
    }

    /// Render the registry snapshot in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|err| TelemetryError::Encode(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| TelemetryError::Encode(err.to_string()))
    }

    /// Record one served HTTP request: duration, total, and error counters.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, start: Instant) {
        let status_label = status.to_string();
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(start.elapsed().as_secs_f64());
        self.http_requests_total
            .with_label_values(&[method, path, &status_label])
            .inc();
        if status >= 400 {
            self.http_request_errors_total
                .with_label_values(&[method, path, &status_label])
                .inc();
        }
    }

    pub fn observe_db_query(&self, operation: &str, table: &str, start: Instant) {
        self.db_query_duration
            .with_label_values(&[operation, table])
            .observe(start.elapsed().as_secs_f64());
    }

    pub fn record_cache_hit(&self, cache: &str) {
        self.cache_hits_total.with_label_values(&[cache]).inc();
    }

    pub fn record_cache_miss(&self, cache: &str) {
        self.cache_misses_total.with_label_values(&[cache]).inc();
    }

    pub fn record_queue_job(&self, queue: &str, status: &str, start: Instant) {
        self.queue_jobs_total
            .with_label_values(&[queue, status])
            .inc();
        self.queue_job_duration
            .with_label_values(&[queue])
            .observe(start.elapsed().as_secs_f64());
    }
}
