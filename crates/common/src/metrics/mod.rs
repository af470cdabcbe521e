//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all bibstore metrics
pub const METRICS_PREFIX: &str = "bibstore";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for import flushes (bulk inserts of a whole batch)
pub const FLUSH_BUCKETS: &[f64] = &[
    0.010,
    0.050,
    0.100,
    0.500,
    1.000,
    5.000,
    10.00,
    30.00,
    60.00,
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Import metrics
    describe_counter!(
        format!("{}_import_records_total", METRICS_PREFIX),
        Unit::Count,
        "Bibliographic records read by the importer"
    );

    describe_counter!(
        format!("{}_rows_imported_total", METRICS_PREFIX),
        Unit::Count,
        "Rows written by the importer, per model"
    );

    describe_histogram!(
        format!("{}_import_flush_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time spent writing one import batch"
    );

    // Identity metrics
    describe_counter!(
        format!("{}_assertions_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Identity assertions appended by disambiguation runs"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// One record read by the importer
pub fn record_import_record(source: &str) {
    counter!(
        format!("{}_import_records_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(1);
}

/// Rows of one model written during a flush
pub fn record_rows_imported(model: &str, rows: u64) {
    counter!(
        format!("{}_rows_imported_total", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .increment(rows);
}

pub fn record_flush(duration_secs: f64) {
    histogram!(format!("{}_import_flush_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

pub fn record_assertions(kind: &str, count: usize) {
    counter!(
        format!("{}_assertions_recorded_total", METRICS_PREFIX),
        "kind" => kind.to_string()
    )
    .increment(count as u64);
}
