//! Metrics and observability utilities
//!
//! Prometheus-style metrics through the `metrics` facade with
//! SLO-aligned histograms and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Cinelog metrics
pub const METRICS_PREFIX: &str = "cinelog";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
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

    // Catalogue metrics
    describe_counter!(
        format!("{}_reviews_total", METRICS_PREFIX),
        Unit::Count,
        "Reviews submitted or deleted"
    );

    describe_histogram!(
        format!("{}_review_rating", METRICS_PREFIX),
        Unit::Count,
        "Star rating carried by submitted reviews"
    );

    describe_counter!(
        format!("{}_wishlist_changes_total", METRICS_PREFIX),
        Unit::Count,
        "Wishlist additions and removals"
    );

    describe_counter!(
        format!("{}_movie_changes_total", METRICS_PREFIX),
        Unit::Count,
        "Movies created, updated or deleted"
    );

    // Store metrics
    describe_counter!(
        format!("{}_write_conflicts_total", METRICS_PREFIX),
        Unit::Count,
        "Versioned writes that lost a race and were retried"
    );

    describe_counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Requests rejected by the rate limiter"
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

/// Record a review being submitted or deleted
pub fn record_review(action: &'static str, rating: u8) {
    counter!(
        format!("{}_reviews_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);

    if action == "submitted" {
        histogram!(format!("{}_review_rating", METRICS_PREFIX)).record(f64::from(rating));
    }
}

/// Record a wishlist change (`added`, `already_present`, `removed`, `not_present`)
pub fn record_wishlist(change: &'static str) {
    counter!(
        format!("{}_wishlist_changes_total", METRICS_PREFIX),
        "change" => change
    )
    .increment(1);
}

/// Record an admin movie change
pub fn record_movie_change(action: &'static str) {
    counter!(
        format!("{}_movie_changes_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}

pub fn record_write_conflict(operation: &'static str) {
    counter!(
        format!("{}_write_conflicts_total", METRICS_PREFIX),
        "operation" => operation
    )
    .increment(1);
}

pub fn record_rate_limited() {
    counter!(format!("{}_rate_limited_total", METRICS_PREFIX)).increment(1);
}
