//! Prometheus metrics for the AirScope service
//!
//! Counters and histograms for the cache, upstream calls and the search loop,
//! exposed as text on `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Counter: cache operations (hit/miss) per cache
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec!(
        "airscope_cache_operations_total",
        "Cache operations by cache and outcome",
        &["cache", "operation"]
    )
    .expect("Failed to create cache_operations metric");

    /// Histogram: upstream request duration (seconds)
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec!(
        "airscope_upstream_duration_seconds",
        "Duration of upstream geocoder and sensor-network requests",
        &["service"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create upstream_duration metric");

    /// Counter: upstream errors by service and kind
    pub static ref UPSTREAM_ERRORS: CounterVec = register_counter_vec!(
        "airscope_upstream_errors_total",
        "Upstream errors by service and error kind",
        &["service", "kind"]
    )
    .expect("Failed to create upstream_errors metric");

    /// Counter: bounding-box expansion steps taken by the search loop
    pub static ref SEARCH_EXPANSIONS: CounterVec = register_counter_vec!(
        "airscope_search_expansions_total",
        "Search expansion steps by factor",
        &["factor"]
    )
    .expect("Failed to create search_expansions metric");

    /// Counter: search outcomes
    pub static ref SEARCH_OUTCOMES: CounterVec = register_counter_vec!(
        "airscope_search_outcomes_total",
        "Search outcomes (found, expanded, empty, invalid)",
        &["outcome"]
    )
    .expect("Failed to create search_outcomes metric");
}

/// Record cache hit
pub fn record_cache_hit(cache: &str) {
    CACHE_OPERATIONS.with_label_values(&[cache, "hit"]).inc();
}

/// Record cache miss
pub fn record_cache_miss(cache: &str) {
    CACHE_OPERATIONS.with_label_values(&[cache, "miss"]).inc();
}

/// Record an upstream request duration
pub fn record_upstream_duration(service: &str, duration_secs: f64) {
    UPSTREAM_DURATION
        .with_label_values(&[service])
        .observe(duration_secs);
}

/// Increment upstream error counter
pub fn record_upstream_error(service: &str, kind: &str) {
    UPSTREAM_ERRORS.with_label_values(&[service, kind]).inc();
}

/// Record one expansion step
pub fn record_search_expansion(factor: u32) {
    SEARCH_EXPANSIONS
        .with_label_values(&[factor.to_string().as_str()])
        .inc();
}

/// Record a search outcome
pub fn record_search_outcome(outcome: &str) {
    SEARCH_OUTCOMES.with_label_values(&[outcome]).inc();
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> crate::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::AirScopeError::Other(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::AirScopeError::Other(format!("Metrics are not UTF-8: {}", e)))
}
