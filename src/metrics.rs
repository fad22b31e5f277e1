//! Metrics and telemetry
//!
//! Prometheus metrics for DDL execution, key enumeration and the row-fetch
//! fan-out of the aggregation engine.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};

lazy_static! {
    // === Operation Counters ===

    /// DDL statements executed
    pub static ref DDL_TOTAL: CounterVec = register_counter_vec!(
        "qts_ddl_statements_total",
        "Total DDL statements executed",
        &["status"]
    ).unwrap();

    /// Rows written through `insert_rows`
    pub static ref ROWS_INSERTED_TOTAL: CounterVec = register_counter_vec!(
        "qts_rows_inserted_total",
        "Total rows submitted for insertion",
        &["status"]
    ).unwrap();

    /// Key enumerations
    pub static ref ENUMERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "qts_key_enumerations_total",
        "Total key enumerations",
        &["status"]
    ).unwrap();

    /// Key batches received
    pub static ref KEY_BATCHES_TOTAL: Counter = register_counter!(
        "qts_key_batches_total",
        "Total key batches received from key streams"
    ).unwrap();

    /// Keys received
    pub static ref KEYS_TOTAL: Counter = register_counter!(
        "qts_keys_total",
        "Total keys received from key streams"
    ).unwrap();

    /// Row fetches by outcome
    pub static ref FETCHES_TOTAL: CounterVec = register_counter_vec!(
        "qts_row_fetches_total",
        "Total row fetches by outcome",
        &["status"]
    ).unwrap();

    // === Latency Histograms ===

    /// Row fetch duration
    pub static ref FETCH_DURATION: HistogramVec = register_histogram_vec!(
        "qts_row_fetch_duration_seconds",
        "Row fetch latency in seconds",
        &["status"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();

    /// Whole aggregation duration
    pub static ref AGGREGATION_DURATION: HistogramVec = register_histogram_vec!(
        "qts_aggregation_duration_seconds",
        "Aggregation latency in seconds",
        &["outcome"],
        vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]
    ).unwrap();

    // === Resource Gauges ===

    /// Row fetches currently in flight
    pub static ref FETCHES_IN_FLIGHT: Gauge = register_gauge!(
        "qts_row_fetches_in_flight",
        "Number of row fetches currently in flight"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

#[inline]
fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Record a DDL execution
#[inline]
pub fn record_ddl(success: bool) {
    DDL_TOTAL.with_label_values(&[status(success)]).inc();
}

/// Record a row insertion batch
#[inline]
pub fn record_insert(rows: usize, success: bool) {
    ROWS_INSERTED_TOTAL
        .with_label_values(&[status(success)])
        .inc_by(rows as f64);
}

/// Record the end of a key enumeration
#[inline]
pub fn record_enumeration(success: bool) {
    ENUMERATIONS_TOTAL.with_label_values(&[status(success)]).inc();
}

/// Record one received key batch
#[inline]
pub fn record_key_batch(keys: usize) {
    KEY_BATCHES_TOTAL.inc();
    KEYS_TOTAL.inc_by(keys as f64);
}

/// Record a resolved row fetch
///
/// `outcome` is one of `success`, `error`, `timeout`, `aborted`.
#[inline]
pub fn record_fetch(outcome: &str, duration_secs: f64) {
    FETCHES_TOTAL.with_label_values(&[outcome]).inc();
    FETCH_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Holds one slot of an in-flight gauge until dropped
///
/// Released on every exit path, including a panicking or cancelled fetch.
#[must_use]
pub struct InFlightGuard<'a>(&'a Gauge);

impl InFlightGuard<'static> {
    /// Track a row fetch entering flight
    #[inline]
    pub fn fetch() -> Self {
        Self::on(&FETCHES_IN_FLIGHT)
    }
}

impl<'a> InFlightGuard<'a> {
    /// Take a slot on `gauge`
    #[inline]
    pub fn on(gauge: &'a Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Record a finished aggregation
#[inline]
pub fn record_aggregation(duration_secs: f64, clean: bool) {
    let outcome = if clean { "clean" } else { "partial" };
    AGGREGATION_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}
