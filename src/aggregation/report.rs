//! Aggregation report and its concurrent accumulator

use crate::error::FetchError;
use crate::types::{CompositeKey, KeyComponent, Row};
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Result of aggregating one table
///
/// `key_stats` counts every key component across all enumerated keys.
/// `field_stats` counts the stringified value of every column of every row
/// returned by a successful fetch. `errors` holds one entry per failed fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationReport {
    /// Key component value -> occurrences
    pub key_stats: HashMap<KeyComponent, u64>,
    /// Stringified field value -> occurrences
    pub field_stats: HashMap<String, u64>,
    /// Per-key fetch failures
    #[serde(serialize_with = "errors_as_strings")]
    pub errors: Vec<FetchError>,
    /// Row fetches issued
    pub fetches_issued: u64,
    /// Row fetches resolved (equal to `fetches_issued` on return)
    pub fetches_resolved: u64,
}

fn errors_as_strings<S: Serializer>(errors: &[FetchError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl AggregationReport {
    /// Occurrences of a key component value
    pub fn key_count(&self, component: &KeyComponent) -> u64 {
        self.key_stats.get(component).copied().unwrap_or(0)
    }

    /// Occurrences of a stringified field value
    pub fn field_count(&self, value: &str) -> u64 {
        self.field_stats.get(value).copied().unwrap_or(0)
    }

    /// True when every fetch succeeded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when nothing was counted
    pub fn is_empty(&self) -> bool {
        self.key_stats.is_empty() && self.field_stats.is_empty() && self.errors.is_empty()
    }
}

/// Mutex-guarded accumulator shared by concurrent fetch tasks
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    inner: Mutex<AggregationReport>,
}

impl StatsAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every component of `key` and mark one fetch as issued
    pub fn record_key(&self, key: &CompositeKey) {
        let mut report = self.inner.lock();
        for component in key.components() {
            *report.key_stats.entry(component.clone()).or_insert(0) += 1;
        }
        report.fetches_issued += 1;
    }

    /// Fold the rows of a completed fetch
    pub fn record_rows(&self, rows: &[Row]) {
        // Stringify outside the lock
        let values: Vec<String> = rows
            .iter()
            .flat_map(|row| row.iter().map(|v| v.to_string()))
            .collect();

        let mut report = self.inner.lock();
        for value in values {
            *report.field_stats.entry(value).or_insert(0) += 1;
        }
        report.fetches_resolved += 1;
    }

    /// Record a failed fetch
    pub fn record_error(&self, error: FetchError) {
        let mut report = self.inner.lock();
        report.errors.push(error);
        report.fetches_resolved += 1;
    }

    /// Take the accumulated report, leaving the accumulator empty
    pub fn finish(&self) -> AggregationReport {
        std::mem::take(&mut *self.inner.lock())
    }
}
