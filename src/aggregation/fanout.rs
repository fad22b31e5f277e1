//! Concurrent row-fetch fan-out
//!
//! [`Aggregator::aggregate`] enumerates a table's keys, then fetches every
//! row concurrently on a [`JoinSet`]. Key statistics are recorded when a
//! fetch is issued; field statistics and errors when it resolves. The report
//! is taken from the accumulator only after the join set has been drained,
//! so every spawned fetch has been joined exactly once before the caller sees
//! anything.
//!
//! # Example
//!
//! ```rust
//! use quantum_ts::aggregation::Aggregator;
//! use quantum_ts::engine::stubs::InMemoryStore;
//! use quantum_ts::key;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(InMemoryStore::new());
//! store.insert_row("t", key!["south", 1], vec!["south".into(), 1.into()]);
//!
//! let report = Aggregator::new(store).aggregate("t").await.unwrap();
//! assert_eq!(report.field_count("south"), 1);
//! # }
//! ```

use super::report::{AggregationReport, StatsAccumulator};
use crate::engine::traits::StoreClient;
use crate::error::{AggregationError, FetchError};
use crate::metrics;
use crate::query::keys::list_keys;
use crate::types::CompositeKey;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Per-aggregation fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Give up on a single fetch after this long (`None` = wait forever)
    pub timeout: Option<Duration>,
    /// Maximum fetches in flight at once (`None` = unbounded)
    pub max_in_flight: Option<usize>,
}

impl FetchOptions {
    /// Set the per-fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bound the number of concurrent fetches (minimum 1)
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight.max(1));
        self
    }
}

/// Aggregation engine over a shared store client
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn StoreClient>,
    options: FetchOptions,
}

impl Aggregator {
    /// Create an aggregator with default options
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            options: FetchOptions::default(),
        }
    }

    /// Replace the fetch options
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Current fetch options
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Aggregate key and field statistics over every row of `table`
    ///
    /// Fails only if the key set cannot be enumerated. Row fetch failures
    /// land in [`AggregationReport::errors`].
    pub async fn aggregate(&self, table: &str) -> Result<AggregationReport, AggregationError> {
        let start = Instant::now();

        let keys = list_keys(self.store.as_ref(), table)
            .await
            .map_err(AggregationError::Enumeration)?;

        if keys.is_empty() {
            info!(table = table, "No keys to aggregate");
            metrics::record_aggregation(start.elapsed().as_secs_f64(), true);
            return Ok(AggregationReport::default());
        }

        debug!(
            table = table,
            keys = keys.len(),
            max_in_flight = ?self.options.max_in_flight,
            timeout = ?self.options.timeout,
            "Starting row fetch fan-out"
        );

        let accumulator = Arc::new(StatsAccumulator::new());
        let semaphore = self
            .options
            .max_in_flight
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        let table_name: Arc<str> = Arc::from(table);
        let mut join_set = JoinSet::new();

        for key in keys {
            accumulator.record_key(&key);

            let store = Arc::clone(&self.store);
            let accumulator = Arc::clone(&accumulator);
            let semaphore = semaphore.clone();
            let table_name = Arc::clone(&table_name);
            let timeout = self.options.timeout;

            join_set.spawn(async move {
                // Hold a permit for the whole fetch when fan-out is bounded
                let _permit = match &semaphore {
                    Some(semaphore) => semaphore.acquire().await.ok(),
                    None => None,
                };
                fetch_one(store.as_ref(), &table_name, key, timeout, &accumulator).await;
            });
        }

        let issued = join_set.len();
        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                warn!(table = table, error = %e, "Row fetch task aborted");
                metrics::record_fetch("aborted", 0.0);
                accumulator.record_error(FetchError::Aborted(e.to_string()));
            }
        }

        let report = accumulator.finish();
        debug_assert_eq!(report.fetches_issued, report.fetches_resolved);

        let elapsed = start.elapsed();
        metrics::record_aggregation(elapsed.as_secs_f64(), report.is_clean());
        info!(
            table = table,
            fetches = issued,
            errors = report.errors.len(),
            distinct_fields = report.field_stats.len(),
            duration_ms = elapsed.as_millis() as u64,
            "Aggregation complete"
        );

        Ok(report)
    }
}

/// Fetch one row and fold the outcome into the accumulator
async fn fetch_one(
    store: &dyn StoreClient,
    table: &str,
    key: CompositeKey,
    timeout: Option<Duration>,
    accumulator: &StatsAccumulator,
) {
    let in_flight = metrics::InFlightGuard::fetch();
    let start = Instant::now();

    let fetched = match timeout {
        Some(after) => match tokio::time::timeout(after, store.fetch_row(table, &key)).await {
            Ok(result) => result.map_err(|source| FetchError::Store {
                key: key.clone(),
                source,
            }),
            Err(_) => Err(FetchError::TimedOut {
                key: key.clone(),
                after,
            }),
        },
        None => store
            .fetch_row(table, &key)
            .await
            .map_err(|source| FetchError::Store {
                key: key.clone(),
                source,
            }),
    };

    drop(in_flight);
    let elapsed = start.elapsed().as_secs_f64();

    match fetched {
        Ok(rows) => {
            metrics::record_fetch("success", elapsed);
            debug!(table = table, key = %key, rows = rows.len(), "Fetched row");
            accumulator.record_rows(&rows);
        },
        Err(e) => {
            let outcome = match e {
                FetchError::TimedOut { .. } => "timeout",
                _ => "error",
            };
            metrics::record_fetch(outcome, elapsed);
            warn!(table = table, key = %key, error = %e, "Row fetch failed");
            accumulator.record_error(e);
        },
    }
}
