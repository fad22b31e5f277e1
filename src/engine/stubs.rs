//! In-memory store client
//!
//! [`InMemoryStore`] implements [`StoreClient`] without a network. It is
//! intended for:
//! - **Unit testing** the enumerator and aggregation engine
//! - **Fault injection**: failing or delaying individual fetches, breaking or
//!   truncating the key stream, rejecting DDL
//! - **Development** against a predictable key set
//!
//! # Warning
//!
//! Not suitable for production use: data lives only in memory and executed
//! DDL is recorded, not interpreted beyond registering the table name.
//!
//! # Example
//!
//! ```rust
//! use quantum_ts::engine::stubs::InMemoryStore;
//! use quantum_ts::key;
//!
//! let store = InMemoryStore::new().with_page_size(2);
//! store.insert_row("GeoCheckin", key!["south", 1_000], vec!["south".into(), 1_000.into()]);
//! ```

use crate::engine::traits::{KeyBatch, KeyStream, StoreClient};
use crate::error::StoreError;
use crate::types::{CompositeKey, KeyComponent, Row, Value};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default number of keys per streamed batch
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct TableData {
    describe: Vec<Vec<Value>>,
    /// Column positions of the local key, empty when unknown
    key_columns: Vec<usize>,
    keys: Vec<CompositeKey>,
    rows: HashMap<CompositeKey, Vec<Row>>,
}

impl TableData {
    fn push_row(&mut self, key: CompositeKey, row: Row) {
        if !self.rows.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.rows.entry(key).or_default().push(row);
    }

    fn replace_row(&mut self, key: CompositeKey, row: Row) {
        if !self.rows.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.rows.insert(key, vec![row]);
    }

    /// Key of a positional row, from its local-key columns
    fn key_of(&self, table: &str, row: &[Value]) -> Result<CompositeKey, StoreError> {
        self.key_columns
            .iter()
            .map(|&index| match row.get(index) {
                Some(Value::Int(n)) => Ok(KeyComponent::Int(*n)),
                Some(Value::Varchar(s)) => Ok(KeyComponent::Str(s.clone())),
                Some(Value::Null) | None => Err(StoreError::Rejected(format!(
                    "row for {} has no value in key column {}",
                    table, index
                ))),
                Some(other) => Ok(KeyComponent::Str(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CompositeKey::new)
    }
}

/// Columns and key layout recovered from a `CREATE TABLE` statement
#[derive(Debug, PartialEq)]
struct TableLayout {
    describe: Vec<Vec<Value>>,
    key_columns: Vec<usize>,
}

#[derive(Debug, Default)]
struct FaultPlan {
    reject_ddl: Option<String>,
    failing_fetches: HashMap<CompositeKey, StoreError>,
    fetch_delays: HashMap<CompositeKey, Duration>,
    stream_error_after: Option<(usize, String)>,
    truncate_stream: bool,
}

/// Operation counters
#[derive(Debug, Default)]
struct OpCounters {
    ddl_executed: AtomicU64,
    describes: AtomicU64,
    key_listings: AtomicU64,
    fetches: AtomicU64,
    rows_inserted: AtomicU64,
}

/// Snapshot of operation counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// DDL statements executed (accepted or rejected)
    pub ddl_executed: u64,
    /// Describe calls
    pub describes: u64,
    /// Key listings started
    pub key_listings: u64,
    /// Row fetches issued
    pub fetches: u64,
    /// Rows accepted by `insert_rows`
    pub rows_inserted: u64,
}

/// In-memory [`StoreClient`] with fault injection
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, TableData>>,
    statements: RwLock<Vec<String>>,
    faults: RwLock<FaultPlan>,
    page_size: usize,
    counters: OpCounters,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            statements: RwLock::new(Vec::new()),
            faults: RwLock::new(FaultPlan::default()),
            page_size: DEFAULT_PAGE_SIZE,
            counters: OpCounters::default(),
        }
    }

    /// Set the number of keys per streamed batch (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register a table with its describe response
    pub fn create_table(&self, table: &str, describe: Vec<Vec<Value>>) {
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default().describe = describe;
    }

    /// Store a row under `key`, creating the table if needed
    ///
    /// Keys are listed in first-insertion order.
    pub fn insert_row(&self, table: &str, key: CompositeKey, row: Row) {
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default().push_row(key, row);
    }

    /// Make every fetch of `key` fail with `error`
    pub fn fail_fetch(&self, key: CompositeKey, error: StoreError) {
        self.faults.write().failing_fetches.insert(key, error);
    }

    /// Delay every fetch of `key` by `delay`
    pub fn delay_fetch(&self, key: CompositeKey, delay: Duration) {
        self.faults.write().fetch_delays.insert(key, delay);
    }

    /// Fail key listings after `batches` batches have been delivered
    pub fn fail_key_stream_after(&self, batches: usize, message: impl Into<String>) {
        self.faults.write().stream_error_after = Some((batches, message.into()));
    }

    /// End key listings without a completion flag
    pub fn truncate_key_stream(&self) {
        self.faults.write().truncate_stream = true;
    }

    /// Reject every DDL statement with `message`
    pub fn reject_ddl(&self, message: impl Into<String>) {
        self.faults.write().reject_ddl = Some(message.into());
    }

    /// Statements passed to `execute_ddl`, in order
    pub fn executed_statements(&self) -> Vec<String> {
        self.statements.read().clone()
    }

    /// Whether a table is registered
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    /// Get operation counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            ddl_executed: self.counters.ddl_executed.load(Ordering::Relaxed),
            describes: self.counters.describes.load(Ordering::Relaxed),
            key_listings: self.counters.key_listings.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            rows_inserted: self.counters.rows_inserted.load(Ordering::Relaxed),
        }
    }

    /// Split the key listing into batches, applying stream faults
    fn key_batches(&self, table: &str) -> Vec<Result<KeyBatch, StoreError>> {
        let keys: Vec<String> = match self.tables.read().get(table) {
            Some(data) => data.keys.iter().map(|k| k.to_string()).collect(),
            None => return vec![Err(StoreError::TableNotFound(table.to_string()))],
        };

        let mut batches: Vec<KeyBatch> = keys
            .chunks(self.page_size)
            .map(|page| KeyBatch::page(page.to_vec()))
            .collect();

        let faults = self.faults.read();
        if !faults.truncate_stream {
            match batches.last_mut() {
                Some(last) => last.done = true,
                None => batches.push(KeyBatch::last(Vec::new())),
            }
        }

        let mut items: Vec<Result<KeyBatch, StoreError>> = batches.into_iter().map(Ok).collect();
        if let Some((after, message)) = &faults.stream_error_after {
            items.truncate(*after);
            items.push(Err(StoreError::Stream(message.clone())));
        }
        items
    }
}

/// Table name of a `CREATE TABLE <name> (...)` statement
fn created_table_name(statement: &str) -> Option<&str> {
    let rest = statement.trim_start();
    let rest = rest
        .get(..12)
        .filter(|head| head.eq_ignore_ascii_case("CREATE TABLE"))
        .map(|_| rest[12..].trim_start())?;
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '(')
        .unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Recover columns and local-key positions from a compiled `CREATE TABLE`
///
/// Understands the layout produced by the DDL compiler:
/// `(<col>, ..., PRIMARY KEY ((<pk>, ..., QUANTUM(<q>, n, 'u')), <pk>, ..., <q>))`.
fn parse_layout(statement: &str) -> Option<TableLayout> {
    let body = &statement[statement.find('(')? + 1..statement.rfind(')')?];
    let constraint_at = body.find("PRIMARY KEY")?;

    let columns: Vec<(&str, &str, bool)> = body[..constraint_at]
        .trim_end()
        .trim_end_matches(',')
        .split(", ")
        .map(|column| {
            let mut parts = column.split_whitespace();
            let name = parts.next()?;
            let column_type = parts.next()?;
            Some((name, column_type, !column.ends_with("NOT NULL")))
        })
        .collect::<Option<_>>()?;

    let constraint = body[constraint_at + "PRIMARY KEY".len()..].trim();
    let quantum_at = constraint.find("QUANTUM(")?;
    let mut partition: Vec<&str> = constraint[..quantum_at]
        .trim_start_matches('(')
        .split(", ")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();
    let quantum_args = &constraint[quantum_at + "QUANTUM(".len()..];
    partition.push(quantum_args[..quantum_args.find(',')?].trim());

    let local_at = constraint.rfind("), ")? + 3;
    let local: Vec<&str> = constraint[local_at..]
        .trim_end_matches(')')
        .split(", ")
        .map(str::trim)
        .collect();

    let key_columns = local
        .iter()
        .map(|key| columns.iter().position(|(name, _, _)| name == key))
        .collect::<Option<Vec<_>>>()?;

    // Flags use the store's inverted encoding: 0 means the property holds
    let flag = |holds: bool| Value::Int(if holds { 0 } else { 1 });
    let describe = columns
        .iter()
        .map(|(name, column_type, nullable)| {
            vec![
                Value::from(*name),
                Value::from(column_type.to_ascii_lowercase()),
                flag(*nullable),
                flag(partition.contains(name)),
                flag(local.contains(name)),
            ]
        })
        .collect();

    Some(TableLayout {
        describe,
        key_columns,
    })
}

#[async_trait]
impl StoreClient for InMemoryStore {
    fn client_id(&self) -> &str {
        "in-memory-store-v1"
    }

    async fn execute_ddl(&self, statement: &str) -> Result<(), StoreError> {
        self.counters.ddl_executed.fetch_add(1, Ordering::Relaxed);
        self.statements.write().push(statement.to_string());

        if let Some(message) = self.faults.read().reject_ddl.clone() {
            return Err(StoreError::Rejected(message));
        }

        if let Some(table) = created_table_name(statement) {
            let mut tables = self.tables.write();
            if tables.contains_key(table) {
                return Err(StoreError::Rejected(format!("table {} already exists", table)));
            }
            let data = match parse_layout(statement) {
                Some(layout) => TableData {
                    describe: layout.describe,
                    key_columns: layout.key_columns,
                    ..TableData::default()
                },
                None => TableData::default(),
            };
            debug!(
                table = table,
                key_columns = data.key_columns.len(),
                "Registered table from DDL"
            );
            tables.insert(table.to_string(), data);
        }
        Ok(())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError> {
        self.counters.describes.fetch_add(1, Ordering::Relaxed);
        self.tables
            .read()
            .get(table)
            .map(|data| data.describe.clone())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let data = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if data.key_columns.is_empty() {
            return Err(StoreError::Rejected(format!("table {} has no key layout", table)));
        }

        // All or nothing
        let keyed = rows
            .into_iter()
            .map(|row| data.key_of(table, &row).map(|key| (key, row)))
            .collect::<Result<Vec<_>, _>>()?;

        let count = keyed.len();
        for (key, row) in keyed {
            data.replace_row(key, row);
        }
        self.counters
            .rows_inserted
            .fetch_add(count as u64, Ordering::Relaxed);
        debug!(table = table, rows = count, "Stored rows");
        Ok(())
    }

    fn list_keys_stream(&self, table: &str) -> KeyStream {
        self.counters.key_listings.fetch_add(1, Ordering::Relaxed);
        stream::iter(self.key_batches(table)).boxed()
    }

    async fn fetch_row(&self, table: &str, key: &CompositeKey) -> Result<Vec<Row>, StoreError> {
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);

        let (delay, failure) = {
            let faults = self.faults.read();
            (
                faults.fetch_delays.get(key).copied(),
                faults.failing_fetches.get(key).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let tables = self.tables.read();
        let data = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(data.rows.get(key).cloned().unwrap_or_default())
    }
}
