//! Store client capability consumed by the core

use crate::error::StoreError;
use crate::types::{CompositeKey, Row, Value};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

// =============================================================================
// StoreClient Trait
// =============================================================================

/// Access to a time-series store
///
/// Implementations must allow many logical operations in flight at once over
/// a shared client; the aggregation engine issues one `fetch_row` per key
/// without waiting between them.
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Unique identifier for this client backend
    fn client_id(&self) -> &str;

    /// Execute a data-definition statement
    async fn execute_ddl(&self, statement: &str) -> Result<(), StoreError>;

    /// Store positional rows; each row's key comes from the table's key columns
    async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> Result<(), StoreError>;

    /// Describe a table: one positional row per column
    async fn describe_table(&self, table: &str) -> Result<Vec<Vec<Value>>, StoreError>;

    /// Stream the table's keys in batches, the last carrying `done = true`
    fn list_keys_stream(&self, table: &str) -> KeyStream;

    /// Fetch the row(s) stored under `key`
    async fn fetch_row(&self, table: &str, key: &CompositeKey) -> Result<Vec<Row>, StoreError>;
}

/// Stream of key batches
pub type KeyStream = Pin<Box<dyn Stream<Item = Result<KeyBatch, StoreError>> + Send>>;

/// One page of a key listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBatch {
    /// Comma-separated key strings
    pub keys: Vec<String>,
    /// Set on the final batch
    pub done: bool,
}

impl KeyBatch {
    /// A non-final batch
    pub fn page(keys: Vec<String>) -> Self {
        Self { keys, done: false }
    }

    /// The final batch
    pub fn last(keys: Vec<String>) -> Self {
        Self { keys, done: true }
    }
}
