//! Table engine
//!
//! [`TableEngine`] ties the DDL compiler, the column introspector, the key
//! enumerator and the aggregation engine to one injected [`StoreClient`].

use super::traits::StoreClient;
use crate::aggregation::{AggregationReport, Aggregator, FetchOptions};
use crate::config::Config;
use crate::error::{AggregationError, Error, Result, StoreError};
use crate::metrics;
use crate::query::keys;
use crate::schema::{compile_create_table, decode_describe};
use crate::types::{ColumnMetadata, CompositeKey, Row, TableDefinition, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Table operations over a shared store client
#[derive(Clone)]
pub struct TableEngine {
    store: Arc<dyn StoreClient>,
    aggregator: Aggregator,
}

impl TableEngine {
    /// Create an engine with default fetch options
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            aggregator: Aggregator::new(Arc::clone(&store)),
            store,
        }
    }

    /// Start building an engine
    pub fn builder() -> TableEngineBuilder {
        TableEngineBuilder::new()
    }

    /// Backend identifier of the underlying client
    pub fn client_id(&self) -> &str {
        self.store.client_id()
    }

    /// Fetch options used by [`TableEngine::aggregate`]
    pub fn fetch_options(&self) -> &FetchOptions {
        self.aggregator.options()
    }

    /// Compile and execute `CREATE TABLE` for `definition`
    ///
    /// Returns the executed statement. A schema error is raised before
    /// anything reaches the store.
    pub async fn create_table(&self, definition: &TableDefinition) -> Result<String> {
        let statement = compile_create_table(definition)?;

        match self.store.execute_ddl(&statement).await {
            Ok(()) => {
                metrics::record_ddl(true);
                info!(table = %definition.name, "Table created");
                Ok(statement)
            },
            Err(e) => {
                metrics::record_ddl(false);
                warn!(table = %definition.name, error = %e, "CREATE TABLE rejected");
                Err(e.into())
            },
        }
    }

    /// Store positional rows in `table`
    ///
    /// Rows follow the table's column order. The batch is accepted or
    /// rejected as a whole.
    pub async fn insert_rows(&self, table: &str, rows: Vec<Row>) -> std::result::Result<(), StoreError> {
        let count = rows.len();
        match self.store.insert_rows(table, rows).await {
            Ok(()) => {
                metrics::record_insert(count, true);
                debug!(table = table, rows = count, "Rows stored");
                Ok(())
            },
            Err(e) => {
                metrics::record_insert(count, false);
                warn!(table = table, rows = count, error = %e, "Insert rejected");
                Err(e)
            },
        }
    }

    /// Raw describe-table rows
    pub async fn describe_table(&self, table: &str) -> std::result::Result<Vec<Vec<Value>>, StoreError> {
        self.store.describe_table(table).await
    }

    /// Column metadata keyed by column name
    pub async fn list_columns(&self, table: &str) -> Result<HashMap<String, ColumnMetadata>> {
        let rows = self.describe_table(table).await?;
        let columns = decode_describe(&rows)?;
        debug!(table = table, columns = columns.len(), "Decoded describe response");
        Ok(columns)
    }

    /// Every key of `table`, in listing order
    pub async fn list_keys(&self, table: &str) -> std::result::Result<Vec<CompositeKey>, StoreError> {
        keys::list_keys(self.store.as_ref(), table).await
    }

    /// Rows stored under one key
    pub async fn get(&self, table: &str, key: &CompositeKey) -> std::result::Result<Vec<Row>, StoreError> {
        self.store.fetch_row(table, key).await
    }

    /// Aggregate key and field statistics over the whole table
    pub async fn aggregate(&self, table: &str) -> std::result::Result<AggregationReport, AggregationError> {
        self.aggregator.aggregate(table).await
    }
}

/// Builder for [`TableEngine`]
#[derive(Default)]
pub struct TableEngineBuilder {
    store: Option<Arc<dyn StoreClient>>,
    options: FetchOptions,
}

impl TableEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store client
    pub fn with_store<S>(mut self, store: S) -> Self
    where
        S: StoreClient,
    {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the store client from an existing Arc
    ///
    /// Use this when the caller keeps its own handle, e.g. to inspect an
    /// in-memory store after running operations.
    pub fn with_store_arc(mut self, store: Arc<dyn StoreClient>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set fetch options
    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Take fetch options from configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.options = config.fetch_options();
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<TableEngine> {
        let store = self
            .store
            .ok_or_else(|| Error::Configuration("Store client not set".to_string()))?;

        debug!(
            client = store.client_id(),
            timeout = ?self.options.timeout,
            max_in_flight = ?self.options.max_in_flight,
            "Building table engine"
        );

        Ok(TableEngine {
            aggregator: Aggregator::new(Arc::clone(&store)).with_options(self.options),
            store,
        })
    }
}
