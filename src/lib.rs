//! Quantum TS - table definitions, key enumeration and row aggregation for a
//! distributed time-series store
//!
//! This library provides:
//! - A DDL compiler turning typed table definitions into `CREATE TABLE`
//!   statements with a quantized primary key
//! - Describe-table decoding into column metadata
//! - Streaming key enumeration with key component coercion
//! - A concurrent aggregation engine counting key components and field values
//!   over every row of a table
//!
//! The store itself is reached through the [`StoreClient`] trait; an
//! in-memory implementation is provided for tests and development.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod schema;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Tracing subscriber setup
pub mod logging;

/// Streaming key enumeration
pub mod query;

/// Concurrent row aggregation with race-free completion
pub mod aggregation;

// Re-export main types
pub use aggregation::{AggregationReport, Aggregator, FetchOptions};
pub use config::{Config, NodeDescriptor};
pub use engine::{InMemoryStore, StoreClient, TableEngine, TableEngineBuilder};
pub use error::{Error, Result};
pub use types::{
    ColumnMetadata, CompositeKey, Field, FieldType, KeyComponent, QuantizedField, Row,
    TableDefinition, TimeUnit, Value,
};
