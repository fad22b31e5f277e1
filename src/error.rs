//! Error types for table definition, introspection, enumeration and aggregation

use crate::types::CompositeKey;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid table definition
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Store-level failure (DDL, describe, key listing)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed describe-table response
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Aggregation could not start
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Table definition errors
///
/// Raised synchronously by the field model and the DDL compiler. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A primary-key field (or the quantized field) is nullable
    #[error("primary key field '{0}' can not be nullable")]
    NullablePrimaryKey(String),

    /// Quantum bucket size must be positive
    #[error("quantum bucket size for '{field}' must be positive, got {size}")]
    InvalidBucketSize {
        /// Quantized field name
        field: String,
        /// Rejected bucket size
        size: u64,
    },

    /// Table or field name is empty
    #[error("{0} name can not be empty")]
    EmptyName(&'static str),

    /// Unknown quantum unit literal
    #[error("unknown quantum unit '{0}'")]
    UnknownUnit(String),
}

/// Store errors
///
/// Network or store-level failure. Aborts the enclosing operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Connection to the store failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Table does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Statement rejected by the store
    #[error("Statement rejected: {0}")]
    Rejected(String),

    /// Streamed response reported an error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Streamed response ended before the completion flag
    #[error("Stream ended before completion flag")]
    StreamTruncated,
}

/// Describe-table decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A positional field with no default is absent or null
    #[error("describe row {row}: missing required field '{field}'")]
    MissingField {
        /// Zero-based row index
        row: usize,
        /// Name of the missing positional field
        field: &'static str,
    },
}

/// Aggregation errors
///
/// Only key enumeration failure aborts an aggregation; row fetch failures are
/// captured in the report as [`FetchError`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// The key set could not be enumerated
    #[error("key enumeration failed: {0}")]
    Enumeration(#[source] StoreError),
}

/// Failure of a single row fetch during aggregation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The store reported an error for this key
    #[error("fetch of {key} failed: {source}")]
    Store {
        /// Key whose fetch failed
        key: CompositeKey,
        /// Underlying store error
        source: StoreError,
    },

    /// The fetch did not resolve within the configured timeout
    #[error("fetch of {key} timed out after {after:?}")]
    TimedOut {
        /// Key whose fetch timed out
        key: CompositeKey,
        /// Configured timeout
        after: Duration,
    },

    /// The fetch task terminated abnormally
    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

impl FetchError {
    /// Key the failure belongs to, when known
    pub fn key(&self) -> Option<&CompositeKey> {
        match self {
            FetchError::Store { key, .. } | FetchError::TimedOut { key, .. } => Some(key),
            FetchError::Aborted(_) => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
